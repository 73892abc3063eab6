//! Integration tests for pairs the merge tool cannot handle.

use rstest::rstest;
use std::sync::Arc;

use duplexify::merge::{MergeCommand, MergeTool, PairOutcome};

use crate::common::{RecordingNotifier, RecordingTool, Workspace, list, pause};

#[tokio::test]
async fn test_failed_pair_is_quarantined_once() {
    let ws = Workspace::new();
    let tool = Arc::new(RecordingTool::failing());
    let notifier = Arc::new(RecordingNotifier::default());
    let (mut watcher, worker, queue) = ws.pipeline(tool.clone(), notifier.clone());

    let a = ws.scan("scan_1.pdf", b"odd");
    pause();
    let b = ws.scan("scan_2.pdf", b"even");
    watcher.tick().await.unwrap();

    let outcome = worker.tick().await.unwrap();
    let Some(PairOutcome::Quarantined { batch_dir }) = outcome else {
        panic!("expected quarantine, got {outcome:?}");
    };

    // One retry configured: two attempts, same output path both times.
    let calls = tool.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], calls[1]);

    assert_eq!(ws.batches(), vec![batch_dir.clone()]);
    assert_eq!(
        list(&batch_dir),
        vec![batch_dir.join("scan_1.pdf"), batch_dir.join("scan_2.pdf")]
    );
    assert_eq!(std::fs::read(batch_dir.join("scan_1.pdf")).unwrap(), b"odd");
    assert!(!a.exists());
    assert!(!b.exists());

    assert!(ws.outputs().is_empty(), "partial output must be removed");
    assert!(queue.is_empty().await);

    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("scan_1.pdf"));
    assert!(messages[0].contains("scan_2.pdf"));
}

#[tokio::test]
async fn test_quarantined_files_are_not_picked_up_again() {
    let ws = Workspace::new();
    let tool = Arc::new(RecordingTool::failing());
    let (mut watcher, worker, queue) =
        ws.pipeline(tool.clone(), Arc::new(RecordingNotifier::default()));

    ws.scan("scan_1.pdf", b"odd");
    ws.scan("scan_2.pdf", b"even");
    watcher.tick().await.unwrap();
    worker.tick().await.unwrap();

    assert!(watcher.tick().await.unwrap().is_empty());
    assert_eq!(worker.tick().await.unwrap(), None);
    assert!(queue.is_empty().await);
    assert_eq!(tool.calls().len(), 2);
}

#[tokio::test]
async fn test_each_failure_gets_its_own_batch() {
    let ws = Workspace::new();
    let notifier = Arc::new(RecordingNotifier::default());
    let (mut watcher, worker, _queue) =
        ws.pipeline(Arc::new(RecordingTool::failing()), notifier.clone());

    for name in ["a1.pdf", "a2.pdf", "b1.pdf", "b2.pdf"] {
        ws.scan(name, name.as_bytes());
        pause();
    }
    watcher.tick().await.unwrap();

    worker.tick().await.unwrap();
    worker.tick().await.unwrap();

    let batches = ws.batches();
    assert_eq!(batches.len(), 2);
    assert_ne!(batches[0], batches[1]);
    assert_eq!(notifier.messages().len(), 2);
}

#[rstest]
#[case::nonzero_exit("sh", &["-c", "exit 3", "merge", "{a}", "{b}", "{output}"])]
#[case::missing_program("duplexify-no-such-merge-tool", &["{a}", "{b}", "{output}"])]
#[tokio::test]
async fn test_failing_command_quarantines_pair(#[case] program: &str, #[case] args: &[&str]) {
    let ws = Workspace::new();
    let tool: Arc<dyn MergeTool> = Arc::new(MergeCommand::new(program, args.iter().copied()));
    let notifier = Arc::new(RecordingNotifier::default());
    let (mut watcher, worker, _queue) = ws.pipeline(tool, notifier.clone());

    ws.scan("scan_1.pdf", b"odd");
    pause();
    ws.scan("scan_2.pdf", b"even");
    watcher.tick().await.unwrap();

    let outcome = worker.tick().await.unwrap();

    assert!(matches!(outcome, Some(PairOutcome::Quarantined { .. })));
    assert_eq!(ws.batches().len(), 1);
    assert!(ws.outputs().is_empty());
    assert_eq!(notifier.messages().len(), 1);
}
