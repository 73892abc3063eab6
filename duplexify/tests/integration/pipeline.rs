//! Integration tests for the happy path: scans in, merged document out.

use chrono::NaiveDateTime;
use std::sync::Arc;

use duplexify::merge::PairOutcome;
use duplexify::utils::SORTABLE_TIMESTAMP_FORMAT;

use crate::common::{RecordingNotifier, RecordingTool, Workspace, pause};

#[tokio::test]
async fn test_two_scans_are_merged_in_arrival_order() {
    let ws = Workspace::new();
    let tool = Arc::new(RecordingTool::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let (mut watcher, worker, queue) = ws.pipeline(tool.clone(), notifier.clone());

    let a = ws.scan("scan_1.pdf", b"odd");
    pause();
    let b = ws.scan("scan_2.pdf", b"even");

    assert_eq!(watcher.tick().await.unwrap(), vec![a.clone(), b.clone()]);

    let outcome = worker.tick().await.unwrap();
    let Some(PairOutcome::Merged { output }) = outcome else {
        panic!("expected a merge, got {outcome:?}");
    };

    assert_eq!(tool.calls(), vec![(a.clone(), b.clone(), output.clone())]);
    assert_eq!(output.parent(), Some(ws.config.out_dir.as_path()));
    assert_eq!(std::fs::read(&output).unwrap(), b"oddeven");

    let stem = output.file_stem().and_then(|s| s.to_str()).unwrap();
    assert!(NaiveDateTime::parse_from_str(stem, SORTABLE_TIMESTAMP_FORMAT).is_ok());

    assert!(!a.exists());
    assert!(!b.exists());
    assert!(queue.is_empty().await);
    assert!(ws.batches().is_empty());
    assert!(notifier.messages().is_empty());
}

#[tokio::test]
async fn test_order_follows_file_age_not_name() {
    let ws = Workspace::new();
    let tool = Arc::new(RecordingTool::default());
    let (mut watcher, worker, _queue) =
        ws.pipeline(tool.clone(), Arc::new(RecordingNotifier::default()));

    let odd = ws.scan("zz_front.pdf", b"1");
    pause();
    let even = ws.scan("aa_back.pdf", b"2");

    watcher.tick().await.unwrap();
    worker.tick().await.unwrap();

    let calls = tool.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!((&calls[0].0, &calls[0].1), (&odd, &even));
}

#[tokio::test]
async fn test_only_matching_extension_is_picked_up() {
    let ws = Workspace::new();
    let (mut watcher, _worker, queue) = ws.pipeline(
        Arc::new(RecordingTool::default()),
        Arc::new(RecordingNotifier::default()),
    );

    let upper = ws.scan("SCAN.PDF", b"1");
    ws.scan("notes.txt", b"ignored");
    std::fs::create_dir(ws.config.watch_dir.join("nested.pdf")).unwrap();

    watcher.tick().await.unwrap();

    assert_eq!(queue.snapshot().await, vec![upper]);
}

#[tokio::test]
async fn test_pairs_keep_their_partners_across_ticks() {
    let ws = Workspace::new();
    let tool = Arc::new(RecordingTool::default());
    let (mut watcher, worker, queue) =
        ws.pipeline(tool.clone(), Arc::new(RecordingNotifier::default()));

    let first = ws.scan("doc1_odd.pdf", b"a");
    pause();
    let second = ws.scan("doc1_even.pdf", b"b");
    pause();
    let third = ws.scan("doc2_odd.pdf", b"c");
    watcher.tick().await.unwrap();

    worker.tick().await.unwrap();
    assert_eq!(queue.snapshot().await, vec![third.clone()]);

    let fourth = ws.scan("doc2_even.pdf", b"d");
    watcher.tick().await.unwrap();
    worker.tick().await.unwrap();

    let pairs: Vec<_> = tool.calls().into_iter().map(|(a, b, _)| (a, b)).collect();
    assert_eq!(pairs, vec![(first, second), (third, fourth)]);
    assert_eq!(ws.outputs().len(), 2);
}
