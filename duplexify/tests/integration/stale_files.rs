//! Integration tests for evicting scans that never get a partner.

use std::sync::Arc;
use std::time::Duration;

use duplexify::merge::PairOutcome;

use crate::common::{RecordingNotifier, RecordingTool, Workspace, pause};

#[tokio::test]
async fn test_lone_stale_file_is_deleted() {
    let mut ws = Workspace::new();
    ws.config.stale_file_timeout = Duration::from_millis(5);
    let tool = Arc::new(RecordingTool::default());
    let (mut watcher, worker, queue) =
        ws.pipeline(tool.clone(), Arc::new(RecordingNotifier::default()));

    let lone = ws.scan("scan_1.pdf", b"odd");
    watcher.tick().await.unwrap();
    pause();

    assert_eq!(worker.reap_stale().await.unwrap(), Some(lone.clone()));
    assert!(!lone.exists());
    assert!(queue.is_empty().await);
    assert!(tool.calls().is_empty());
    assert!(ws.outputs().is_empty());
    assert!(ws.batches().is_empty());
}

#[tokio::test]
async fn test_lone_fresh_file_waits_for_partner() {
    let ws = Workspace::new();
    let (mut watcher, worker, queue) = ws.pipeline(
        Arc::new(RecordingTool::default()),
        Arc::new(RecordingNotifier::default()),
    );

    let lone = ws.scan("scan_1.pdf", b"odd");
    watcher.tick().await.unwrap();

    assert_eq!(worker.tick().await.unwrap(), None);
    assert!(lone.exists());
    assert_eq!(queue.snapshot().await, vec![lone]);
}

#[tokio::test]
async fn test_odd_file_out_is_reaped_after_pair_merges() {
    let mut ws = Workspace::new();
    ws.config.stale_file_timeout = Duration::from_millis(5);
    let tool = Arc::new(RecordingTool::default());
    let (mut watcher, worker, queue) =
        ws.pipeline(tool.clone(), Arc::new(RecordingNotifier::default()));

    ws.scan("scan_1.pdf", b"1");
    pause();
    ws.scan("scan_2.pdf", b"2");
    pause();
    let leftover = ws.scan("scan_3.pdf", b"3");
    watcher.tick().await.unwrap();
    pause();

    // Three queued files: nothing is alone, so the pair merges first.
    let outcome = worker.tick().await.unwrap();
    assert!(matches!(outcome, Some(PairOutcome::Merged { .. })));
    assert_eq!(queue.snapshot().await, vec![leftover.clone()]);

    assert_eq!(worker.tick().await.unwrap(), None);
    assert!(!leftover.exists());
    assert!(queue.is_empty().await);
    assert_eq!(tool.calls().len(), 1);
}

#[tokio::test]
async fn test_vanished_lone_file_is_dropped_from_queue() {
    let ws = Workspace::new();
    let (mut watcher, worker, queue) = ws.pipeline(
        Arc::new(RecordingTool::default()),
        Arc::new(RecordingNotifier::default()),
    );

    let lone = ws.scan("scan_1.pdf", b"odd");
    watcher.tick().await.unwrap();
    std::fs::remove_file(&lone).unwrap();

    assert_eq!(worker.reap_stale().await.unwrap(), Some(lone));
    assert!(queue.is_empty().await);
}
