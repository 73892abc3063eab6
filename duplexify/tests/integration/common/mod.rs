//! Shared helpers for the duplexify integration tests.
//!
//! Each test gets its own temporary workspace with watch, out and error
//! directories, plus in-memory stand-ins for the merge tool and notifier.

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use duplexify::Config;
use duplexify::error::{DuplexifyError, Result};
use duplexify::merge::{MergeTool, MergeWorker};
use duplexify::notify::Notifier;
use duplexify::queue::MergeQueue;
use duplexify::watch::DirectoryWatcher;

/// A temporary watch/out/error directory layout with a matching config.
pub struct Workspace {
    _root: tempfile::TempDir,
    pub config: Config,
}

impl Workspace {
    /// Create the directories with fast retry and loop timings.
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("Failed to create temp dir");
        let mut config = Config {
            watch_dir: root.path().join("watch"),
            out_dir: root.path().join("out"),
            error_dir: root.path().join("error"),
            poll_interval: Duration::from_millis(10),
            merge_interval: Duration::from_millis(10),
            merge_retry_count: 1,
            merge_retry_delay: Duration::from_millis(1),
            move_retry_delay: Duration::from_millis(1),
            ..Default::default()
        };
        config.prepare_directories().expect("Failed to prepare directories");

        Self {
            _root: root,
            config,
        }
    }

    /// Drop a scanned file into the watch directory.
    pub fn scan(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.config.watch_dir.join(name);
        std::fs::write(&path, contents).expect("Failed to write scan");
        path
    }

    /// Files in the output directory.
    pub fn outputs(&self) -> Vec<PathBuf> {
        list(&self.config.out_dir)
    }

    /// Batch directories in the error directory.
    pub fn batches(&self) -> Vec<PathBuf> {
        list(&self.config.error_dir)
    }

    /// A watcher and a worker sharing one queue.
    pub fn pipeline(
        &self,
        tool: Arc<dyn MergeTool>,
        notifier: Arc<dyn Notifier>,
    ) -> (DirectoryWatcher, MergeWorker, MergeQueue) {
        let queue = MergeQueue::new();
        let watcher = DirectoryWatcher::from_config(&self.config, queue.clone())
            .expect("Failed to create watcher");
        let worker = MergeWorker::new(&self.config, queue.clone(), tool, notifier);
        (watcher, worker, queue)
    }
}

/// Sorted entries of `dir`.
pub fn list(dir: &Path) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .expect("Failed to read dir")
        .map(|entry| entry.expect("Failed to read entry").path())
        .collect();
    entries.sort();
    entries
}

/// Give file timestamps a chance to differ.
pub fn pause() {
    std::thread::sleep(Duration::from_millis(20));
}

/// Merge tool that concatenates both inputs, or always fails.
#[derive(Default)]
pub struct RecordingTool {
    pub fail: bool,
    pub calls: Mutex<Vec<(PathBuf, PathBuf, PathBuf)>>,
}

impl RecordingTool {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<(PathBuf, PathBuf, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MergeTool for RecordingTool {
    async fn merge(&self, a: &Path, b: &Path, output: &Path) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((a.to_path_buf(), b.to_path_buf(), output.to_path_buf()));

        if self.fail {
            // Leave a partial output behind like a crashing tool would.
            std::fs::write(output, b"partial")?;
            return Err(DuplexifyError::MergeLaunch {
                program: "recording".to_string(),
                source: std::io::Error::other("tool crashed"),
            });
        }

        let mut merged = std::fs::read(a)?;
        merged.extend(std::fs::read(b)?);
        std::fs::write(output, merged)?;
        Ok(())
    }
}

/// Notifier that keeps every message.
#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

/// Poll `condition` until it holds or `timeout` passes.
pub async fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
