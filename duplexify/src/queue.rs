//! The pending merge queue.
//!
//! A FIFO of file paths shared between the watch loop (the only producer)
//! and the merge worker (the only consumer). A path is held at most once.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Thread-safe FIFO of files waiting to be paired.
///
/// Cloning yields another handle to the same queue.
#[derive(Debug, Clone, Default)]
pub struct MergeQueue {
    inner: Arc<Mutex<VecDeque<PathBuf>>>,
}

impl MergeQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a path at the back.
    ///
    /// Returns `false` and leaves the queue untouched if the path is
    /// already queued.
    pub async fn enqueue(&self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        let mut queue = self.inner.lock().await;
        if queue.contains(&path) {
            return false;
        }
        queue.push_back(path);
        true
    }

    /// Remove and return the oldest path.
    pub async fn dequeue(&self) -> Option<PathBuf> {
        self.inner.lock().await.pop_front()
    }

    /// Remove the two oldest paths, oldest first.
    ///
    /// Returns `None` without touching the queue when fewer than two paths
    /// are queued.
    pub async fn dequeue_pair(&self) -> Option<(PathBuf, PathBuf)> {
        let mut queue = self.inner.lock().await;
        if queue.len() < 2 {
            return None;
        }
        let a = queue.pop_front()?;
        let b = queue.pop_front()?;
        Some((a, b))
    }

    /// The queued path, if exactly one is queued.
    pub async fn sole(&self) -> Option<PathBuf> {
        let queue = self.inner.lock().await;
        match queue.len() {
            1 => queue.front().cloned(),
            _ => None,
        }
    }

    /// Remove `path` if it is still the only queued path.
    ///
    /// Check and removal happen under one lock, so a partner appended after
    /// an earlier [`sole`](Self::sole) call keeps `path` in the queue.
    pub async fn dequeue_sole(&self, path: &Path) -> Option<PathBuf> {
        let mut queue = self.inner.lock().await;
        if queue.len() == 1 && queue.front().is_some_and(|front| front == path) {
            return queue.pop_front();
        }
        None
    }

    /// Whether `path` is queued.
    pub async fn contains(&self, path: &Path) -> bool {
        self.inner.lock().await.iter().any(|queued| queued == path)
    }

    /// Number of queued paths.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Whether the queue is empty.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    /// Copy of the queued paths, oldest first.
    pub async fn snapshot(&self) -> Vec<PathBuf> {
        self.inner.lock().await.iter().cloned().collect()
    }
}
