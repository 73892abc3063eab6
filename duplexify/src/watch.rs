//! The directory watch loop.
//!
//! Watching is done by periodic scans rather than file-system events, which
//! behave inconsistently on network shares. Every scan is idempotent: the
//! seen-set remembers what was handed to the queue so a file still sitting
//! in the watch directory is not enqueued twice, and forgets entries that
//! no longer show up so a scanner can reuse a name later.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::discovery::Discovery;
use crate::error::{DuplexifyError, Result};
use crate::queue::MergeQueue;

/// Feeds newly discovered files into the merge queue.
#[derive(Debug)]
pub struct DirectoryWatcher {
    discovery: Discovery,
    queue: MergeQueue,
    seen: HashSet<PathBuf>,
    interval: Duration,
}

impl DirectoryWatcher {
    /// Create a watcher scanning with `discovery` every `interval`.
    pub fn new(discovery: Discovery, queue: MergeQueue, interval: Duration) -> Self {
        Self {
            discovery,
            queue,
            seen: HashSet::new(),
            interval,
        }
    }

    /// Create a watcher for the configured watch directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the extension filter cannot be built.
    pub fn from_config(config: &Config, queue: MergeQueue) -> Result<Self> {
        let discovery = Discovery::new(
            &config.watch_dir,
            config.extension(),
            config.processing_delay,
        )?;
        Ok(Self::new(discovery, queue, config.poll_interval))
    }

    /// Paths handed to the queue that are still present on disk.
    pub fn seen(&self) -> &HashSet<PathBuf> {
        &self.seen
    }

    /// Scan once and enqueue every file not seen before, oldest first.
    ///
    /// Returns the newly enqueued paths.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan fails; the seen-set is left untouched.
    pub async fn tick(&mut self) -> Result<Vec<PathBuf>> {
        let discovery = self.discovery.clone();
        let files = tokio::task::spawn_blocking(move || discovery.scan())
            .await
            .map_err(|e| DuplexifyError::from(std::io::Error::other(e)))??;

        let present: HashSet<&PathBuf> = files.iter().collect();
        self.seen.retain(|path| {
            let keep = present.contains(path);
            if !keep {
                debug!(path = %path.display(), "Forgetting file no longer in watch directory");
            }
            keep
        });

        let mut enqueued = Vec::new();
        for file in files {
            if !self.seen.insert(file.clone()) {
                continue;
            }
            if self.queue.enqueue(file.clone()).await {
                info!(path = %file.display(), "Enqueued");
                enqueued.push(file);
            } else {
                debug!(path = %file.display(), "Already queued");
            }
        }

        Ok(enqueued)
    }

    /// Scan every interval until `token` is cancelled.
    ///
    /// Scan failures are logged and retried on the next tick.
    pub async fn run(mut self, token: CancellationToken) {
        info!(dir = %self.discovery.dir().display(), "Watching directory");

        loop {
            if token.is_cancelled() {
                break;
            }

            if let Err(err) = self.tick().await {
                warn!(error = %err, "Directory scan failed, retrying");
            }

            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("Directory watcher stopped");
    }
}
