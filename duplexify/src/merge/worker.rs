//! The merge worker.
//!
//! Every tick first evicts a stale lone file, then pairs the two oldest
//! queued files and merges them. A pair ends either merged (inputs deleted)
//! or quarantined (inputs moved, notification sent); it is never put back
//! into the queue.

use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{DuplexifyError, Result};
use crate::merge::quarantine::Quarantine;
use crate::merge::tool::MergeTool;
use crate::notify::Notifier;
use crate::queue::MergeQueue;
use crate::retry::{Attempts, RetryPolicy};
use crate::utils::{file_age, sortable_name, unique_path};

/// What happened to a pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairOutcome {
    /// The tool produced `output` and the inputs were deleted.
    Merged {
        /// Merged document.
        output: PathBuf,
    },
    /// Every attempt failed and the inputs were moved to `batch_dir`.
    Quarantined {
        /// Batch directory holding the inputs.
        batch_dir: PathBuf,
    },
}

/// Consumes the merge queue.
pub struct MergeWorker {
    queue: MergeQueue,
    tool: Arc<dyn MergeTool>,
    notifier: Arc<dyn Notifier>,
    out_dir: PathBuf,
    stale_file_timeout: Duration,
    merge_policy: RetryPolicy,
    quarantine: Quarantine,
    interval: Duration,
}

impl MergeWorker {
    /// Create a worker from configuration.
    pub fn new(
        config: &Config,
        queue: MergeQueue,
        tool: Arc<dyn MergeTool>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            queue,
            tool,
            notifier,
            out_dir: config.out_dir.clone(),
            stale_file_timeout: config.stale_file_timeout,
            merge_policy: RetryPolicy::merge(config.merge_retry_count, config.merge_retry_delay),
            quarantine: Quarantine::new(&config.error_dir, config.move_retry_delay),
            interval: config.merge_interval,
        }
    }

    /// Tick until `token` is cancelled.
    ///
    /// A merge in progress runs to completion before cancellation is seen.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error (a violated queue invariant).
    pub async fn run(&self, token: CancellationToken) -> Result<()> {
        info!(dir = %self.out_dir.display(), "Writing merged documents");
        info!(dir = %self.quarantine.error_dir().display(), "Writing failed scans");

        loop {
            if token.is_cancelled() {
                break;
            }

            self.tick().await?;

            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("Merge worker stopped");
        Ok(())
    }

    /// One tick: reap, then pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue contradicts a check made under the
    /// single-consumer assumption.
    pub async fn tick(&self) -> Result<Option<PairOutcome>> {
        self.reap_stale().await?;
        self.merge_next_pair().await
    }

    /// Delete the queued file if it is alone and older than the stale timeout.
    ///
    /// Returns the evicted path.
    ///
    /// # Errors
    ///
    /// Returns [`DuplexifyError::QueueInvariant`] if the file left the queue
    /// between the check and the eviction.
    pub async fn reap_stale(&self) -> Result<Option<PathBuf>> {
        let Some(candidate) = self.queue.sole().await else {
            return Ok(None);
        };

        if !self.is_stale(&candidate) {
            return Ok(None);
        }

        self.evict(&candidate).await
    }

    fn is_stale(&self, path: &Path) -> bool {
        match file_age(path, SystemTime::now()) {
            Ok(age) => age > self.stale_file_timeout,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => true,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Cannot determine file age");
                false
            }
        }
    }

    /// Dequeue and delete `candidate`, unless a partner was queued since it
    /// was found alone.
    async fn evict(&self, candidate: &Path) -> Result<Option<PathBuf>> {
        let Some(evicted) = self.queue.dequeue_sole(candidate).await else {
            // Only this worker removes entries, so the file must still be queued.
            if !self.queue.contains(candidate).await {
                return Err(DuplexifyError::queue_invariant(format!(
                    "{} left the queue while reaping",
                    candidate.display()
                )));
            }
            debug!(path = %candidate.display(), "Partner arrived, keeping file");
            return Ok(None);
        };

        match tokio::fs::remove_file(&evicted).await {
            Ok(()) => info!(path = %evicted.display(), "Deleted stale file"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %evicted.display(), "Dropped stale file that no longer exists");
            }
            Err(err) => {
                warn!(path = %evicted.display(), error = %err, "Failed deleting stale file");
            }
        }

        Ok(Some(evicted))
    }

    /// Merge the two oldest queued files, if there are two.
    ///
    /// # Errors
    ///
    /// Returns [`DuplexifyError::QueueInvariant`] if the queue shrank
    /// between the length check and the dequeue.
    pub async fn merge_next_pair(&self) -> Result<Option<PairOutcome>> {
        if self.queue.len().await < 2 {
            return Ok(None);
        }

        let (a, b) = self.queue.dequeue_pair().await.ok_or_else(|| {
            DuplexifyError::queue_invariant("fewer than two files after length check")
        })?;

        Ok(Some(self.merge_pair(&a, &b).await))
    }

    async fn merge_pair(&self, a: &Path, b: &Path) -> PairOutcome {
        let output = unique_path(&self.out_dir, &sortable_name(Local::now()), Some("pdf"));

        info!(a = %a.display(), b = %b.display(), "Merging files");

        let tool = self.tool.as_ref();
        let target = output.as_path();
        let result = self
            .merge_policy
            .run(
                move |_| tool.merge(a, b, target),
                |_| true,
                |attempt, err| error!(attempt, error = %err, "Failed merging files, retrying"),
            )
            .await;

        match result {
            Ok(()) => {
                delete_source(a).await;
                delete_source(b).await;
                info!(output = %output.display(), "Merged files");
                PairOutcome::Merged { output }
            }
            Err(err) => self.fail_pair(a, b, &output, err).await,
        }
    }

    async fn fail_pair(
        &self,
        a: &Path,
        b: &Path,
        output: &Path,
        err: DuplexifyError,
    ) -> PairOutcome {
        let attempts = match self.merge_policy.attempts() {
            Attempts::Limited(n) => n.max(1),
            Attempts::Unlimited => 0,
        };
        error!(attempts, error = %err, "Giving up on merging files");

        if tokio::fs::try_exists(output).await.unwrap_or(false) {
            debug!(output = %output.display(), "Removing partial output");
            if let Err(err) = tokio::fs::remove_file(output).await {
                warn!(output = %output.display(), error = %err, "Failed removing partial output");
            }
        }

        let batch_dir = match self.quarantine.isolate(&[a, b]).await {
            Ok(batch_dir) => batch_dir,
            Err(err) => {
                // Unreachable with the unbounded move policy.
                error!(error = %err, "Failed creating error directory");
                self.quarantine.error_dir().to_path_buf()
            }
        };

        error!(dir = %batch_dir.display(), "Error occurred, moved files to error directory");

        self.notifier
            .send(&format!(
                "Merging {} and {} failed after {attempts} attempt(s): {err}. Moved both files to {}.",
                a.display(),
                b.display(),
                batch_dir.display()
            ))
            .await;

        PairOutcome::Quarantined { batch_dir }
    }
}

async fn delete_source(path: &Path) {
    if let Err(err) = tokio::fs::remove_file(path).await {
        warn!(path = %path.display(), error = %err, "Failed deleting merged source file");
    }
}
