//! Hosts the watch loop and the merge worker.
//!
//! Both loops run as separate tokio tasks on independent schedules and
//! share only the merge queue and one cancellation token.
//!
//! # Examples
//!
//! ```no_run
//! use duplexify::{Config, Service};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> duplexify::Result<()> {
//! let mut config = Config::default();
//! config.validate()?;
//! config.prepare_directories()?;
//!
//! let token = CancellationToken::new();
//! Service::from_config(config).run(token).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{DuplexifyError, Result};
use crate::merge::{MergeCommand, MergeTool, MergeWorker};
use crate::notify::{Notifier, notifier_from_config};
use crate::queue::MergeQueue;
use crate::watch::DirectoryWatcher;

/// The complete duplexify pipeline.
pub struct Service {
    config: Config,
    tool: Arc<dyn MergeTool>,
    notifier: Arc<dyn Notifier>,
}

impl Service {
    /// Create a service with explicit collaborators.
    pub fn new(config: Config, tool: Arc<dyn MergeTool>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            config,
            tool,
            notifier,
        }
    }

    /// Create a service using the configured merge command and notifier.
    pub fn from_config(config: Config) -> Self {
        let tool = Arc::new(MergeCommand::from_config(&config));
        let notifier = notifier_from_config(&config);
        Self::new(config, tool, notifier)
    }

    /// Run both loops until `token` is cancelled or the worker hits a fatal
    /// error, which cancels the token for the watcher as well.
    ///
    /// # Errors
    ///
    /// Returns the fatal error that stopped the worker, or an I/O error if
    /// a task panicked.
    pub async fn run(self, token: CancellationToken) -> Result<()> {
        let queue = MergeQueue::new();
        let watcher = DirectoryWatcher::from_config(&self.config, queue.clone())?;
        let worker = MergeWorker::new(&self.config, queue, self.tool, self.notifier);

        info!(
            config = %serde_json::to_string(&self.config).unwrap_or_default(),
            "Starting duplexify"
        );

        let watch = tokio::spawn(watcher.run(token.clone()));

        let worker_token = token.clone();
        let merge = tokio::spawn(async move {
            let result = worker.run(worker_token.clone()).await;
            if let Err(err) = &result {
                error!(error = %err, "Merge worker failed");
                worker_token.cancel();
            }
            result
        });

        let (watch, merge) = tokio::join!(watch, merge);
        watch.map_err(task_failed)?;
        merge.map_err(task_failed)??;

        info!("Duplexify stopped");
        Ok(())
    }
}

fn task_failed(err: JoinError) -> DuplexifyError {
    DuplexifyError::from(std::io::Error::other(err))
}
