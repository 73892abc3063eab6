//! Pairing and merging of queued scans.
//!
//! - [`tool`]: the external merge program behind the [`MergeTool`] trait
//! - [`worker`]: stale-file reaping, pairing, retries and cleanup
//! - [`quarantine`]: per-failure batch directories for failed inputs
//!
//! # Examples
//!
//! ```no_run
//! use duplexify::config::Config;
//! use duplexify::merge::{MergeCommand, MergeWorker};
//! use duplexify::notify::NullNotifier;
//! use duplexify::queue::MergeQueue;
//! use std::sync::Arc;
//!
//! # async fn example() -> duplexify::Result<()> {
//! let config = Config::default();
//! let queue = MergeQueue::new();
//! queue.enqueue("/srv/scans/odd.pdf").await;
//! queue.enqueue("/srv/scans/even.pdf").await;
//!
//! let worker = MergeWorker::new(
//!     &config,
//!     queue,
//!     Arc::new(MergeCommand::from_config(&config)),
//!     Arc::new(NullNotifier),
//! );
//! let outcome = worker.tick().await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

pub mod quarantine;
pub mod tool;
pub mod worker;

pub use quarantine::Quarantine;
pub use tool::{MergeCommand, MergeTool};
pub use worker::{MergeWorker, PairOutcome};
