//! duplexify - Merge duplex-scanned PDF pages dropped into a watched directory.
//!
//! A scanner without a duplex unit writes the odd pages and the even pages
//! of a document as two separate files. duplexify watches the directory the
//! scanner writes into, pairs the files in arrival order, hands each pair to
//! an external merge tool (pdftk by default) and writes the combined
//! document to an output directory. Pairs that cannot be merged are moved to
//! a timestamped error directory instead of being lost.
//!
//! The pipeline has two stages that run as independent tasks:
//!
//! - [`watch::DirectoryWatcher`] scans the watch directory through
//!   [`discovery::Discovery`] and appends new files to the [`queue::MergeQueue`]
//! - [`merge::MergeWorker`] evicts a stale lone file, pairs the two oldest
//!   queued files and merges them with bounded retries
//!
//! # Examples
//!
//! ```no_run
//! use duplexify::{Config, Service};
//! use std::path::PathBuf;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = Config {
//!     watch_dir: PathBuf::from("/srv/scans"),
//!     out_dir: PathBuf::from("/srv/documents"),
//!     error_dir: PathBuf::from("/srv/failed"),
//!     ..Default::default()
//! };
//! config.validate()?;
//! config.prepare_directories()?;
//!
//! Service::from_config(config).run(CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod merge;
pub mod notify;
pub mod queue;
pub mod retry;
pub mod service;
pub mod utils;
pub mod watch;

// Re-export commonly used types
pub use config::Config;
pub use error::{DuplexifyError, Result};
pub use service::Service;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
