//! Candidate file discovery.
//!
//! A scan lists the watch directory (non-recursively) and keeps the files
//! that
//! 1. carry the configured extension, compared case-insensitively,
//! 2. are older than the processing delay, if one is set,
//! 3. can be opened for writing and exclusively locked right now.
//!
//! The result is sorted ascending by creation time (see
//! [`file_timestamp`](crate::utils::file_timestamp)), ties broken by path.
//!
//! # Examples
//!
//! ```no_run
//! use duplexify::discovery::Discovery;
//! use std::time::Duration;
//!
//! # fn example() -> duplexify::Result<()> {
//! let discovery = Discovery::new("/srv/scans", "pdf", Duration::ZERO)?;
//! for path in discovery.scan()? {
//!     println!("{}", path.display());
//! }
//! # Ok(())
//! # }
//! ```

use fs2::FileExt;
use globset::{GlobBuilder, GlobMatcher};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::error::{DuplexifyError, Result};
use crate::utils::file_timestamp;

/// Lists eligible files in one directory.
#[derive(Debug, Clone)]
pub struct Discovery {
    dir: PathBuf,
    matcher: GlobMatcher,
    delay: Duration,
}

impl Discovery {
    /// Create a discovery for `dir`, matching `*.<extension>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the extension does not form a valid glob or the
    /// directory path cannot be made absolute.
    pub fn new(dir: impl AsRef<Path>, extension: &str, delay: Duration) -> Result<Self> {
        let extension = extension.trim_start_matches('.');
        let matcher = GlobBuilder::new(&format!("*.{extension}"))
            .case_insensitive(true)
            .literal_separator(true)
            .build()
            .map_err(|e| DuplexifyError::invalid_config(format!("Invalid extension: {e}")))?
            .compile_matcher();

        Ok(Self {
            dir: std::path::absolute(dir.as_ref())?,
            matcher,
            delay,
        })
    }

    /// The directory being scanned.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether a file name carries the watched extension.
    pub fn matches(&self, path: impl AsRef<Path>) -> bool {
        path.as_ref()
            .file_name()
            .is_some_and(|name| self.matcher.is_match(name))
    }

    /// Scan the directory once.
    ///
    /// Entries that vanish or become unreadable mid-scan are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`DuplexifyError::Discovery`] if the directory itself cannot
    /// be listed (missing, permission denied).
    pub fn scan(&self) -> Result<Vec<PathBuf>> {
        let now = SystemTime::now();
        let mut candidates = Vec::new();

        for entry in WalkDir::new(&self.dir).min_depth(1).max_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.depth() == 0 => {
                    return Err(DuplexifyError::discovery(&self.dir, err.into()));
                }
                Err(err) => {
                    debug!(error = %err, "Skipping unreadable entry");
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.matches(entry.path()) {
                continue;
            }

            let timestamp = match entry
                .metadata()
                .map_err(std::io::Error::from)
                .and_then(|metadata| file_timestamp(&metadata))
            {
                Ok(timestamp) => timestamp,
                Err(err) => {
                    debug!(
                        path = %entry.path().display(),
                        error = %err,
                        "Skipping file without timestamp"
                    );
                    continue;
                }
            };

            if !self.delay_elapsed(timestamp, now) {
                trace!(path = %entry.path().display(), "Processing delay not elapsed");
                continue;
            }

            if is_locked(entry.path()) {
                trace!(path = %entry.path().display(), "File is locked for writing");
                continue;
            }

            candidates.push((timestamp, entry.into_path()));
        }

        candidates.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        Ok(candidates.into_iter().map(|(_, path)| path).collect())
    }

    fn delay_elapsed(&self, timestamp: SystemTime, now: SystemTime) -> bool {
        if self.delay.is_zero() {
            return true;
        }
        now.duration_since(timestamp)
            .is_ok_and(|age| age > self.delay)
    }
}

/// Check whether a file is currently locked against writing.
///
/// Opens the file for writing and takes a non-blocking exclusive advisory
/// lock, releasing both immediately. Any failure counts as locked.
pub fn is_locked(path: &Path) -> bool {
    let file = match OpenOptions::new().write(true).open(path) {
        Ok(file) => file,
        Err(_) => return true,
    };

    match file.try_lock_exclusive() {
        Ok(()) => {
            let _ = FileExt::unlock(&file);
            false
        }
        Err(_) => true,
    }
}
