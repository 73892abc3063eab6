//! Utilities for timestamps, file ages and collision-free target names.

use chrono::{DateTime, Local};
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Format used for output files and quarantine batch directories.
///
/// Lexicographic order equals chronological order.
pub const SORTABLE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Render a point in time as a sortable, filesystem-safe name.
pub fn sortable_name(at: DateTime<Local>) -> String {
    at.format(SORTABLE_TIMESTAMP_FORMAT).to_string()
}

/// The timestamp used to order and age candidate files.
///
/// Creation time where the platform and filesystem report it, last
/// modification time otherwise.
pub fn file_timestamp(metadata: &Metadata) -> io::Result<SystemTime> {
    metadata.created().or_else(|_| metadata.modified())
}

/// Age of a file relative to `now`.
///
/// Timestamps in the future (clock skew on network shares) count as age zero.
pub fn file_age(path: &Path, now: SystemTime) -> io::Result<Duration> {
    let metadata = std::fs::metadata(path)?;
    let timestamp = file_timestamp(&metadata)?;
    Ok(now.duration_since(timestamp).unwrap_or(Duration::ZERO))
}

/// Pick a path under `dir` named `stem` (plus `extension`) that does not exist yet.
///
/// Appends `_1`, `_2`, ... to the stem until the name is free.
///
/// # Examples
///
/// ```no_run
/// use duplexify::utils::unique_path;
/// use std::path::Path;
///
/// let out = unique_path(Path::new("/srv/out"), "2024-01-31_08-15-00", Some("pdf"));
/// ```
pub fn unique_path(dir: &Path, stem: &str, extension: Option<&str>) -> PathBuf {
    let name = |suffix: Option<usize>| {
        let mut name = match suffix {
            Some(n) => format!("{stem}_{n}"),
            None => stem.to_string(),
        };
        if let Some(ext) = extension {
            name.push('.');
            name.push_str(ext);
        }
        name
    };

    let mut candidate = dir.join(name(None));
    let mut n = 0;
    while candidate.exists() {
        n += 1;
        candidate = dir.join(name(Some(n)));
    }
    candidate
}
