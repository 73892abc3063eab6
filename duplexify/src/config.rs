//! Configuration module for duplexify.
//!
//! This module holds the validated, normalized configuration that drives the
//! watch loop and the merge worker. It handles:
//! - Defaults for every tunable
//! - Parsing of human-friendly durations ("5s", "1h")
//! - Validation of directory combinations and the merge argument template
//! - Creation and canonicalization of the working directories

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::{DuplexifyError, Result};

/// Placeholder for the first (older) input file in merge arguments.
pub const PLACEHOLDER_A: &str = "{a}";

/// Placeholder for the second (newer) input file in merge arguments.
pub const PLACEHOLDER_B: &str = "{b}";

/// Placeholder for the output file in merge arguments.
pub const PLACEHOLDER_OUTPUT: &str = "{output}";

/// Default merge tool.
pub const DEFAULT_MERGE_COMMAND: &str = "pdftk";

/// Default pdftk invocation: interleave A with B reversed, which turns a
/// stack of odd pages and a stack of even pages scanned back to front into
/// one document.
pub const DEFAULT_MERGE_ARGS: [&str; 7] = [
    "A={a}",
    "B={b}",
    "shuffle",
    "A",
    "Bend-1",
    "output",
    "{output}",
];

/// Parse a duration such as `500ms`, `5s`, `10m`, `1h` or `2d`.
///
/// A bare number is taken as seconds.
///
/// # Errors
///
/// Returns an error for empty input, negative or non-numeric values and
/// unknown units.
///
/// # Examples
///
/// ```
/// use duplexify::config::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
/// assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
/// assert_eq!(parse_duration("30").unwrap(), Duration::from_secs(30));
/// ```
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return Err(DuplexifyError::invalid_config("Duration cannot be empty"));
    }

    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (value, unit) = s.split_at(split);

    let value: u64 = value.parse().map_err(|_| {
        DuplexifyError::invalid_config(format!("Invalid duration: {s}. Expected e.g. '5s' or '1h'"))
    })?;

    let duration = match unit.trim() {
        "" | "s" => Duration::from_secs(value),
        "ms" => Duration::from_millis(value),
        "m" => Duration::from_secs(value.saturating_mul(60)),
        "h" => Duration::from_secs(value.saturating_mul(60 * 60)),
        "d" => Duration::from_secs(value.saturating_mul(60 * 60 * 24)),
        other => {
            return Err(DuplexifyError::invalid_config(format!(
                "Invalid duration unit '{other}' in {s}. Must be one of: ms, s, m, h, d"
            )));
        }
    };

    Ok(duration)
}

/// Credentials for Pushover error notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushoverConfig {
    /// Application token.
    #[serde(skip_serializing)]
    pub token: String,
    /// User or group key.
    #[serde(skip_serializing)]
    pub user: String,
}

/// Complete configuration for a duplexify service run.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Directory the scanner writes into.
    pub watch_dir: PathBuf,

    /// Directory merged documents are written to.
    pub out_dir: PathBuf,

    /// Directory receiving one batch subdirectory per failed pair.
    pub error_dir: PathBuf,

    /// Extension of candidate files, without the dot. Matched case-insensitively.
    pub extension: String,

    /// Minimum age before a file becomes eligible (zero = immediately).
    pub processing_delay: Duration,

    /// Interval between two directory scans.
    pub poll_interval: Duration,

    /// Interval between two merge worker ticks.
    pub merge_interval: Duration,

    /// Age after which a lone queued file is deleted.
    pub stale_file_timeout: Duration,

    /// Retries after the first failed merge attempt.
    pub merge_retry_count: u32,

    /// Fixed delay between merge attempts.
    pub merge_retry_delay: Duration,

    /// Fixed delay between attempts to move a file into quarantine.
    pub move_retry_delay: Duration,

    /// Merge tool program.
    pub merge_command: String,

    /// Merge tool arguments with `{a}`, `{b}` and `{output}` placeholders.
    pub merge_args: Vec<String>,

    /// Pushover credentials (None = notifications disabled).
    pub pushover: Option<PushoverConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watch_dir: PathBuf::from("watch"),
            out_dir: PathBuf::from("out"),
            error_dir: PathBuf::from("error"),
            extension: "pdf".to_string(),
            processing_delay: Duration::ZERO,
            poll_interval: Duration::from_secs(1),
            merge_interval: Duration::from_secs(1),
            stale_file_timeout: Duration::from_secs(60 * 60),
            merge_retry_count: 5,
            merge_retry_delay: Duration::from_secs(5),
            move_retry_delay: Duration::from_secs(1),
            merge_command: DEFAULT_MERGE_COMMAND.to_string(),
            merge_args: DEFAULT_MERGE_ARGS.iter().map(|s| s.to_string()).collect(),
            pushover: None,
        }
    }
}

impl Config {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The watch directory is also the output or error directory
    /// - The extension is empty
    /// - A loop interval is zero
    /// - The merge command is empty or its arguments miss a placeholder
    pub fn validate(&self) -> Result<()> {
        let watch = absolute(&self.watch_dir)?;

        if watch == absolute(&self.out_dir)? {
            return Err(DuplexifyError::invalid_config(format!(
                "Watch directory and output directory must differ: {}",
                self.watch_dir.display()
            )));
        }

        if watch == absolute(&self.error_dir)? {
            return Err(DuplexifyError::invalid_config(format!(
                "Watch directory and error directory must differ: {}",
                self.watch_dir.display()
            )));
        }

        let extension = self.extension.trim_start_matches('.');
        if extension.is_empty() {
            return Err(DuplexifyError::invalid_config("Extension cannot be empty"));
        }

        if self.poll_interval.is_zero() || self.merge_interval.is_zero() {
            return Err(DuplexifyError::invalid_config(
                "Poll and merge intervals must be greater than zero",
            ));
        }

        if self.merge_command.trim().is_empty() {
            return Err(DuplexifyError::invalid_config("Merge command cannot be empty"));
        }

        for placeholder in [PLACEHOLDER_A, PLACEHOLDER_B, PLACEHOLDER_OUTPUT] {
            if !self.merge_args.iter().any(|arg| arg.contains(placeholder)) {
                return Err(DuplexifyError::invalid_config(format!(
                    "Merge arguments must contain the {placeholder} placeholder"
                )));
            }
        }

        Ok(())
    }

    /// Create missing working directories and make all three paths absolute.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created or resolved.
    pub fn prepare_directories(&mut self) -> Result<()> {
        for dir in [&mut self.watch_dir, &mut self.out_dir, &mut self.error_dir] {
            std::fs::create_dir_all(&*dir).map_err(|e| {
                DuplexifyError::invalid_config(format!(
                    "Cannot create directory {}: {e}",
                    dir.display()
                ))
            })?;
            *dir = dir.canonicalize()?;
        }
        Ok(())
    }

    /// Extension without a leading dot.
    pub fn extension(&self) -> &str {
        self.extension.trim_start_matches('.')
    }

    /// Log every tunable that differs from its default.
    pub fn log_overrides(&self) {
        let defaults = Self::default();

        if self.extension() != defaults.extension {
            info!(extension = %self.extension(), "Extension is overridden");
        }
        if self.processing_delay != defaults.processing_delay {
            info!(delay = ?self.processing_delay, "Processing delay is set");
        }
        if self.poll_interval != defaults.poll_interval {
            info!(interval = ?self.poll_interval, "Poll interval is set");
        }
        if self.merge_interval != defaults.merge_interval {
            info!(interval = ?self.merge_interval, "Merge interval is set");
        }
        if self.stale_file_timeout != defaults.stale_file_timeout {
            info!(timeout = ?self.stale_file_timeout, "Stale file timeout is set");
        }
        if self.merge_retry_count != defaults.merge_retry_count {
            info!(count = self.merge_retry_count, "Merge retry count is set");
        }
        if self.merge_retry_delay != defaults.merge_retry_delay {
            info!(delay = ?self.merge_retry_delay, "Merge retry delay is set");
        }
        if self.move_retry_delay != defaults.move_retry_delay {
            info!(delay = ?self.move_retry_delay, "Move retry delay is set");
        }
        if self.merge_command != defaults.merge_command || self.merge_args != defaults.merge_args {
            info!(
                command = %self.merge_command,
                args = ?self.merge_args,
                "Merge tool is overridden"
            );
        }
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    Ok(std::path::absolute(path)?)
}
