//! CLI argument parsing for duplexify.
//!
//! Every option can also be set through a `DUPLEXIFY_*` environment
//! variable, which is how the service is usually configured in a container.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use duplexify::config::{Config, PushoverConfig, parse_duration};
use duplexify::error::{DuplexifyError, Result};

/// Merge duplex-scanned PDF pages dropped into a watched directory.
///
/// The scanner writes the odd pages and then the even pages of a document
/// as two files. duplexify pairs them in arrival order, merges each pair
/// with an external tool and writes the result to the output directory.
/// Pairs that fail are moved to a timestamped subdirectory of the error
/// directory.
#[derive(Parser, Debug)]
#[command(name = "duplexify")]
#[command(version)]
#[command(
    about = "Merge duplex-scanned PDF pages dropped into a watched directory",
    long_about = None
)]
#[command(author)]
pub struct Cli {
    /// Directory the scanner writes into
    #[arg(short, long, value_name = "DIR", env = "DUPLEXIFY_WATCH_DIR", default_value = "watch")]
    pub watch_dir: PathBuf,

    /// Directory merged documents are written to
    #[arg(short, long, value_name = "DIR", env = "DUPLEXIFY_OUT_DIR", default_value = "out")]
    pub out_dir: PathBuf,

    /// Directory receiving the inputs of failed merges
    #[arg(short, long, value_name = "DIR", env = "DUPLEXIFY_ERROR_DIR", default_value = "error")]
    pub error_dir: PathBuf,

    /// Extension of scanned files (matched case-insensitively)
    #[arg(long, value_name = "EXT", env = "DUPLEXIFY_EXTENSION", default_value = "pdf")]
    pub extension: String,

    /// Minimum age of a file before it is picked up (e.g. "10s")
    ///
    /// Some scanners keep writing to a network share after the file first
    /// appears. A delay keeps duplexify from grabbing half-written files.
    #[arg(long, value_name = "DURATION", env = "DUPLEXIFY_PROCESSING_DELAY", default_value = "0s")]
    pub processing_delay: String,

    /// Interval between two scans of the watch directory
    #[arg(long, value_name = "DURATION", env = "DUPLEXIFY_POLL_INTERVAL", default_value = "1s")]
    pub poll_interval: String,

    /// Interval between two merge attempts on the queue
    #[arg(long, value_name = "DURATION", env = "DUPLEXIFY_MERGE_INTERVAL", default_value = "1s")]
    pub merge_interval: String,

    /// Age after which a file without a partner is deleted
    #[arg(
        long,
        value_name = "DURATION",
        env = "DUPLEXIFY_STALE_FILE_TIMEOUT",
        default_value = "1h"
    )]
    pub stale_file_timeout: String,

    /// Retries after a failed merge before the pair is moved to the error directory
    #[arg(long, value_name = "N", env = "DUPLEXIFY_MERGE_RETRY_COUNT", default_value_t = 5)]
    pub merge_retry_count: u32,

    /// Delay between merge attempts
    #[arg(long, value_name = "DURATION", env = "DUPLEXIFY_MERGE_RETRY_DELAY", default_value = "5s")]
    pub merge_retry_delay: String,

    /// Delay between attempts to move a failed file to the error directory
    #[arg(long, value_name = "DURATION", env = "DUPLEXIFY_MOVE_RETRY_DELAY", default_value = "1s")]
    pub move_retry_delay: String,

    /// Merge tool to run
    #[arg(long, value_name = "PROGRAM", env = "DUPLEXIFY_MERGE_COMMAND", default_value = "pdftk")]
    pub merge_command: String,

    /// Merge tool arguments; {a}, {b} and {output} are replaced per pair
    ///
    /// Defaults to the pdftk invocation that interleaves the odd pages with
    /// the even pages in reverse order:
    ///   A={a} B={b} shuffle A Bend-1 output {output}
    #[arg(
        long,
        value_name = "ARG",
        env = "DUPLEXIFY_MERGE_ARGS",
        num_args = 1..,
        allow_hyphen_values = true,
        value_delimiter = ' '
    )]
    pub merge_args: Vec<String>,

    /// Pushover application token for error notifications
    #[arg(long, value_name = "TOKEN", env = "DUPLEXIFY_PUSHOVER_TOKEN", hide_env_values = true)]
    pub pushover_token: Option<String>,

    /// Pushover user key for error notifications
    #[arg(long, value_name = "USER", env = "DUPLEXIFY_PUSHOVER_USER", hide_env_values = true)]
    pub pushover_user: Option<String>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Convert CLI arguments into a validated Config.
    ///
    /// # Errors
    ///
    /// Returns an error if a duration cannot be parsed, only one of the
    /// Pushover credentials is given, or the configuration is invalid.
    pub fn to_config(&self) -> Result<Config> {
        let duration = |name: &str, value: &str| -> Result<Duration> {
            parse_duration(value)
                .map_err(|e| DuplexifyError::invalid_config(format!("--{name}: {e}")))
        };

        let pushover = match (&self.pushover_token, &self.pushover_user) {
            (Some(token), Some(user)) => Some(PushoverConfig {
                token: token.clone(),
                user: user.clone(),
            }),
            (None, None) => None,
            _ => {
                return Err(DuplexifyError::invalid_config(
                    "Pushover needs both --pushover-token and --pushover-user",
                ));
            }
        };

        let defaults = Config::default();
        let merge_args = if self.merge_args.is_empty() {
            defaults.merge_args
        } else {
            self.merge_args.clone()
        };

        let config = Config {
            watch_dir: self.watch_dir.clone(),
            out_dir: self.out_dir.clone(),
            error_dir: self.error_dir.clone(),
            extension: self.extension.clone(),
            processing_delay: duration("processing-delay", &self.processing_delay)?,
            poll_interval: duration("poll-interval", &self.poll_interval)?,
            merge_interval: duration("merge-interval", &self.merge_interval)?,
            stale_file_timeout: duration("stale-file-timeout", &self.stale_file_timeout)?,
            merge_retry_count: self.merge_retry_count,
            merge_retry_delay: duration("merge-retry-delay", &self.merge_retry_delay)?,
            move_retry_delay: duration("move-retry-delay", &self.move_retry_delay)?,
            merge_command: self.merge_command.clone(),
            merge_args,
            pushover,
        };

        config.validate()?;

        Ok(config)
    }
}
