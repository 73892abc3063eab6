//! Error types for duplexify.
//!
//! Errors fall into two groups. Recoverable errors (a failed merge attempt,
//! an unreadable watch directory, a lost notification) are handled by the
//! component that detects them and only ever show up in the log. Fatal
//! errors (invalid configuration, a broken queue invariant) end the service
//! run and decide the process exit code.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

/// Result type alias for duplexify operations.
pub type Result<T> = std::result::Result<T, DuplexifyError>;

/// Main error type for duplexify operations.
#[derive(Debug, thiserror::Error)]
pub enum DuplexifyError {
    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of what's wrong with the configuration.
        message: String,
    },

    /// The watch directory could not be listed.
    #[error("Failed to scan directory: {}\n  Reason: {source}", path.display())]
    Discovery {
        /// Directory being scanned.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The merge tool could not be started at all.
    #[error("Failed to launch merge tool '{program}': {source}")]
    MergeLaunch {
        /// Program that was invoked.
        program: String,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The merge tool ran but reported failure.
    #[error("Merge tool '{program}' exited with {status}")]
    MergeExit {
        /// Program that was invoked.
        program: String,
        /// Exit status reported by the process.
        status: ExitStatus,
    },

    /// A file could not be moved into the quarantine directory.
    #[error(
        "Failed to quarantine {} into {}\n  Reason: {source}",
        path.display(),
        target.display()
    )]
    Quarantine {
        /// Source file.
        path: PathBuf,
        /// Quarantine directory.
        target: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// An error notification could not be delivered.
    #[error("Failed to send notification: {reason}")]
    Notification {
        /// Details about the failure.
        reason: String,
    },

    /// The merge queue contradicted a length check made just before.
    #[error("Merge queue invariant violated: {message}")]
    QueueInvariant {
        /// What was expected.
        message: String,
    },

    /// Generic I/O error.
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error.
        #[from]
        source: io::Error,
    },
}

impl DuplexifyError {
    /// Create an InvalidConfig error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a Discovery error.
    pub fn discovery(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Discovery {
            path: path.into(),
            source,
        }
    }

    /// Create a QueueInvariant error.
    pub fn queue_invariant(message: impl Into<String>) -> Self {
        Self::QueueInvariant {
            message: message.into(),
        }
    }

    /// Create a Notification error.
    pub fn notification(reason: impl Into<String>) -> Self {
        Self::Notification {
            reason: reason.into(),
        }
    }

    /// Get the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidConfig { .. } => 1,
            Self::Discovery { .. } => 2,
            Self::MergeLaunch { .. } => 3,
            Self::MergeExit { .. } => 3,
            Self::Quarantine { .. } => 4,
            Self::Notification { .. } => 5,
            Self::QueueInvariant { .. } => 70, // EX_SOFTWARE
            Self::Io { .. } => 74,             // EX_IOERR
        }
    }
}
