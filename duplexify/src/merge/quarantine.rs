//! Quarantine for inputs of failed merges.
//!
//! Each failure gets its own batch directory under the error directory,
//! named by a sortable timestamp. Moving a file there is retried until it
//! succeeds: a file that is neither merged nor quarantined is never
//! acceptable. Only a vanished source or a target holding a different file
//! stop the retry. Moves across filesystems go through a hidden partial copy
//! so an interrupted attempt can be resumed.

use chrono::Local;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

use crate::error::{DuplexifyError, Result};
use crate::retry::RetryPolicy;
use crate::utils::{sortable_name, unique_path};

/// Moves failed inputs into per-failure batch directories.
#[derive(Debug, Clone)]
pub struct Quarantine {
    error_dir: PathBuf,
    policy: RetryPolicy,
}

impl Quarantine {
    /// Create a quarantine under `error_dir`, retrying moves every `retry_delay`.
    pub fn new(error_dir: impl Into<PathBuf>, retry_delay: std::time::Duration) -> Self {
        Self {
            error_dir: error_dir.into(),
            policy: RetryPolicy::forever(retry_delay),
        }
    }

    /// The directory holding all batch directories.
    pub fn error_dir(&self) -> &Path {
        &self.error_dir
    }

    /// Create a fresh batch directory named after the current time.
    ///
    /// # Errors
    ///
    /// Only returns once the directory exists; the error type is kept for
    /// callers that wrap a bounded policy.
    pub async fn create_batch_dir(&self) -> Result<PathBuf> {
        let batch = unique_path(&self.error_dir, &sortable_name(Local::now()), None);

        self.policy
            .run(
                |_| tokio::fs::create_dir_all(&batch),
                |_| true,
                |attempt, err| {
                    warn!(
                        dir = %batch.display(),
                        attempt,
                        error = %err,
                        "Failed creating error directory, retrying"
                    );
                },
            )
            .await?;

        Ok(batch)
    }

    /// Move `file` into `batch`, keeping its base name.
    ///
    /// # Errors
    ///
    /// Returns [`DuplexifyError::Quarantine`] if the source no longer exists
    /// or the target name is already taken. Every other failure is retried.
    pub async fn move_into(&self, batch: &Path, file: &Path) -> Result<PathBuf> {
        let name = file.file_name().ok_or_else(|| DuplexifyError::Quarantine {
            path: file.to_path_buf(),
            target: batch.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
        })?;
        let target = batch.join(name);

        self.policy
            .run(
                |_| move_file(file, &target),
                is_transient,
                |attempt, err| {
                    warn!(
                        path = %file.display(),
                        attempt,
                        error = %err,
                        "Failed moving file to error directory, retrying"
                    );
                },
            )
            .await
            .map_err(|source| DuplexifyError::Quarantine {
                path: file.to_path_buf(),
                target: batch.to_path_buf(),
                source,
            })?;

        debug!(from = %file.display(), to = %target.display(), "Quarantined file");
        Ok(target)
    }

    /// Create a batch directory and move every file into it, in order.
    ///
    /// Files that cannot be moved are logged and skipped.
    pub async fn isolate(&self, files: &[&Path]) -> Result<PathBuf> {
        let batch = self.create_batch_dir().await?;
        for file in files {
            if let Err(err) = self.move_into(&batch, file).await {
                error!(error = %err, "Could not quarantine file");
            }
        }
        Ok(batch)
    }
}

fn is_transient(err: &io::Error) -> bool {
    !matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::AlreadyExists | io::ErrorKind::InvalidInput
    )
}

/// Rename `from` to `to`, falling back to copy + delete across filesystems.
///
/// Never replaces a different existing target. A target that already holds
/// the source's contents is what an interrupted copy + delete leaves
/// behind, so the move resumes by deleting the source.
async fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    if tokio::fs::try_exists(to).await? {
        return finish_interrupted_move(from, to).await;
    }

    match tokio::fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::CrossesDevices => {
            copy_then_remove(from, to).await
        }
        Err(err) => Err(err),
    }
}

/// Copy `from` next to `to` under a temporary name, rename it into place and
/// delete `from`. Each step can fail and be retried without losing data.
async fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    let partial = partial_path(to);
    tokio::fs::copy(from, &partial).await?;
    tokio::fs::rename(&partial, to).await?;
    tokio::fs::remove_file(from).await
}

async fn finish_interrupted_move(from: &Path, to: &Path) -> io::Result<()> {
    if !tokio::fs::try_exists(from).await? {
        debug!(to = %to.display(), "Source already gone, move completed earlier");
        return Ok(());
    }

    if same_contents(from, to).await? {
        debug!(from = %from.display(), "Resuming interrupted move");
        return tokio::fs::remove_file(from).await;
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("{} already exists", to.display()),
    ))
}

async fn same_contents(a: &Path, b: &Path) -> io::Result<bool> {
    let (meta_a, meta_b) = (tokio::fs::metadata(a).await?, tokio::fs::metadata(b).await?);
    if meta_a.len() != meta_b.len() {
        return Ok(false);
    }
    Ok(tokio::fs::read(a).await? == tokio::fs::read(b).await?)
}

/// Hidden sibling of `target` used while copying.
fn partial_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{name}.partial"))
}
