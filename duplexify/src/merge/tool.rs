//! The external merge tool.
//!
//! Interleaving pages is not done in-process: a subprocess receives the two
//! input paths and the output path and reports success through its exit
//! status.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::{Config, PLACEHOLDER_A, PLACEHOLDER_B, PLACEHOLDER_OUTPUT};
use crate::error::{DuplexifyError, Result};

/// Something that merges two single-sided scans into one document.
#[async_trait]
pub trait MergeTool: Send + Sync {
    /// Merge `a` (odd pages) and `b` (even pages) into `output`.
    ///
    /// # Errors
    ///
    /// Any error counts as one failed attempt.
    async fn merge(&self, a: &Path, b: &Path, output: &Path) -> Result<()>;
}

/// Runs a configured program with an argument template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeCommand {
    program: String,
    args: Vec<String>,
}

impl MergeCommand {
    /// Create a command from a program and its argument template.
    pub fn new(
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Build the command from `merge_command` and `merge_args`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.merge_command.clone(), config.merge_args.clone())
    }

    /// The program being run.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Substitute the placeholders for one invocation.
    ///
    /// An argument that is exactly a placeholder is passed through as the
    /// raw path; placeholders embedded in a longer argument are replaced by
    /// the path's (lossy) UTF-8 rendering.
    pub fn render_args(&self, a: &Path, b: &Path, output: &Path) -> Vec<OsString> {
        let substitutions = [(PLACEHOLDER_A, a), (PLACEHOLDER_B, b), (PLACEHOLDER_OUTPUT, output)];

        self.args
            .iter()
            .map(|arg| {
                if let Some((_, path)) = substitutions.iter().find(|(p, _)| arg.as_str() == *p) {
                    return path.as_os_str().to_owned();
                }
                let mut rendered = arg.clone();
                for (placeholder, path) in &substitutions {
                    if rendered.contains(placeholder) {
                        rendered = rendered.replace(placeholder, &path.to_string_lossy());
                    }
                }
                OsString::from(rendered)
            })
            .collect()
    }
}

#[async_trait]
impl MergeTool for MergeCommand {
    async fn merge(&self, a: &Path, b: &Path, output: &Path) -> Result<()> {
        let args = self.render_args(a, b, output);
        debug!(program = %self.program, ?args, "Running merge tool");

        let result = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| DuplexifyError::MergeLaunch {
                program: self.program.clone(),
                source,
            })?;

        debug!(status = %result.status, "Merge tool finished");

        if result.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&result.stderr);
        if !stderr.trim().is_empty() {
            warn!(program = %self.program, stderr = %stderr.trim(), "Merge tool reported an error");
        }

        Err(DuplexifyError::MergeExit {
            program: self.program.clone(),
            status: result.status,
        })
    }
}
