//! Git command runner for lockpool.
//!
//! Provides a safe wrapper around git commands with captured stdout/stderr
//! and structured error handling. All git operations go through this module.

use crate::error::{PoolError, Result};
use std::path::Path;
use std::process::{Command, ExitStatus, Output};

/// Captured output of a git command execution.
#[derive(Debug, Clone)]
pub struct GitOutput {
    /// Standard output from the command (trimmed).
    pub stdout: String,
    /// Standard error from the command (trimmed).
    pub stderr: String,
}

impl GitOutput {
    /// Create a new GitOutput from raw output bytes.
    fn from_output(output: &Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }

    /// Both streams joined, for callers that classify output textually.
    pub fn combined(&self) -> String {
        if self.stdout.is_empty() {
            self.stderr.clone()
        } else if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }

    /// Returns stdout lines as a vector.
    pub fn lines(&self) -> Vec<&str> {
        if self.stdout.is_empty() {
            Vec::new()
        } else {
            self.stdout.lines().collect()
        }
    }
}

/// Run a git command with the specified working directory.
///
/// # Arguments
///
/// * `cwd` - The working directory to run the command in
/// * `args` - The git command arguments (without "git" prefix)
///
/// # Returns
///
/// * `Ok(GitOutput)` - On successful execution (exit code 0)
/// * `Err(PoolError::GitFailed)` - On spawn failure or non-zero exit code
pub fn run_git<P: AsRef<Path>>(cwd: P, args: &[&str]) -> Result<GitOutput> {
    let (output, status) = run_git_unchecked(cwd, args)?;

    if status.success() {
        Ok(output)
    } else {
        let detail = if output.stderr.is_empty() {
            output.stdout
        } else {
            output.stderr
        };

        Err(PoolError::GitFailed(format!(
            "git {} failed (exit code {}): {}",
            args.first().unwrap_or(&""),
            status.code().unwrap_or(-1),
            detail
        )))
    }
}

/// Run a git command and hand back the raw outcome without judging the
/// exit status.
///
/// Push results cannot be trusted from the status alone: a rejected push
/// and an up-to-date push both need their output inspected before anyone
/// decides what happened. Only a spawn failure is an error here.
pub fn run_git_unchecked<P: AsRef<Path>>(
    cwd: P,
    args: &[&str],
) -> Result<(GitOutput, ExitStatus)> {
    let output = Command::new("git")
        .current_dir(cwd.as_ref())
        .args(args)
        .output()
        .map_err(|e| {
            PoolError::GitFailed(format!(
                "failed to execute git {}: {}",
                args.first().unwrap_or(&""),
                e
            ))
        })?;

    Ok((GitOutput::from_output(&output), output.status))
}
