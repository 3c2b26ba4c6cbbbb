//! Error types for the lockpool CLI.
//!
//! Uses thiserror for derive macros. Every variant carries a retry
//! classification: expected conflicts are absorbed silently by the retry
//! engine, unexpected transient failures are absorbed with a diagnostic,
//! and terminal errors surface to the caller with a mapped exit code.

use crate::exit_codes;
use crate::pool::Bucket;
use thiserror::Error;

/// Main error type for lockpool operations.
#[derive(Error, Debug)]
pub enum PoolError {
    /// Cloning or configuring the scratch working copy failed.
    #[error("failed to prepare pool checkout: {0}")]
    SetupFailed(String),

    /// Fast-forwarding the working copy to the remote tip failed.
    #[error("failed to refresh pool state: {0}")]
    ResetFailed(String),

    /// A lock was not present in the bucket an operation expected.
    #[error("lock '{name}' not found in {bucket}")]
    LockMissing { name: String, bucket: Bucket },

    /// The remote rejected the publish because another client moved the
    /// pool first.
    #[error("pool state changed upstream before publish")]
    Conflict,

    /// Publishing failed for a reason other than a concurrent update.
    #[error("failed to publish pool state: {0}")]
    PublishFailed(String),

    /// Acquire found the unclaimed bucket empty.
    #[error("no locks available to claim")]
    NoLocksAvailable,

    /// Malformed caller input.
    #[error("{0}")]
    InputInvalid(String),

    /// A git invocation failed in a way no other variant covers.
    #[error("{0}")]
    GitFailed(String),
}

/// How the retry engine treats an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// A publish-time CAS loss. Retried silently.
    Expected,
    /// A transient failure. Retried with a diagnostic on stderr.
    Unexpected,
    /// Propagated to the caller.
    Terminal,
}

impl PoolError {
    /// Classify this error for the retry engine.
    pub fn retry_class(&self) -> RetryClass {
        match self {
            PoolError::Conflict => RetryClass::Expected,
            PoolError::ResetFailed(_) | PoolError::PublishFailed(_) | PoolError::GitFailed(_) => {
                RetryClass::Unexpected
            }
            _ => RetryClass::Terminal,
        }
    }

    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            PoolError::InputInvalid(_) => exit_codes::INPUT_ERROR,
            PoolError::NoLocksAvailable => exit_codes::NO_LOCKS,
            PoolError::LockMissing { .. } => exit_codes::LOCK_MISSING,
            _ => exit_codes::GIT_FAILURE,
        }
    }
}

/// Result type alias for lockpool operations.
pub type Result<T> = std::result::Result<T, PoolError>;
