//! Wire types for the lockpool resource protocol.
//!
//! Each invocation exchanges exactly one JSON document in each direction:
//! a request on stdin and a response on stdout. These types define both,
//! plus the `source` configuration block shared by all three commands.

use crate::error::{PoolError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A point in pool history: one commit on the coordinating branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// Commit id of the published state.
    #[serde(rename = "ref")]
    pub commit: String,
}

impl Version {
    pub fn new(commit: impl Into<String>) -> Self {
        Self {
            commit: commit.into(),
        }
    }
}

/// Source configuration shared by check, in, and out.
#[derive(Debug, Clone, Deserialize)]
pub struct Source {
    /// Location of the repository holding pool state.
    pub uri: String,

    /// Branch whose tip is the authoritative pool state.
    pub branch: String,

    /// Pool name; the sub-directory holding the lock buckets.
    pub pool: String,

    /// SSH key material used for transport. Written to a scratch file and
    /// handed to git; never interpreted here.
    #[serde(default)]
    pub private_key: Option<String>,

    /// Seconds to pause between retry attempts. Fractions allowed;
    /// defaults to 10 when absent.
    #[serde(default)]
    pub retry_delay: Option<f64>,

    /// Optional sub-path filter applied by check.
    #[serde(default)]
    pub paths: Option<String>,
}

/// One name/value pair in a command's metadata output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataPair {
    pub name: String,
    pub value: String,
}

impl MetadataPair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Request body for `check`.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckRequest {
    pub source: Source,
    #[serde(default)]
    pub version: Option<Version>,
}

/// Request body for `in`.
#[derive(Debug, Clone, Deserialize)]
pub struct InRequest {
    pub source: Source,
    pub version: Version,
}

/// Request body for `out`.
#[derive(Debug, Clone, Deserialize)]
pub struct OutRequest {
    pub source: Source,
    pub params: OutParams,
}

/// Operation selectors for `out`. Exactly one must be set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutParams {
    /// Claim a random unclaimed lock.
    #[serde(default)]
    pub acquire: bool,

    /// Return the lock named in `<dir>/name` to the pool.
    #[serde(default)]
    pub release: Option<PathBuf>,

    /// Delete the lock named in `<dir>/name` from the pool.
    #[serde(default)]
    pub remove: Option<PathBuf>,

    /// Register `<dir>/name` with payload `<dir>/metadata` as unclaimed.
    #[serde(default)]
    pub add: Option<PathBuf>,

    /// Same as `add`, but the lock starts life already claimed.
    #[serde(default)]
    pub add_claimed: Option<PathBuf>,
}

/// The single operation a `out` request selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutOperation {
    Acquire,
    Release(PathBuf),
    Remove(PathBuf),
    Add(PathBuf),
    AddClaimed(PathBuf),
}

impl OutParams {
    /// Resolve the params block to its operation.
    ///
    /// Selecting no operation, or more than one, is an input error.
    pub fn operation(&self) -> Result<OutOperation> {
        let mut operations = Vec::new();

        if self.acquire {
            operations.push(OutOperation::Acquire);
        }
        if let Some(dir) = &self.release {
            operations.push(OutOperation::Release(dir.clone()));
        }
        if let Some(dir) = &self.remove {
            operations.push(OutOperation::Remove(dir.clone()));
        }
        if let Some(dir) = &self.add {
            operations.push(OutOperation::Add(dir.clone()));
        }
        if let Some(dir) = &self.add_claimed {
            operations.push(OutOperation::AddClaimed(dir.clone()));
        }

        if operations.len() > 1 {
            return Err(PoolError::InputInvalid(
                "params select more than one operation".to_string(),
            ));
        }

        operations.pop().ok_or_else(|| {
            PoolError::InputInvalid(
                "params select no operation; expected one of acquire, release, remove, add, add_claimed"
                    .to_string(),
            )
        })
    }
}

/// Response document for `in` and `out`: the version acted on plus
/// human-facing metadata pairs.
#[derive(Debug, Clone, Serialize)]
pub struct OperationResponse {
    pub version: Version,
    pub metadata: Vec<MetadataPair>,
}
