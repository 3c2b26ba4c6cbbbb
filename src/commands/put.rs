//! The `out` command: pool mutations driven by the request's params.
//!
//! Release, remove, and add read their lock from a caller-provided
//! directory: a `name` file holding the lock name and, for add, a
//! `metadata` file holding the payload. The directories are resolved
//! relative to the build's sources directory.

use crate::error::{PoolError, Result};
use crate::pool::LockPool;
use crate::protocol::{
    MetadataPair, OperationResponse, OutOperation, OutRequest, Source, Version,
};
use std::fs;
use std::path::Path;

pub fn run(request: OutRequest, sources: &Path) -> Result<OperationResponse> {
    let operation = request.params.operation()?;
    let mut pool = LockPool::new(&request.source);

    let (name, version) = match operation {
        OutOperation::Acquire => pool.acquire()?,
        OutOperation::Release(dir) => pool.release(&read_lock_name(&sources.join(dir))?)?,
        OutOperation::Remove(dir) => pool.remove(&read_lock_name(&sources.join(dir))?)?,
        OutOperation::Add(dir) => {
            let dir = sources.join(dir);
            pool.add(&read_lock_name(&dir)?, &read_payload(&dir)?)?
        }
        OutOperation::AddClaimed(dir) => {
            let dir = sources.join(dir);
            pool.add_claimed(&read_lock_name(&dir)?, &read_payload(&dir)?)?
        }
    };

    Ok(response(name, version, &request.source))
}

fn response(name: String, version: Version, source: &Source) -> OperationResponse {
    OperationResponse {
        version,
        metadata: vec![
            MetadataPair::new("lock_name", name),
            MetadataPair::new("pool_name", source.pool.clone()),
        ],
    }
}

/// Read and validate the `name` file of a lock directory.
fn read_lock_name(dir: &Path) -> Result<String> {
    let path = dir.join("name");
    let raw = fs::read_to_string(&path).map_err(|e| {
        PoolError::InputInvalid(format!(
            "failed to read lock name from '{}': {}",
            path.display(),
            e
        ))
    })?;

    let name = raw.trim();
    if name.is_empty() {
        return Err(PoolError::InputInvalid(format!(
            "lock name file '{}' is empty",
            path.display()
        )));
    }
    // Lock names are plain file names inside a bucket; anything else could
    // escape the pool directory.
    if name.starts_with('.') || name.contains('/') || name.contains('\\') {
        return Err(PoolError::InputInvalid(format!(
            "'{name}' is not a valid lock name"
        )));
    }

    Ok(name.to_string())
}

/// Read the `metadata` payload file of a lock directory.
fn read_payload(dir: &Path) -> Result<Vec<u8>> {
    let path = dir.join("metadata");
    fs::read(&path).map_err(|e| {
        PoolError::InputInvalid(format!(
            "failed to read lock metadata from '{}': {}",
            path.display(),
            e
        ))
    })
}
