//! The `in` command: materialise the lock a version refers to.
//!
//! Every published version records one lock's state change in its commit
//! subject. `in` recovers the lock name from that subject, reads the
//! payload as it was at that version, and writes both into the
//! destination so downstream steps can use them.

use crate::error::{PoolError, Result};
use crate::pool::{
    ADD_PREFIX, CLAIM_PREFIX, GitLockHandler, LockHandler, REMOVE_PREFIX, UNCLAIM_PREFIX,
};
use crate::protocol::{InRequest, MetadataPair, OperationResponse};
use std::fs;
use std::path::Path;

pub fn run(request: InRequest, destination: &Path) -> Result<OperationResponse> {
    let mut handler = GitLockHandler::new(request.source.clone());
    handler.setup()?;

    if !handler.resolves(&request.version.commit)? {
        return Err(PoolError::InputInvalid(format!(
            "version '{}' does not exist on branch '{}'",
            request.version.commit, request.source.branch
        )));
    }
    handler.checkout_version(&request.version.commit)?;

    let subject = handler.commit_subject(&request.version.commit)?;
    let name = lock_name_from_subject(&subject).ok_or_else(|| {
        PoolError::InputInvalid(format!(
            "version '{}' is not a pool state change: '{}'",
            request.version.commit, subject
        ))
    })?;

    // A removed lock has no payload left at its own version; downstream
    // still gets the name and an empty metadata file.
    let payload = handler.read_payload(&name)?.unwrap_or_default();

    fs::create_dir_all(destination).map_err(|e| {
        PoolError::InputInvalid(format!(
            "failed to create destination '{}': {}",
            destination.display(),
            e
        ))
    })?;
    write_file(&destination.join("name"), name.as_bytes())?;
    write_file(&destination.join("metadata"), &payload)?;

    Ok(OperationResponse {
        version: request.version,
        metadata: vec![
            MetadataPair::new("lock_name", name),
            MetadataPair::new("pool_name", request.source.pool),
        ],
    })
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    fs::write(path, contents).map_err(|e| {
        PoolError::InputInvalid(format!("failed to write '{}': {}", path.display(), e))
    })
}

/// `claiming: some-lock` -> `some-lock`, and likewise for the other
/// state-change subjects.
fn lock_name_from_subject(subject: &str) -> Option<String> {
    [CLAIM_PREFIX, UNCLAIM_PREFIX, ADD_PREFIX, REMOVE_PREFIX]
        .iter()
        .find_map(|prefix| subject.strip_prefix(prefix))
        .map(str::to_string)
}
