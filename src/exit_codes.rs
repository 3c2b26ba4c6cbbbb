//! Exit code constants for the lockpool CLI.
//!
//! - 0: Success
//! - 1: Invalid input (malformed request, bad lock name, missing files)
//! - 2: No locks available to claim
//! - 3: Git or transport failure
//! - 4: Lock missing from the bucket an operation expected

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// Invalid input: malformed stdin request, bad lock name, or missing
/// name/metadata files in the caller's directory.
pub const INPUT_ERROR: i32 = 1;

/// Acquire found nothing to claim. Distinguishable so callers can tell an
/// exhausted pool apart from a broken one.
pub const NO_LOCKS: i32 = 2;

/// Git or transport failure: clone, fetch, reset, or publish errors.
pub const GIT_FAILURE: i32 = 3;

/// A lock was not present in the bucket an operation expected.
pub const LOCK_MISSING: i32 = 4;
