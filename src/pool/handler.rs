//! Backend operations on a scratch checkout of the pool branch.
//!
//! `LockHandler` is the seam between the orchestration layer and git: the
//! retry engine and the operations above it only ever speak through this
//! trait, which keeps the acquisition state machine testable with scripted
//! handlers. `GitLockHandler` is the real implementation, owning a fresh
//! clone in a temp directory for the duration of one invocation.

use crate::error::{PoolError, Result};
use crate::git::{GitOutput, run_git, run_git_unchecked};
use crate::protocol::Source;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};

/// Commit subject prefix for a claim.
pub const CLAIM_PREFIX: &str = "claiming: ";
/// Commit subject prefix for a release.
pub const UNCLAIM_PREFIX: &str = "unclaiming: ";
/// Commit subject prefix for a newly registered lock.
pub const ADD_PREFIX: &str = "adding: ";
/// Commit subject prefix for a deleted lock.
pub const REMOVE_PREFIX: &str = "removing: ";

/// The two directories a lock can live in.
///
/// A lock's bucket is its state: `<pool>/unclaimed/<name>` is free,
/// `<pool>/claimed/<name>` is held. All path construction goes through
/// this enum so the two names exist in exactly one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Unclaimed,
    Claimed,
}

impl Bucket {
    /// Directory name of this bucket.
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Unclaimed => "unclaimed",
            Bucket::Claimed => "claimed",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend operations every pool mutation is built from.
///
/// Mutating operations stage a local commit; nothing is visible to other
/// clients until `publish` advances the remote branch. `publish` is the
/// compare-and-swap point: it either lands the staged change or reports a
/// conflict for the retry layer to absorb.
pub trait LockHandler {
    /// Materialise a working copy of the pool branch.
    fn setup(&mut self) -> Result<()>;

    /// Hard-align the working copy with the remote tip. Idempotent; also
    /// discards whatever a failed attempt staged.
    fn reset(&mut self) -> Result<()>;

    /// Lock names under `<pool>/unclaimed/`, dot-files excluded. Order is
    /// unspecified.
    fn list_unclaimed(&self) -> Result<Vec<String>>;

    /// Stage `claiming: <name>`.
    fn move_to_claimed(&mut self, name: &str) -> Result<()>;

    /// Stage `unclaiming: <name>`.
    fn move_to_unclaimed(&mut self, name: &str) -> Result<()>;

    /// Stage `removing: <name>`.
    fn remove_claimed(&mut self, name: &str) -> Result<()>;

    /// Stage `adding: <name>` with the given payload into a bucket.
    fn add_lock(&mut self, name: &str, payload: &[u8], bucket: Bucket) -> Result<()>;

    /// Attempt to advance the remote branch to the local tip. Returns the
    /// new tip id on acceptance.
    fn publish(&mut self) -> Result<String>;
}

/// `LockHandler` over a real git checkout in a scratch directory.
pub struct GitLockHandler {
    source: Source,
    checkout: Option<TempDir>,
    // Keeps the key material alive for the lifetime of the checkout.
    _key_file: Option<NamedTempFile>,
}

impl GitLockHandler {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            checkout: None,
            _key_file: None,
        }
    }

    fn dir(&self) -> Result<&Path> {
        self.checkout
            .as_ref()
            .map(|scratch| scratch.path())
            .ok_or_else(|| PoolError::SetupFailed("working copy has not been set up".to_string()))
    }

    fn git(&self, args: &[&str]) -> Result<GitOutput> {
        run_git(self.dir()?, args)
    }

    fn bucket_dir(&self, bucket: Bucket) -> Result<PathBuf> {
        Ok(self.dir()?.join(&self.source.pool).join(bucket.as_str()))
    }

    fn lock_path(&self, bucket: Bucket, name: &str) -> Result<PathBuf> {
        Ok(self.bucket_dir(bucket)?.join(name))
    }

    /// Repository-relative path of a lock file, for git pathspecs.
    fn lock_spec(&self, bucket: Bucket, name: &str) -> String {
        format!("{}/{}/{}", self.source.pool, bucket.as_str(), name)
    }

    fn require_lock(&self, bucket: Bucket, name: &str) -> Result<()> {
        if self.lock_path(bucket, name)?.is_file() {
            Ok(())
        } else {
            Err(PoolError::LockMissing {
                name: name.to_string(),
                bucket,
            })
        }
    }

    fn ensure_bucket_dir(&self, bucket: Bucket) -> Result<PathBuf> {
        let dir = self.bucket_dir(bucket)?;
        fs::create_dir_all(&dir).map_err(|e| {
            PoolError::GitFailed(format!(
                "failed to create bucket directory '{}': {}",
                dir.display(),
                e
            ))
        })?;
        Ok(dir)
    }

    fn commit(&self, message: &str) -> Result<()> {
        self.git(&["commit", "-m", message])?;
        Ok(())
    }

    fn move_lock(&self, name: &str, from: Bucket, to: Bucket, message: &str) -> Result<()> {
        self.require_lock(from, name)?;
        self.ensure_bucket_dir(to)?;

        let from_spec = self.lock_spec(from, name);
        let to_spec = self.lock_spec(to, name);
        self.git(&["mv", &from_spec, &to_spec])?;
        self.commit(message)
    }

    /// Whether `id` names a commit in the cloned history.
    pub fn resolves(&self, id: &str) -> Result<bool> {
        let spec = format!("{id}^{{commit}}");
        let (_, status) = run_git_unchecked(self.dir()?, &["cat-file", "-e", &spec])?;
        Ok(status.success())
    }

    /// Detach the working copy at a specific version.
    pub fn checkout_version(&self, id: &str) -> Result<()> {
        self.git(&["checkout", "--quiet", id])?;
        Ok(())
    }

    /// Subject line of a commit.
    pub fn commit_subject(&self, id: &str) -> Result<String> {
        Ok(self.git(&["log", "-1", "--format=%s", id])?.stdout)
    }

    /// Newest version id, optionally restricted to a sub-path.
    pub fn latest_version(&self, paths: Option<&str>) -> Result<Option<String>> {
        let mut args = vec!["rev-list", "-1", "HEAD"];
        if let Some(paths) = paths {
            args.push("--");
            args.push(paths);
        }

        let output = self.git(&args)?;
        if output.stdout.is_empty() {
            Ok(None)
        } else {
            Ok(Some(output.stdout))
        }
    }

    /// Claim events after `prev` (exclusive) up to the tip, oldest first,
    /// optionally restricted to a sub-path.
    pub fn claims_since(&self, prev: &str, paths: Option<&str>) -> Result<Vec<String>> {
        let range = format!("{prev}..HEAD");
        let mut args = vec!["log", "--reverse", "--format=%H%x09%s", &range];
        if let Some(paths) = paths {
            args.push("--");
            args.push(paths);
        }

        let output = self.git(&args)?;
        let mut ids = Vec::new();
        for line in output.lines() {
            if let Some((id, subject)) = line.split_once('\t')
                && subject.starts_with(CLAIM_PREFIX)
            {
                ids.push(id.to_string());
            }
        }
        Ok(ids)
    }

    /// Read a lock's payload from the working copy, claimed bucket first.
    /// Returns `None` when the lock exists in neither bucket.
    pub fn read_payload(&self, name: &str) -> Result<Option<Vec<u8>>> {
        for bucket in [Bucket::Claimed, Bucket::Unclaimed] {
            let path = self.lock_path(bucket, name)?;
            if path.is_file() {
                let bytes = fs::read(&path).map_err(|e| {
                    PoolError::GitFailed(format!(
                        "failed to read lock '{}': {}",
                        path.display(),
                        e
                    ))
                })?;
                return Ok(Some(bytes));
            }
        }
        Ok(None)
    }

    fn write_key_file(key: &str) -> Result<NamedTempFile> {
        let file = NamedTempFile::new().map_err(|e| {
            PoolError::SetupFailed(format!("failed to create key file: {e}"))
        })?;

        // ssh refuses key files without a trailing newline.
        let mut material = key.to_string();
        if !material.ends_with('\n') {
            material.push('\n');
        }
        fs::write(file.path(), material).map_err(|e| {
            PoolError::SetupFailed(format!("failed to write key file: {e}"))
        })?;

        Ok(file)
    }
}

impl LockHandler for GitLockHandler {
    fn setup(&mut self) -> Result<()> {
        let scratch = TempDir::new().map_err(|e| {
            PoolError::SetupFailed(format!("failed to create scratch directory: {e}"))
        })?;

        let key_file = match &self.source.private_key {
            Some(key) => Some(Self::write_key_file(key)?),
            None => None,
        };
        let ssh_command = key_file.as_ref().map(|file| {
            format!(
                "ssh -i {} -o StrictHostKeyChecking=no",
                file.path().display()
            )
        });

        let mut args: Vec<&str> = Vec::new();
        let ssh_config;
        if let Some(command) = &ssh_command {
            ssh_config = format!("core.sshCommand={command}");
            args.extend(["-c", ssh_config.as_str()]);
        }
        args.extend([
            "clone",
            "--branch",
            &self.source.branch,
            "--single-branch",
            &self.source.uri,
            ".",
        ]);

        run_git(scratch.path(), &args).map_err(|e| PoolError::SetupFailed(e.to_string()))?;

        if let Some(command) = &ssh_command {
            run_git(scratch.path(), &["config", "core.sshCommand", command])
                .map_err(|e| PoolError::SetupFailed(e.to_string()))?;
        }

        let host = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "localhost".to_string());
        run_git(scratch.path(), &["config", "user.name", "lockpool"])
            .map_err(|e| PoolError::SetupFailed(e.to_string()))?;
        run_git(
            scratch.path(),
            &["config", "user.email", &format!("lockpool@{host}")],
        )
        .map_err(|e| PoolError::SetupFailed(e.to_string()))?;

        self.checkout = Some(scratch);
        self._key_file = key_file;
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        let upstream = format!("origin/{}", self.source.branch);
        self.git(&["fetch", "origin", &self.source.branch])
            .map_err(|e| PoolError::ResetFailed(e.to_string()))?;
        self.git(&["reset", "--hard", &upstream])
            .map_err(|e| PoolError::ResetFailed(e.to_string()))?;
        Ok(())
    }

    fn list_unclaimed(&self) -> Result<Vec<String>> {
        let dir = self.bucket_dir(Bucket::Unclaimed)?;
        if !dir.is_dir() {
            // A pool without an unclaimed bucket reads as empty, not broken.
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&dir).map_err(|e| {
            PoolError::GitFailed(format!("failed to read bucket '{}': {}", dir.display(), e))
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                PoolError::GitFailed(format!("failed to read bucket '{}': {}", dir.display(), e))
            })?;
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with('.') {
                names.push(name);
            }
        }
        Ok(names)
    }

    fn move_to_claimed(&mut self, name: &str) -> Result<()> {
        self.move_lock(
            name,
            Bucket::Unclaimed,
            Bucket::Claimed,
            &format!("{CLAIM_PREFIX}{name}"),
        )
    }

    fn move_to_unclaimed(&mut self, name: &str) -> Result<()> {
        self.move_lock(
            name,
            Bucket::Claimed,
            Bucket::Unclaimed,
            &format!("{UNCLAIM_PREFIX}{name}"),
        )
    }

    fn remove_claimed(&mut self, name: &str) -> Result<()> {
        self.require_lock(Bucket::Claimed, name)?;
        let spec = self.lock_spec(Bucket::Claimed, name);
        self.git(&["rm", "--quiet", &spec])?;
        self.commit(&format!("{REMOVE_PREFIX}{name}"))
    }

    fn add_lock(&mut self, name: &str, payload: &[u8], bucket: Bucket) -> Result<()> {
        self.ensure_bucket_dir(bucket)?;

        let path = self.lock_path(bucket, name)?;
        fs::write(&path, payload).map_err(|e| {
            PoolError::GitFailed(format!("failed to write lock '{}': {}", path.display(), e))
        })?;

        let spec = self.lock_spec(bucket, name);
        self.git(&["add", "--", &spec])?;
        // Commit only this path. A lock that already exists with identical
        // payload surfaces here as an empty commit, which the retry layer
        // above absorbs.
        self.git(&["commit", "-m", &format!("{ADD_PREFIX}{name}"), "--", &spec])?;
        Ok(())
    }

    fn publish(&mut self) -> Result<String> {
        let refspec = format!("HEAD:{}", self.source.branch);
        let (output, status) = run_git_unchecked(self.dir()?, &["push", "origin", &refspec])?;
        let combined = output.combined();

        // Three remote signals collapse to the same verdict: somebody else
        // moved the pool first. The up-to-date case covers a concurrent
        // client publishing an identical-looking change in the same second.
        const CONFLICT_SIGNALS: [&str; 3] =
            ["Everything up-to-date", "[rejected]", "[remote rejected]"];
        if CONFLICT_SIGNALS.iter().any(|signal| combined.contains(signal)) {
            return Err(PoolError::Conflict);
        }
        if !status.success() {
            return Err(PoolError::PublishFailed(combined));
        }

        let head = self
            .git(&["rev-parse", "HEAD"])
            .map_err(|e| PoolError::PublishFailed(e.to_string()))?;
        Ok(head.stdout)
    }
}
