use crate::error::{PoolError, Result};
use crate::pool::{Bucket, LockHandler};
use crate::protocol::Source;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

pub(crate) const TEST_BRANCH: &str = "main";

/// Run git in `repo_dir`, panicking on failure, returning trimmed stdout.
pub(crate) fn git(repo_dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .current_dir(repo_dir)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to execute git {}: {}", args.join(" "), e));

    if !output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!(
            "git {} failed (exit code {:?})\nstdout:\n{}\nstderr:\n{}",
            args.join(" "),
            output.status.code(),
            stdout,
            stderr
        );
    }

    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A source pointing nowhere, for tests that never touch a repository.
pub(crate) fn test_source() -> Source {
    Source {
        uri: "some-uri".to_string(),
        branch: "some-branch".to_string(),
        pool: "my-pool".to_string(),
        private_key: None,
        retry_delay: None,
        paths: None,
    }
}

/// A bare repository standing in for the shared remote, seeded with a pool
/// layout. Work clones are created on demand for seeding and inspection.
pub(crate) struct PoolRemote {
    // Owns every path handed out below; dropped with the remote.
    _dir: TempDir,
    bare: PathBuf,
}

/// Seed a remote whose pool holds the given unclaimed and claimed locks.
/// Both bucket directories always exist, each pinned by a `.gitkeep`.
pub(crate) fn init_pool_remote(
    pool: &str,
    unclaimed: &[(&str, &str)],
    claimed: &[(&str, &str)],
) -> PoolRemote {
    let dir = TempDir::new().unwrap();
    let bare = dir.path().join("origin.git");
    git(
        dir.path(),
        &[
            "init",
            "--bare",
            "--initial-branch",
            TEST_BRANCH,
            "origin.git",
        ],
    );

    let seed = dir.path().join("seed");
    std::fs::create_dir(&seed).unwrap();
    git(&seed, &["init", "--initial-branch", TEST_BRANCH]);
    git(&seed, &["config", "user.name", "Test User"]);
    git(&seed, &["config", "user.email", "test@example.com"]);
    git(&seed, &["remote", "add", "origin", bare.to_str().unwrap()]);

    for bucket in [Bucket::Unclaimed, Bucket::Claimed] {
        let bucket_dir = seed.join(pool).join(bucket.as_str());
        std::fs::create_dir_all(&bucket_dir).unwrap();
        std::fs::write(bucket_dir.join(".gitkeep"), "").unwrap();
    }
    for (name, payload) in unclaimed {
        std::fs::write(
            seed.join(pool).join("unclaimed").join(name),
            payload.as_bytes(),
        )
        .unwrap();
    }
    for (name, payload) in claimed {
        std::fs::write(
            seed.join(pool).join("claimed").join(name),
            payload.as_bytes(),
        )
        .unwrap();
    }

    git(&seed, &["add", "."]);
    git(&seed, &["commit", "-m", "initial pool"]);
    git(&seed, &["push", "origin", TEST_BRANCH]);

    PoolRemote { _dir: dir, bare }
}

impl PoolRemote {
    pub(crate) fn bare_path(&self) -> &Path {
        &self.bare
    }

    pub(crate) fn uri(&self) -> String {
        self.bare.to_string_lossy().to_string()
    }

    /// Source block pointing at this remote.
    pub(crate) fn source(&self, pool: &str) -> Source {
        Source {
            uri: self.uri(),
            branch: TEST_BRANCH.to_string(),
            pool: pool.to_string(),
            private_key: None,
            retry_delay: Some(0.0),
            paths: None,
        }
    }

    /// Current tip of the coordinating branch.
    pub(crate) fn tip(&self) -> String {
        git(&self.bare, &["rev-parse", TEST_BRANCH])
    }

    /// Subject line of the current tip.
    pub(crate) fn tip_subject(&self) -> String {
        git(&self.bare, &["log", "-1", "--format=%s", TEST_BRANCH])
    }

    /// All commit ids on the branch, newest first.
    pub(crate) fn history(&self) -> Vec<String> {
        git(&self.bare, &["rev-list", TEST_BRANCH])
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Fresh clone of the remote for inspecting published state.
    pub(crate) fn clone_to(&self) -> TempDir {
        let checkout = TempDir::new().unwrap();
        git(
            checkout.path(),
            &["clone", "--branch", TEST_BRANCH, &self.uri(), "."],
        );
        checkout
    }

    /// Publish one commit writing `contents` to `path`, returning its id.
    pub(crate) fn commit_file(&self, path: &str, contents: &str, message: &str) -> String {
        let work = self.clone_to();
        let file: PathBuf = work.path().join(path);
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(&file, contents).unwrap();
        git(work.path(), &["config", "user.name", "Test User"]);
        git(work.path(), &["config", "user.email", "test@example.com"]);
        git(work.path(), &["add", "."]);
        git(work.path(), &["commit", "-m", message]);
        git(work.path(), &["push", "origin", TEST_BRANCH]);
        git(work.path(), &["rev-parse", "HEAD"])
    }

    /// Replace the branch with a single fresh commit, as a force push
    /// would. Returns the new tip id.
    pub(crate) fn force_rewrite(&self, message: &str) -> String {
        let work = self.clone_to();
        git(work.path(), &["config", "user.name", "Test User"]);
        git(work.path(), &["config", "user.email", "test@example.com"]);
        git(work.path(), &["checkout", "--orphan", "rewrite"]);
        std::fs::write(work.path().join("README"), "rewritten\n").unwrap();
        git(work.path(), &["add", "."]);
        git(work.path(), &["commit", "-m", message]);
        git(
            work.path(),
            &["push", "--force", "origin", &format!("HEAD:{TEST_BRANCH}")],
        );
        git(work.path(), &["rev-parse", "HEAD"])
    }
}

/// A `LockHandler` whose behaviour is scripted per call, in the spirit of
/// the generated fakes the state-machine tests were originally written
/// against. Buckets are plain vectors; `reset` restores them to their
/// seeded state the way a hard reset restores a working copy.
#[derive(Default)]
pub(crate) struct ScriptedHandler {
    pub unclaimed: Vec<String>,
    pub claimed: Vec<String>,
    initial_unclaimed: Vec<String>,
    initial_claimed: Vec<String>,

    pub setup_failure: Option<PoolError>,
    pub reset_failures: VecDeque<PoolError>,
    pub move_failures: VecDeque<PoolError>,
    pub add_failures: VecDeque<PoolError>,
    pub publish_outcomes: VecDeque<Result<String>>,

    pub setup_calls: usize,
    pub reset_calls: usize,
    pub claim_moves: Vec<String>,
    pub unclaim_moves: Vec<String>,
    pub removals: Vec<String>,
    pub additions: Vec<(String, Vec<u8>, Bucket)>,
    pub publish_calls: usize,
}

impl ScriptedHandler {
    pub(crate) fn with_pool(unclaimed: &[&str], claimed: &[&str]) -> Self {
        let unclaimed: Vec<String> = unclaimed.iter().map(|s| s.to_string()).collect();
        let claimed: Vec<String> = claimed.iter().map(|s| s.to_string()).collect();
        Self {
            initial_unclaimed: unclaimed.clone(),
            initial_claimed: claimed.clone(),
            unclaimed,
            claimed,
            ..Self::default()
        }
    }
}

impl LockHandler for ScriptedHandler {
    fn setup(&mut self) -> Result<()> {
        self.setup_calls += 1;
        match self.setup_failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn reset(&mut self) -> Result<()> {
        self.reset_calls += 1;
        if let Some(err) = self.reset_failures.pop_front() {
            return Err(err);
        }
        self.unclaimed = self.initial_unclaimed.clone();
        self.claimed = self.initial_claimed.clone();
        Ok(())
    }

    fn list_unclaimed(&self) -> Result<Vec<String>> {
        Ok(self.unclaimed.clone())
    }

    fn move_to_claimed(&mut self, name: &str) -> Result<()> {
        self.claim_moves.push(name.to_string());
        if let Some(err) = self.move_failures.pop_front() {
            return Err(err);
        }
        match self.unclaimed.iter().position(|n| n == name) {
            Some(index) => {
                let name = self.unclaimed.remove(index);
                self.claimed.push(name);
                Ok(())
            }
            None => Err(PoolError::LockMissing {
                name: name.to_string(),
                bucket: Bucket::Unclaimed,
            }),
        }
    }

    fn move_to_unclaimed(&mut self, name: &str) -> Result<()> {
        self.unclaim_moves.push(name.to_string());
        if let Some(err) = self.move_failures.pop_front() {
            return Err(err);
        }
        match self.claimed.iter().position(|n| n == name) {
            Some(index) => {
                let name = self.claimed.remove(index);
                self.unclaimed.push(name);
                Ok(())
            }
            None => Err(PoolError::LockMissing {
                name: name.to_string(),
                bucket: Bucket::Claimed,
            }),
        }
    }

    fn remove_claimed(&mut self, name: &str) -> Result<()> {
        self.removals.push(name.to_string());
        if let Some(err) = self.move_failures.pop_front() {
            return Err(err);
        }
        match self.claimed.iter().position(|n| n == name) {
            Some(index) => {
                self.claimed.remove(index);
                Ok(())
            }
            None => Err(PoolError::LockMissing {
                name: name.to_string(),
                bucket: Bucket::Claimed,
            }),
        }
    }

    fn add_lock(&mut self, name: &str, payload: &[u8], bucket: Bucket) -> Result<()> {
        self.additions
            .push((name.to_string(), payload.to_vec(), bucket));
        if let Some(err) = self.add_failures.pop_front() {
            return Err(err);
        }
        match bucket {
            Bucket::Unclaimed => self.unclaimed.push(name.to_string()),
            Bucket::Claimed => self.claimed.push(name.to_string()),
        }
        Ok(())
    }

    fn publish(&mut self) -> Result<String> {
        self.publish_calls += 1;
        match self.publish_outcomes.pop_front() {
            Some(outcome) => outcome,
            None => Ok(format!("ref-{}", self.publish_calls)),
        }
    }
}
