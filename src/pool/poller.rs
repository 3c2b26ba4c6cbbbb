//! Poll the coordinating branch for new claim events.
//!
//! Downstream consumers watch the pool for locks entering the claimed
//! state. Only `claiming:` versions signal that; releases, additions, and
//! removals create no new claimable state for a consumer to react to.

use crate::error::Result;
use crate::pool::handler::{GitLockHandler, LockHandler};
use crate::protocol::{Source, Version};

/// Lists the versions since a known point that represent new claims.
pub struct Poller {
    handler: GitLockHandler,
    paths: Option<String>,
}

impl Poller {
    pub fn new(source: &Source) -> Self {
        Self {
            paths: source.paths.clone(),
            handler: GitLockHandler::new(source.clone()),
        }
    }

    /// Claim versions after `version` (exclusive), oldest first.
    ///
    /// When `version` is absent, or names a commit this branch has never
    /// seen, the walk collapses to the newest version of the
    /// (path-filtered) history on its own, unfiltered by subject: the
    /// caller has no watermark, so it gets the current state to start
    /// from.
    pub fn check(&mut self, version: Option<&Version>) -> Result<Vec<Version>> {
        self.handler.setup()?;
        // Upstream history may have been rewritten since the version we
        // were handed; hard-align with origin before walking.
        self.handler.reset()?;

        let paths = self.paths.as_deref();

        if let Some(version) = version
            && self.handler.resolves(&version.commit)?
        {
            let ids = self.handler.claims_since(&version.commit, paths)?;
            return Ok(ids.into_iter().map(Version::new).collect());
        }

        Ok(self
            .handler
            .latest_version(paths)?
            .map(Version::new)
            .into_iter()
            .collect())
    }
}
