//! The four user-visible pool operations.
//!
//! Each operation is one backend sequence handed to the retry engine:
//! re-align with the remote tip, stage the mutation locally, publish. The
//! published tip id is the operation's canonical version.

use crate::error::{PoolError, Result};
use crate::pool::handler::{Bucket, GitLockHandler, LockHandler};
use crate::pool::retry::Retrier;
use crate::protocol::{Source, Version};

/// Orchestrates pool operations against a backend.
pub struct LockPool<H> {
    handler: H,
    retrier: Retrier,
}

impl LockPool<GitLockHandler> {
    /// Pool client over a real git checkout of the source's branch.
    pub fn new(source: &Source) -> Self {
        Self::with_handler(GitLockHandler::new(source.clone()), Retrier::from_source(source))
    }
}

impl<H: LockHandler> LockPool<H> {
    pub fn with_handler(handler: H, retrier: Retrier) -> Self {
        Self { handler, retrier }
    }

    /// Claim one unclaimed lock, picked uniformly at random.
    ///
    /// An empty pool fails terminally with `NoLocksAvailable`; nothing is
    /// published. Losing the publish race re-runs the whole pick, so each
    /// attempt works from a fresh listing.
    pub fn acquire(&mut self) -> Result<(String, Version)> {
        self.handler.setup()?;
        self.retrier.run(&mut self.handler, |handler| {
            let mut names = handler.list_unclaimed()?;
            if names.is_empty() {
                return Err(PoolError::NoLocksAvailable);
            }

            // A uniform pick spreads contention across the pool instead of
            // stampeding the first name.
            let index = (rand::random::<u64>() % names.len() as u64) as usize;
            let name = names.swap_remove(index);

            handler.move_to_claimed(&name)?;
            let commit = handler.publish()?;
            Ok((name, Version::new(commit)))
        })
    }

    /// Return a claimed lock to the pool.
    pub fn release(&mut self, name: &str) -> Result<(String, Version)> {
        self.handler.setup()?;
        let version = self.retrier.run(&mut self.handler, |handler| {
            handler.move_to_unclaimed(name)?;
            Ok(Version::new(handler.publish()?))
        })?;
        Ok((name.to_string(), version))
    }

    /// Delete a claimed lock from the pool entirely.
    pub fn remove(&mut self, name: &str) -> Result<(String, Version)> {
        self.handler.setup()?;
        let version = self.retrier.run(&mut self.handler, |handler| {
            handler.remove_claimed(name)?;
            Ok(Version::new(handler.publish()?))
        })?;
        Ok((name.to_string(), version))
    }

    /// Register a new lock as available.
    pub fn add(&mut self, name: &str, payload: &[u8]) -> Result<(String, Version)> {
        self.add_to(name, payload, Bucket::Unclaimed)
    }

    /// Register a new lock that starts life already claimed.
    pub fn add_claimed(&mut self, name: &str, payload: &[u8]) -> Result<(String, Version)> {
        self.add_to(name, payload, Bucket::Claimed)
    }

    fn add_to(&mut self, name: &str, payload: &[u8], bucket: Bucket) -> Result<(String, Version)> {
        self.handler.setup()?;
        let version = self.retrier.run(&mut self.handler, |handler| {
            handler.add_lock(name, payload, bucket)?;
            Ok(Version::new(handler.publish()?))
        })?;
        Ok((name.to_string(), version))
    }
}
