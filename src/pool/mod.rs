//! The lock-pool core.
//!
//! Layering, leaves first: `handler` turns pool mutations into operations
//! on a scratch checkout; `retry` re-runs mutation sequences that lose the
//! publish race; `operations` composes the user-visible operations; and
//! `poller` walks history for new claims.

pub mod handler;
pub mod operations;
pub mod poller;
pub mod retry;

pub use handler::{
    ADD_PREFIX, Bucket, CLAIM_PREFIX, GitLockHandler, LockHandler, REMOVE_PREFIX, UNCLAIM_PREFIX,
};
pub use operations::LockPool;
pub use poller::Poller;
pub use retry::Retrier;
