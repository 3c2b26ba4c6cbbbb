//! Optimistic-concurrency retry around backend operation sequences.
//!
//! Publishing is a compare-and-swap against the remote branch head. When an
//! attempt loses the race it is discarded and re-run from fresh state:
//! sleep, hard-align the working copy with the remote tip, run the whole
//! sequence again. There is no attempt bound; a caller that wants a
//! deadline imposes it from outside the process.

use crate::error::{Result, RetryClass};
use crate::pool::handler::LockHandler;
use crate::protocol::Source;
use std::thread;
use std::time::Duration;

/// Pause between attempts when the source does not configure one.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Re-runs backend operation sequences until one publishes cleanly.
#[derive(Debug, Clone)]
pub struct Retrier {
    delay: Duration,
}

impl Retrier {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Retrier with the source's `retry_delay`, or the default.
    pub fn from_source(source: &Source) -> Self {
        let delay = source
            .retry_delay
            .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
            .map(Duration::from_secs_f64)
            .unwrap_or(DEFAULT_RETRY_DELAY);
        Self::new(delay)
    }

    /// Invoke `attempt` until it succeeds or fails terminally.
    ///
    /// Expected conflicts retry silently. Unexpected errors retry with one
    /// diagnostic per attempt so repeated failures stay visible. Between
    /// attempts the working copy is re-aligned with the remote tip, which
    /// also discards whatever the failed attempt staged. A failing
    /// recovery reset is logged; the stale attempt that follows loses the
    /// publish race and comes back around for another reset.
    pub fn run<H, T, F>(&self, handler: &mut H, mut attempt: F) -> Result<T>
    where
        H: LockHandler,
        F: FnMut(&mut H) -> Result<T>,
    {
        loop {
            match attempt(handler) {
                Ok(value) => return Ok(value),
                Err(err) => match err.retry_class() {
                    RetryClass::Expected => {}
                    RetryClass::Unexpected => eprintln!("retrying after error: {err}"),
                    RetryClass::Terminal => return Err(err),
                },
            }

            thread::sleep(self.delay);
            if let Err(err) = handler.reset() {
                eprintln!("retrying after error: {err}");
            }
        }
    }
}
