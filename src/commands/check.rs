//! The `check` command: report new claim events on the pool branch.

use crate::error::Result;
use crate::pool::Poller;
use crate::protocol::{CheckRequest, Version};

pub fn run(request: CheckRequest) -> Result<Vec<Version>> {
    Poller::new(&request.source).check(request.version.as_ref())
}
