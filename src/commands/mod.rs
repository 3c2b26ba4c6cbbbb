//! Command implementations for lockpool.
//!
//! The dispatcher reads the JSON request from stdin, routes to the
//! command, and prints the JSON response on stdout. Command functions are
//! plain request-to-response so tests can drive them directly.

use crate::cli::Command;
use crate::error::{PoolError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io;

mod check;
mod fetch;
mod put;

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Check => {
            let versions = check::run(read_request()?)?;
            write_response(&versions)
        }
        Command::In(args) => {
            let response = fetch::run(read_request()?, &args.destination)?;
            write_response(&response)
        }
        Command::Out(args) => {
            let response = put::run(read_request()?, &args.sources)?;
            write_response(&response)
        }
    }
}

fn read_request<T: DeserializeOwned>() -> Result<T> {
    serde_json::from_reader(io::stdin())
        .map_err(|e| PoolError::InputInvalid(format!("malformed request on stdin: {e}")))
}

fn write_response<T: Serialize>(response: &T) -> Result<()> {
    let body = serde_json::to_string(response)
        .map_err(|e| PoolError::InputInvalid(format!("failed to encode response: {e}")))?;
    println!("{body}");
    Ok(())
}
