//! Lockpool: distributed mutual-exclusion pool coordinated through git.
//!
//! This is the main entry point for the `lockpool` CLI. It parses
//! arguments, dispatches to the appropriate command handler, and handles
//! errors with proper exit codes. Responses go to stdout; every diagnostic
//! goes to stderr so the protocol stream stays clean.

mod cli;
mod commands;
pub mod error;
pub mod exit_codes;
pub mod git;
pub mod pool;
pub mod protocol;
#[cfg(test)]
mod test_support;

use cli::Cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    match commands::dispatch(cli.command) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            // Return appropriate exit code
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
