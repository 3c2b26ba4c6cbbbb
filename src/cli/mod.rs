//! CLI argument parsing for lockpool.
//!
//! Uses clap derive macros for declarative argument definitions. The three
//! entry points follow the resource-protocol convention: a JSON request on
//! stdin, one JSON response on stdout, diagnostics on stderr.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Lockpool: distributed mutual-exclusion pool coordinated through a git
/// repository.
///
/// Locks are files on a branch of a shared repository:
/// - `<pool>/unclaimed/<name>` is a free lock
/// - `<pool>/claimed/<name>` is a held lock
/// - the branch head is the authoritative pool state
#[derive(Parser, Debug)]
#[command(name = "lockpool")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for lockpool.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List new claim events on the pool branch.
    ///
    /// Reads `{ source, version? }` on stdin and prints the versions since
    /// `version` that claimed a lock, oldest first.
    Check,

    /// Materialise the lock a version refers to into a directory.
    ///
    /// Reads `{ source, version }` on stdin and writes the lock's `name`
    /// and `metadata` files into the destination for downstream steps.
    In(InArgs),

    /// Run a pool mutation: acquire, release, remove, add, or add_claimed.
    ///
    /// Reads `{ source, params }` on stdin; directories named in params
    /// are resolved relative to the sources directory.
    Out(OutArgs),
}

/// Arguments for the `in` command.
#[derive(Parser, Debug)]
pub struct InArgs {
    /// Directory the lock's name and metadata files are written into.
    pub destination: PathBuf,
}

/// Arguments for the `out` command.
#[derive(Parser, Debug)]
pub struct OutArgs {
    /// Directory the request's relative paths are resolved against.
    pub sources: PathBuf,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
