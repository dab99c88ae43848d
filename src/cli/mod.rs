//! CLI argument parsing for davlock.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Davlock: persistent WebDAV locks stored alongside file storage mounts.
///
/// Locks live under `<root>/.davlock/` so that every invocation against the
/// same root sees the same lock state.
#[derive(Parser, Debug)]
#[command(name = "davlock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Root directory holding the `.davlock/` state (default: current directory).
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Increase diagnostic output (repeatable). `DAVLOCK_LOG` overrides this.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for davlock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize lock state under the root.
    ///
    /// Creates the state, locks, guards and events directories and a
    /// default `config.yaml`. Safe to run repeatedly.
    Init,

    /// Request a persistent lock on a file.
    Lock(LockArgs),

    /// Release a persistent lock on a file.
    Unlock(UnlockArgs),

    /// List the locks recorded for a file.
    Locks(LocksArgs),

    /// Sweep expired locks, once or on the cleanup job interval.
    Cleanup(CleanupArgs),
}

/// Arguments for the `lock` command.
#[derive(Args, Debug)]
pub struct LockArgs {
    /// Protocol path `<mount>/<path inside mount>`.
    pub path: String,

    /// Lock token identifying this lock.
    #[arg(long)]
    pub token: String,

    /// Lock scope: `exclusive` or `shared`.
    #[arg(long, default_value = "exclusive")]
    pub scope: String,

    /// Free-form owner description stored with the lock.
    #[arg(long)]
    pub owner: Option<String>,

    /// Lock lifetime in seconds (default from config).
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Arguments for the `unlock` command.
#[derive(Args, Debug)]
pub struct UnlockArgs {
    /// Protocol path `<mount>/<path inside mount>`.
    pub path: String,

    /// Token of the lock to release.
    #[arg(long)]
    pub token: String,
}

/// Arguments for the `locks` command.
#[derive(Args, Debug)]
pub struct LocksArgs {
    /// Protocol path `<mount>/<path inside mount>`.
    pub path: String,

    /// Requested discovery depth. Accepted for protocol parity; only the
    /// file itself is inspected.
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub depth: i32,
}

/// Arguments for the `cleanup` command.
#[derive(Args, Debug)]
pub struct CleanupArgs {
    /// Keep running the cleanup job on its interval.
    #[arg(long)]
    pub watch: bool,

    /// Override the job interval in seconds (default from config).
    #[arg(long)]
    pub interval_secs: Option<u64>,

    /// Stop after this many runner ticks (watch mode only).
    #[arg(long)]
    pub iterations: Option<usize>,

    /// How often the runner checks whether the job is due, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    pub poll_ms: u64,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
