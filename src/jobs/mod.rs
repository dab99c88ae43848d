//! Recurring background jobs.
//!
//! A scheduler only needs two things from a job: its interval in seconds and
//! a `run` entry point. `JobRunner` is the minimal scheduler used by the CLI;
//! any other scheduler can drive a `TimedJob` the same way.

mod cleanup;
mod runner;

#[cfg(test)]
mod tests;

pub use cleanup::{CleanupPersistentFileLocks, DEFAULT_INTERVAL_MINUTES};
pub use runner::{JobRunner, LoopSummary, TickReport};

use crate::locks::LockStoreError;
use serde_json::Value;
use thiserror::Error;

/// A failed job run, reported to the scheduler.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("job '{job}' failed: {source}")]
    Store {
        job: &'static str,
        #[source]
        source: LockStoreError,
    },
}

/// Lifecycle of a job instance between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Running,
}

/// A job the scheduler invokes on a fixed interval.
pub trait TimedJob: Send + Sync {
    /// Name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Seconds between two runs.
    fn interval(&self) -> u64;

    /// Do one unit of work. `argument` is scheduler-supplied and may be ignored.
    fn run(&self, argument: &Value) -> Result<(), JobError>;
}
