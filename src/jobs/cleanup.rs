//! Periodic removal of expired persistent locks.

use super::{JobError, JobState, TimedJob};
use crate::locks::LockManager;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

/// Default interval in minutes.
pub const DEFAULT_INTERVAL_MINUTES: u64 = 30;

/// Deletes expired persistent locks each time it runs.
///
/// Runs are independent: a failed sweep leaves remaining expired rows for
/// the next run.
pub struct CleanupPersistentFileLocks {
    manager: Arc<LockManager>,
    interval: u64,
    /// Runs in progress.
    active: AtomicUsize,
}

impl CleanupPersistentFileLocks {
    pub fn new(manager: Arc<LockManager>) -> Self {
        Self::with_interval_minutes(manager, DEFAULT_INTERVAL_MINUTES)
    }

    pub fn with_interval_minutes(manager: Arc<LockManager>, minutes: u64) -> Self {
        Self::with_interval_seconds(manager, minutes.saturating_mul(60))
    }

    pub fn with_interval_seconds(manager: Arc<LockManager>, seconds: u64) -> Self {
        Self {
            manager,
            interval: seconds,
            active: AtomicUsize::new(0),
        }
    }

    pub fn state(&self) -> JobState {
        if self.active.load(Ordering::SeqCst) > 0 {
            JobState::Running
        } else {
            JobState::Idle
        }
    }
}

/// Counts one run as active until it ends, successful or not.
struct ActiveRun<'a>(&'a AtomicUsize);

impl<'a> ActiveRun<'a> {
    fn enter(active: &'a AtomicUsize) -> (Self, usize) {
        let before = active.fetch_add(1, Ordering::SeqCst);
        (Self(active), before)
    }
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl TimedJob for CleanupPersistentFileLocks {
    fn name(&self) -> &'static str {
        "cleanup_persistent_file_locks"
    }

    fn interval(&self) -> u64 {
        self.interval
    }

    fn run(&self, _argument: &Value) -> Result<(), JobError> {
        let (_run, overlapping) = ActiveRun::enter(&self.active);
        if overlapping > 0 {
            // The sweep is idempotent, so overlapping runs are allowed
            debug!(job = self.name(), overlapping, "run overlaps a run in progress");
        }

        match self.manager.cleanup() {
            Ok(removed) => {
                debug!(job = self.name(), removed, "cleanup run finished");
                Ok(())
            }
            Err(source) => {
                warn!(job = self.name(), error = %source, "cleanup run failed");
                Err(JobError::Store {
                    job: self.name(),
                    source,
                })
            }
        }
    }
}
