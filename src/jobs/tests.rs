//! Tests for the cleanup job and the job runner.

use super::*;
use crate::locks::{
    FileLockStore, LockManager, LockRecord, LockScope, LockStore, LockStoreError, PERSISTED_DEPTH,
};
use chrono::Utc;
use serde_json::Value;
use std::io;
use std::sync::{Arc, Mutex, mpsc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

fn record(token: &str, created_at: i64, timeout: u64) -> LockRecord {
    LockRecord {
        token: token.to_string(),
        scope: LockScope::Shared,
        depth: PERSISTED_DEPTH,
        storage_id: "local::alice".to_string(),
        target_file: "a.txt".to_string(),
        owner_user_id: "alice".to_string(),
        owner: "Alice Wonder".to_string(),
        timeout,
        created_at,
    }
}

/// Store whose sweep can be switched to fail.
#[derive(Default)]
struct FlakyStore {
    offline: AtomicBool,
    sweeps: AtomicUsize,
}

impl LockStore for FlakyStore {
    fn find_locks(&self, _: &str, _: &str) -> Result<Vec<LockRecord>, LockStoreError> {
        Ok(Vec::new())
    }

    fn find_by_token(&self, _: &str) -> Result<Option<LockRecord>, LockStoreError> {
        Ok(None)
    }

    fn insert(&self, _: &LockRecord) -> Result<(), LockStoreError> {
        Ok(())
    }

    fn replace(&self, record: &LockRecord) -> Result<(), LockStoreError> {
        Err(LockStoreError::NotFound(record.token.clone()))
    }

    fn delete_by_token(&self, _: &str) -> Result<bool, LockStoreError> {
        Ok(false)
    }

    fn delete_expired(&self, _now: i64) -> Result<usize, LockStoreError> {
        self.sweeps.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(LockStoreError::Io {
                action: "read locks directory",
                path: "/offline".into(),
                source: io::Error::other("persistence unavailable"),
            });
        }
        Ok(0)
    }
}

/// Store whose sweep blocks until the test lets it finish.
struct GatedStore {
    entered: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl LockStore for GatedStore {
    fn find_locks(&self, _: &str, _: &str) -> Result<Vec<LockRecord>, LockStoreError> {
        Ok(Vec::new())
    }

    fn find_by_token(&self, _: &str) -> Result<Option<LockRecord>, LockStoreError> {
        Ok(None)
    }

    fn insert(&self, _: &LockRecord) -> Result<(), LockStoreError> {
        Ok(())
    }

    fn replace(&self, record: &LockRecord) -> Result<(), LockStoreError> {
        Err(LockStoreError::NotFound(record.token.clone()))
    }

    fn delete_by_token(&self, _: &str) -> Result<bool, LockStoreError> {
        Ok(false)
    }

    fn delete_expired(&self, _now: i64) -> Result<usize, LockStoreError> {
        let _ = self.entered.lock().unwrap().send(());
        let _ = self.release.lock().unwrap().recv();
        Ok(0)
    }
}

/// Job counting its runs.
struct CountingJob {
    interval: u64,
    runs: AtomicUsize,
    fail: bool,
}

impl CountingJob {
    fn new(interval: u64) -> Self {
        Self {
            interval,
            runs: AtomicUsize::new(0),
            fail: false,
        }
    }
}

impl TimedJob for CountingJob {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn interval(&self) -> u64 {
        self.interval
    }

    fn run(&self, _argument: &Value) -> Result<(), JobError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(JobError::Store {
                job: self.name(),
                source: LockStoreError::NotFound("x".to_string()),
            });
        }
        Ok(())
    }
}

// ============================================================================
// CleanupPersistentFileLocks
// ============================================================================

#[test]
fn test_cleanup_job_interval() {
    let manager = Arc::new(LockManager::new(Arc::new(FlakyStore::default())));

    assert_eq!(CleanupPersistentFileLocks::new(manager.clone()).interval(), 30 * 60);
    assert_eq!(
        CleanupPersistentFileLocks::with_interval_minutes(manager, 5).interval(),
        300
    );
}

#[test]
fn test_cleanup_job_removes_expired_locks() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(FileLockStore::new(temp_dir.path().join("locks")));
    let now = Utc::now().timestamp();
    store.insert(&record("expired", now - 3_600, 60)).unwrap();
    store.insert(&record("live", now, 3_600)).unwrap();
    let job = CleanupPersistentFileLocks::new(Arc::new(LockManager::new(store.clone())));

    job.run(&Value::Null).unwrap();
    job.run(&Value::Null).unwrap();

    assert!(store.find_by_token("expired").unwrap().is_none());
    assert!(store.find_by_token("live").unwrap().is_some());
    assert_eq!(job.state(), JobState::Idle);
}

#[test]
fn test_cleanup_job_failure_is_reported_and_recovers() {
    let store = Arc::new(FlakyStore::default());
    store.offline.store(true, Ordering::SeqCst);
    let job = CleanupPersistentFileLocks::new(Arc::new(LockManager::new(store.clone())));

    let err = job.run(&Value::Null).unwrap_err();
    assert!(err.to_string().contains("cleanup_persistent_file_locks"));
    assert!(err.to_string().contains("persistence unavailable"));
    assert_eq!(job.state(), JobState::Idle);

    store.offline.store(false, Ordering::SeqCst);
    assert!(job.run(&Value::Null).is_ok());
    assert_eq!(store.sweeps.load(Ordering::SeqCst), 2);
}

#[test]
fn test_cleanup_job_ignores_argument() {
    let store = Arc::new(FlakyStore::default());
    let job = CleanupPersistentFileLocks::new(Arc::new(LockManager::new(store.clone())));

    job.run(&serde_json::json!({"anything": [1, 2, 3]})).unwrap();

    assert_eq!(store.sweeps.load(Ordering::SeqCst), 1);
}

#[test]
fn test_cleanup_job_stays_running_until_last_overlapping_run_ends() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let store = Arc::new(GatedStore {
        entered: Mutex::new(entered_tx),
        release: Mutex::new(release_rx),
    });
    let job = Arc::new(CleanupPersistentFileLocks::new(Arc::new(LockManager::new(
        store,
    ))));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let job = Arc::clone(&job);
            std::thread::spawn(move || job.run(&Value::Null))
        })
        .collect();

    // Both runs are inside the sweep
    entered_rx.recv().unwrap();
    entered_rx.recv().unwrap();
    assert_eq!(job.state(), JobState::Running);

    // Let one finish; the other is still sweeping
    release_tx.send(()).unwrap();
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while !handles.iter().any(|h| h.is_finished()) && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(handles.iter().any(|h| h.is_finished()));
    assert_eq!(job.state(), JobState::Running);

    release_tx.send(()).unwrap();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }
    assert_eq!(job.state(), JobState::Idle);
}

// ============================================================================
// JobRunner
// ============================================================================

#[test]
fn test_runner_runs_jobs_when_due() {
    let job = Arc::new(CountingJob::new(100));
    let mut runner = JobRunner::new();
    runner.add(job.clone());
    assert_eq!(runner.len(), 1);

    assert_eq!(runner.tick(1_000).ran, vec!["counting"]);
    assert!(runner.tick(1_050).is_idle());
    assert!(runner.tick(1_099).is_idle());
    assert_eq!(runner.tick(1_100).ran, vec!["counting"]);

    assert_eq!(job.runs.load(Ordering::SeqCst), 2);
}

#[test]
fn test_runner_reports_failures_and_waits_interval() {
    let job = Arc::new(CountingJob {
        fail: true,
        ..CountingJob::new(60)
    });
    let mut runner = JobRunner::new();
    runner.add(job.clone());

    let report = runner.tick(0);
    assert!(report.ran.is_empty());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "counting");

    assert!(runner.tick(30).is_idle());
    assert_eq!(runner.tick(60).failed.len(), 1);
}

#[test]
fn test_runner_loop_stops_after_max_ticks() {
    let job = Arc::new(CountingJob::new(0));
    let mut runner = JobRunner::new();
    runner.add(job.clone());

    let summary = runner.run_loop(Duration::from_millis(1), Some(3));

    assert_eq!(summary.ticks, 3);
    assert_eq!(summary.runs, 3);
    assert_eq!(summary.failures, 0);
    assert_eq!(job.runs.load(Ordering::SeqCst), 3);
}

#[test]
fn test_empty_runner_is_idle() {
    let mut runner = JobRunner::new();

    assert!(runner.is_empty());
    assert!(runner.tick(0).is_idle());
}
