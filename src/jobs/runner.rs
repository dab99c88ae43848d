//! Interval-driven job runner.

use super::TimedJob;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

struct ScheduledJob {
    job: Arc<dyn TimedJob>,
    last_run: Option<i64>,
}

impl ScheduledJob {
    fn is_due(&self, now: i64) -> bool {
        match self.last_run {
            None => true,
            Some(last) => {
                now.saturating_sub(last) >= i64::try_from(self.job.interval()).unwrap_or(i64::MAX)
            }
        }
    }
}

/// Outcome of one scheduling pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Jobs that ran successfully.
    pub ran: Vec<&'static str>,
    /// Jobs that ran and failed, with the error message.
    pub failed: Vec<(&'static str, String)>,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        self.ran.is_empty() && self.failed.is_empty()
    }
}

/// Totals over a `run_loop`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub ticks: usize,
    pub runs: usize,
    pub failures: usize,
}

/// Runs registered jobs when their interval has elapsed.
///
/// Jobs run one after another on the calling thread, so a job never overlaps
/// itself under this runner.
#[derive(Default)]
pub struct JobRunner {
    jobs: Vec<ScheduledJob>,
}

impl JobRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job. It is due immediately.
    pub fn add(&mut self, job: Arc<dyn TimedJob>) {
        self.jobs.push(ScheduledJob { job, last_run: None });
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Run every job due at `now`.
    ///
    /// A failed run still counts as a run; the job is retried after its
    /// interval, not immediately.
    pub fn tick(&mut self, now: i64) -> TickReport {
        let mut report = TickReport::default();

        for scheduled in &mut self.jobs {
            if !scheduled.is_due(now) {
                continue;
            }

            scheduled.last_run = Some(now);
            let name = scheduled.job.name();
            match scheduled.job.run(&Value::Null) {
                Ok(()) => report.ran.push(name),
                Err(e) => {
                    warn!(job = name, error = %e, "job run failed");
                    report.failed.push((name, e.to_string()));
                }
            }
        }

        report
    }

    /// Tick every `poll` until `max_ticks` passes have been made (forever when `None`).
    pub fn run_loop(&mut self, poll: Duration, max_ticks: Option<usize>) -> LoopSummary {
        let mut summary = LoopSummary::default();
        info!(jobs = self.jobs.len(), poll_ms = poll.as_millis() as u64, "job runner started");

        loop {
            let report = self.tick(Utc::now().timestamp());
            summary.ticks += 1;
            summary.runs += report.ran.len() + report.failed.len();
            summary.failures += report.failed.len();

            if max_ticks.is_some_and(|max| summary.ticks >= max) {
                break;
            }

            thread::sleep(poll);
        }

        summary
    }
}
