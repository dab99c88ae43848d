//! Implementation of the `davlock cleanup` command.
//!
//! Without `--watch` a single sweep removes every expired lock and exits.
//! With `--watch` the cleanup job is registered with a `JobRunner` and run
//! each time its interval elapses, until `--iterations` ticks have passed
//! or the process is stopped.

use super::Session;
use crate::cli::CleanupArgs;
use crate::error::{DavLockError, Result};
use crate::events::{Event, EventAction, append_event};
use crate::jobs::{CleanupPersistentFileLocks, JobRunner};
use crate::locks::LockManager;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub fn cmd_cleanup(root: Option<&Path>, args: CleanupArgs) -> Result<()> {
    let session = Session::open(root)?;
    let manager = Arc::new(LockManager::new(Arc::clone(&session.store)));

    if !args.watch {
        let removed = manager.cleanup()?;
        append_event(
            &session.ctx,
            &Event::new(EventAction::Cleanup).with_details(json!({ "removed": removed })),
        )?;
        println!("Removed {} expired lock(s).", removed);
        return Ok(());
    }

    let interval = match args.interval_secs {
        Some(0) => {
            return Err(DavLockError::UserError(
                "--interval-secs must be greater than 0".to_string(),
            ));
        }
        Some(seconds) => seconds,
        None => session.config.cleanup_interval_seconds(),
    };

    let job = CleanupPersistentFileLocks::with_interval_seconds(manager, interval);
    let mut runner = JobRunner::new();
    runner.add(Arc::new(job));

    eprintln!("davlock cleanup started");
    eprintln!("  state:    {}", session.ctx.state_dir.display());
    eprintln!("  interval: {}s", interval);
    eprintln!("  poll:     {}ms", args.poll_ms);

    let summary = runner.run_loop(Duration::from_millis(args.poll_ms), args.iterations);

    append_event(
        &session.ctx,
        &Event::new(EventAction::Cleanup).with_details(json!({
            "watch": true,
            "ticks": summary.ticks,
            "runs": summary.runs,
            "failures": summary.failures,
        })),
    )?;

    println!(
        "Cleanup job stopped after {} tick(s): {} run(s), {} failure(s).",
        summary.ticks, summary.runs, summary.failures
    );
    Ok(())
}
