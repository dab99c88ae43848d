//! Audit log of lock operations.
//!
//! Events are appended in NDJSON format (one JSON object per line) to
//! `.davlock/events/events.ndjson`. The CLI writes one event per successful
//! `init`, `lock`, `unlock` and `cleanup`.
//!
//! # Event Format
//!
//! - `ts`: RFC3339 timestamp
//! - `action`: init, lock, unlock or cleanup
//! - `actor`: the process owner (`user@HOST`)
//! - `path`: the protocol path, for lock and unlock
//! - `details`: action-specific object
//!
//! ```no_run
//! use davlock::context::StoreContext;
//! use davlock::events::{Event, EventAction, append_event};
//! use serde_json::json;
//!
//! let ctx = StoreContext::resolve()?;
//! let event = Event::new(EventAction::Cleanup).with_details(json!({"removed": 3}));
//! append_event(&ctx, &event)?;
//! # Ok::<(), davlock::error::DavLockError>(())
//! ```

use crate::context::StoreContext;
use crate::error::{DavLockError, Result};
use crate::locks::owner_string;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;

/// Actions that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    Init,
    Lock,
    Unlock,
    Cleanup,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventAction::Init => write!(f, "init"),
            EventAction::Lock => write!(f, "lock"),
            EventAction::Unlock => write!(f, "unlock"),
            EventAction::Cleanup => write!(f, "cleanup"),
        }
    }
}

/// An event record for the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub ts: DateTime<Utc>,

    pub action: EventAction,

    /// Process owner (`user@HOST`).
    pub actor: String,

    /// Protocol path the action targeted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Freeform details object with action-specific information.
    pub details: Value,
}

impl Event {
    /// Create a new event stamped with the current time and actor.
    pub fn new(action: EventAction) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: owner_string(),
            path: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            DavLockError::UserError(format!("failed to serialize event to JSON: {}", e))
        })
    }
}

/// Append an event to the events log, creating the file if needed.
pub fn append_event(ctx: &StoreContext, event: &Event) -> Result<()> {
    let events_file = ctx.events_file();
    let json_line = event.to_ndjson_line()?;

    let events_dir = ctx.events_dir();
    if !events_dir.exists() {
        fs::create_dir_all(&events_dir).map_err(|e| {
            DavLockError::UserError(format!(
                "failed to create events directory '{}': {}",
                events_dir.display(),
                e
            ))
        })?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&events_file)
        .map_err(|e| {
            DavLockError::UserError(format!(
                "failed to open events file '{}': {}",
                events_file.display(),
                e
            ))
        })?;

    writeln!(file, "{}", json_line).map_err(|e| {
        DavLockError::UserError(format!(
            "failed to write event to '{}': {}",
            events_file.display(),
            e
        ))
    })?;

    Ok(())
}

/// Read every event in the log, oldest first.
pub fn read_events(ctx: &StoreContext) -> Result<Vec<Event>> {
    let events_file = ctx.events_file();
    let content = match fs::read_to_string(&events_file) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(DavLockError::UserError(format!(
                "failed to read events file '{}': {}",
                events_file.display(),
                e
            )));
        }
    };

    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line).map_err(|e| {
                DavLockError::UserError(format!("failed to parse event line: {}", e))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_context() -> (TempDir, StoreContext) {
        let temp_dir = TempDir::new().unwrap();
        let ctx = StoreContext::resolve_from(temp_dir.path()).unwrap();
        (temp_dir, ctx)
    }

    #[test]
    fn test_event_creation() {
        let event = Event::new(EventAction::Lock).with_path("alice/a.txt");

        assert_eq!(event.action, EventAction::Lock);
        assert!(event.actor.contains('@'));
        assert_eq!(event.path.as_deref(), Some("alice/a.txt"));
        assert!(Utc::now().signed_duration_since(event.ts).num_minutes() < 1);
    }

    #[test]
    fn test_event_is_single_snake_case_line() {
        let line = Event::new(EventAction::Cleanup)
            .with_details(json!({"removed": 2}))
            .to_ndjson_line()
            .unwrap();

        assert!(!line.contains('\n'));
        assert!(line.contains("\"cleanup\""));
        // No path for cleanup events
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert!(parsed.get("path").is_none());
        assert_eq!(parsed["details"]["removed"], 2);
    }

    #[test]
    fn test_append_event_creates_dir_and_appends_lines() {
        let (_temp_dir, ctx) = create_test_context();
        assert!(!ctx.events_dir().exists());

        append_event(&ctx, &Event::new(EventAction::Init)).unwrap();
        append_event(
            &ctx,
            &Event::new(EventAction::Unlock)
                .with_path("alice/a.txt")
                .with_details(json!({"token": "t1"})),
        )
        .unwrap();

        let content = fs::read_to_string(ctx.events_file()).unwrap();
        assert!(content.ends_with('\n'));

        let events = read_events(&ctx).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, EventAction::Init);
        assert_eq!(events[1].action, EventAction::Unlock);
        assert_eq!(events[1].details["token"], "t1");
    }

    #[test]
    fn test_read_events_without_log_is_empty() {
        let (_temp_dir, ctx) = create_test_context();

        assert!(read_events(&ctx).unwrap().is_empty());
    }

    #[test]
    fn test_event_action_display() {
        assert_eq!(EventAction::Init.to_string(), "init");
        assert_eq!(EventAction::Lock.to_string(), "lock");
        assert_eq!(EventAction::Unlock.to_string(), "unlock");
        assert_eq!(EventAction::Cleanup.to_string(), "cleanup");
    }
}
