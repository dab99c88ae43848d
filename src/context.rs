//! State directory resolution for davlock.
//!
//! Every command locates lock state through this module so that all
//! invocations against the same root share one lock store:
//!
//! ```text
//! <root>/.davlock/
//!   config.yaml
//!   locks/      one file per lock token
//!   guards/     per-path acquisition guards
//!   events/     events.ndjson audit log
//! ```

use crate::error::{DavLockError, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Default state directory name within the root.
pub const DEFAULT_STATE_DIR: &str = ".davlock";

/// Resolved paths for a davlock root. All paths are absolute.
#[derive(Debug, Clone)]
pub struct StoreContext {
    /// Root directory; relative mount roots resolve against it.
    pub root: PathBuf,

    /// `{root}/.davlock/`
    pub state_dir: PathBuf,

    /// `{root}/.davlock/locks/`
    pub locks_dir: PathBuf,

    /// `{root}/.davlock/guards/`
    pub guards_dir: PathBuf,
}

impl StoreContext {
    /// Resolve the context from the current working directory.
    pub fn resolve() -> Result<Self> {
        let cwd = env::current_dir().map_err(|e| {
            DavLockError::UserError(format!("failed to get current working directory: {}", e))
        })?;

        Self::resolve_from(&cwd)
    }

    /// Resolve the context for a specific root directory.
    pub fn resolve_from<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = std::path::absolute(root.as_ref()).map_err(|e| {
            DavLockError::UserError(format!(
                "failed to resolve root '{}': {}",
                root.as_ref().display(),
                e
            ))
        })?;

        let state_dir = root.join(DEFAULT_STATE_DIR);
        let locks_dir = state_dir.join("locks");
        let guards_dir = state_dir.join("guards");

        Ok(Self {
            root,
            state_dir,
            locks_dir,
            guards_dir,
        })
    }

    /// Check whether the state directory exists.
    pub fn state_exists(&self) -> bool {
        self.state_dir.is_dir()
    }

    /// Fail with an actionable message when `init` has not been run.
    pub fn ensure_initialized(&self) -> Result<()> {
        if !self.state_exists() {
            return Err(DavLockError::UserError(format!(
                "davlock is not initialized in '{}'.\n\nRun `davlock init` first.",
                self.root.display()
            )));
        }
        Ok(())
    }

    /// Get the path to the config file.
    pub fn config_path(&self) -> PathBuf {
        self.state_dir.join("config.yaml")
    }

    /// Get the path to the events directory.
    pub fn events_dir(&self) -> PathBuf {
        self.state_dir.join("events")
    }

    /// Get the path to the main events log file.
    pub fn events_file(&self) -> PathBuf {
        self.events_dir().join("events.ndjson")
    }
}

/// Resolve the context for `root` (or the cwd) and require initialization.
pub fn require_initialized(root: Option<&Path>) -> Result<StoreContext> {
    let ctx = resolve_context(root)?;
    ctx.ensure_initialized()?;
    Ok(ctx)
}

/// Resolve the context for `root` (or the cwd) without requiring initialization.
pub fn resolve_context(root: Option<&Path>) -> Result<StoreContext> {
    match root {
        Some(root) => StoreContext::resolve_from(root),
        None => StoreContext::resolve(),
    }
}
