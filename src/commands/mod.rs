//! Command implementations for davlock.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, plus the shared setup every lock command needs.

mod cleanup;
mod init;
mod lock;

#[cfg(test)]
mod tests;

use crate::cli::Command;
use crate::config::Config;
use crate::context::{StoreContext, require_initialized};
use crate::dav::{FileLocksBackend, MountTree};
use crate::error::Result;
use crate::locks::{FileLockStore, LockStore};
use std::path::Path;
use std::sync::Arc;

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command, root: Option<&Path>) -> Result<()> {
    match command {
        Command::Init => init::cmd_init(root),
        Command::Lock(args) => lock::cmd_lock(root, args),
        Command::Unlock(args) => lock::cmd_unlock(root, args),
        Command::Locks(args) => lock::cmd_locks(root, args),
        Command::Cleanup(args) => cleanup::cmd_cleanup(root, args),
    }
}

/// Everything a lock command works against: one store shared by every mount.
pub(crate) struct Session {
    pub ctx: StoreContext,
    pub config: Config,
    pub store: Arc<dyn LockStore>,
    pub backend: FileLocksBackend,
}

impl Session {
    pub(crate) fn open(root: Option<&Path>) -> Result<Self> {
        let ctx = require_initialized(root)?;
        let config = load_config(&ctx)?;
        let store: Arc<dyn LockStore> = Arc::new(
            FileLockStore::new(ctx.locks_dir.clone())
                .with_guards(ctx.guards_dir.clone(), config.guard_stale_seconds),
        );
        let tree = MountTree::from_config(&config, &ctx, Arc::clone(&store));
        let backend = FileLocksBackend::new(Arc::new(tree));

        Ok(Self {
            ctx,
            config,
            store,
            backend,
        })
    }
}

/// Load the config file, falling back to defaults when it does not exist.
fn load_config(ctx: &StoreContext) -> Result<Config> {
    let path = ctx.config_path();
    if path.exists() {
        Config::load(path)
    } else {
        Ok(Config::default())
    }
}
