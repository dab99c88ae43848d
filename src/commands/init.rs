//! Implementation of the `davlock init` command.
//!
//! Creates `.davlock/` with its `locks/`, `guards/` and `events/`
//! directories and writes a default `config.yaml` if none exists. Running it
//! again leaves existing state and config untouched.

use crate::config::Config;
use crate::context::{StoreContext, resolve_context};
use crate::error::{DavLockError, Result};
use crate::events::{Event, EventAction, append_event};
use crate::fs::atomic_write;
use serde_json::json;
use std::fs;
use std::path::Path;

/// Execute the `davlock init` command.
pub fn cmd_init(root: Option<&Path>) -> Result<()> {
    let ctx = resolve_context(root)?;
    let already_initialized = ctx.state_exists();

    create_state_dirs(&ctx)?;
    let config_created = write_default_config(&ctx)?;

    append_event(
        &ctx,
        &Event::new(EventAction::Init).with_details(json!({
            "config_created": config_created,
            "reinit": already_initialized,
        })),
    )?;

    if already_initialized {
        println!("davlock already initialized; state directories verified.");
    } else {
        println!("Initialized davlock.");
    }
    println!();
    println!("State directory: {}", ctx.state_dir.display());
    println!("  locks/   {}", ctx.locks_dir.display());
    println!("  guards/  {}", ctx.guards_dir.display());
    println!("  events/  {}", ctx.events_dir().display());
    if config_created {
        println!();
        println!(
            "Add mounts to {} to start locking files.",
            ctx.config_path().display()
        );
    }

    Ok(())
}

fn create_state_dirs(ctx: &StoreContext) -> Result<()> {
    for dir in [
        ctx.state_dir.clone(),
        ctx.locks_dir.clone(),
        ctx.guards_dir.clone(),
        ctx.events_dir(),
    ] {
        fs::create_dir_all(&dir).map_err(|e| {
            DavLockError::UserError(format!(
                "failed to create directory '{}': {}",
                dir.display(),
                e
            ))
        })?;
    }
    Ok(())
}

/// Write the default config; returns whether a new file was created.
fn write_default_config(ctx: &StoreContext) -> Result<bool> {
    let path = ctx.config_path();
    if path.exists() {
        return Ok(false);
    }

    let yaml = Config::default().to_yaml()?;
    atomic_write(&path, yaml.as_bytes()).map_err(|e| {
        DavLockError::UserError(format!(
            "failed to write config file '{}': {}",
            path.display(),
            e
        ))
    })?;
    Ok(true)
}
