//! Implementation of `davlock lock`, `davlock unlock` and `davlock locks`.
//!
//! All three go through the lock-request adapter, so a path that does not
//! resolve, a mount without persistent locking and a storage failure all
//! surface the same way: a refused request or an empty listing.

use super::Session;
use crate::cli::{LockArgs, LocksArgs, UnlockArgs};
use crate::dav::{LockDescriptor, Scope};
use crate::error::{DavLockError, Result};
use crate::events::{Event, EventAction, append_event};
use crate::locks::format_remaining;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::path::Path;

pub fn cmd_lock(root: Option<&Path>, args: LockArgs) -> Result<()> {
    let session = Session::open(root)?;
    let request = build_lock_request(&args)?;

    if !session.backend.lock(&args.path, &request) {
        return Err(DavLockError::LockRefused(format!(
            "'{}' could not be locked with token '{}' (already locked, not lockable, or busy)",
            args.path, args.token
        )));
    }

    append_event(
        &session.ctx,
        &Event::new(EventAction::Lock)
            .with_path(args.path.clone())
            .with_details(json!({
                "token": request.token,
                "scope": request.scope.as_str(),
                "timeout": request.timeout,
            })),
    )?;

    println!(
        "Locked '{}' ({}, token {}).",
        args.path, request.scope, request.token
    );
    Ok(())
}

pub fn cmd_unlock(root: Option<&Path>, args: UnlockArgs) -> Result<()> {
    let session = Session::open(root)?;
    // Only the token is consulted on release.
    let request = LockDescriptor::new(args.token.clone(), Scope::Exclusive);

    if !session.backend.unlock(&args.path, &request) {
        return Err(DavLockError::LockRefused(format!(
            "no lock with token '{}' was released on '{}'",
            args.token, args.path
        )));
    }

    append_event(
        &session.ctx,
        &Event::new(EventAction::Unlock)
            .with_path(args.path.clone())
            .with_details(json!({ "token": args.token })),
    )?;

    println!("Unlocked '{}' (token {}).", args.path, args.token);
    Ok(())
}

pub fn cmd_locks(root: Option<&Path>, args: LocksArgs) -> Result<()> {
    let session = Session::open(root)?;
    let locks = session.backend.get_locks(&args.path, args.depth);

    if locks.is_empty() {
        println!("No locks on '{}'.", args.path);
        return Ok(());
    }

    let now = Utc::now().timestamp();
    println!("Locks on '{}':", args.path);
    for lock in &locks {
        println!("{}", format_lock_line(lock, now));
    }

    Ok(())
}

/// Turn CLI arguments into a protocol lock request.
pub(crate) fn build_lock_request(args: &LockArgs) -> Result<LockDescriptor> {
    if args.token.trim().is_empty() {
        return Err(DavLockError::UserError(
            "lock token must not be empty".to_string(),
        ));
    }

    let scope: Scope = args.scope.parse()?;
    let mut request = LockDescriptor::new(args.token.clone(), scope);

    if let Some(owner) = &args.owner {
        request = request.with_owner(owner.clone());
    }
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err(DavLockError::UserError(
                "lock timeout must be greater than 0 seconds".to_string(),
            ));
        }
        request = request.with_timeout(timeout);
    }

    Ok(request)
}

/// One listing line: token, scope, owner, creation time and time left.
pub(crate) fn format_lock_line(lock: &LockDescriptor, now: i64) -> String {
    let created = lock
        .created
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| "-".to_string());

    let remaining = match (lock.created, lock.timeout) {
        (Some(created), Some(timeout)) => {
            let expires = created.saturating_add(i64::try_from(timeout).unwrap_or(i64::MAX));
            format_remaining(expires.saturating_sub(now))
        }
        _ => "-".to_string(),
    };

    let owner = match lock.owner.as_deref() {
        Some(owner) if !owner.is_empty() => owner,
        _ => "-",
    };

    format!(
        "  {}  {:<9}  owner={}  created={}  remaining={}  uri={}",
        lock.token,
        lock.scope.as_str(),
        owner,
        created,
        remaining,
        lock.uri
    )
}
