//! Tests for the CLI commands, run against temporary roots.

use super::cleanup::cmd_cleanup;
use super::init::cmd_init;
use super::lock::{build_lock_request, cmd_lock, cmd_locks, cmd_unlock, format_lock_line};
use crate::cli::{CleanupArgs, LockArgs, LocksArgs, UnlockArgs};
use crate::config::Config;
use crate::context::StoreContext;
use crate::dav::{LockDescriptor, Scope};
use crate::error::DavLockError;
use crate::events::{EventAction, read_events};
use crate::exit_codes;
use crate::locks::{FileLockStore, LockRecord, LockScope, LockStore};
use crate::test_support::{DirGuard, create_test_root};
use chrono::Utc;
use serial_test::serial;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const FILE: &str = "alice/locked-file.txt";

fn lock_args(path: &str, token: &str, scope: &str) -> LockArgs {
    LockArgs {
        path: path.to_string(),
        token: token.to_string(),
        scope: scope.to_string(),
        owner: None,
        timeout: None,
    }
}

fn unlock_args(path: &str, token: &str) -> UnlockArgs {
    UnlockArgs {
        path: path.to_string(),
        token: token.to_string(),
    }
}

fn cleanup_args(watch: bool) -> CleanupArgs {
    CleanupArgs {
        watch,
        interval_secs: None,
        iterations: Some(1),
        poll_ms: 0,
    }
}

fn store_for(root: &Path) -> FileLockStore {
    let ctx = StoreContext::resolve_from(root).unwrap();
    FileLockStore::new(ctx.locks_dir)
}

fn events_for(root: &Path) -> Vec<EventAction> {
    let ctx = StoreContext::resolve_from(root).unwrap();
    read_events(&ctx)
        .unwrap()
        .into_iter()
        .map(|event| event.action)
        .collect()
}

// ============================================================================
// init
// ============================================================================

#[test]
fn init_creates_state_layout_and_default_config() {
    let temp = TempDir::new().unwrap();
    cmd_init(Some(temp.path())).unwrap();

    let ctx = StoreContext::resolve_from(temp.path()).unwrap();
    assert!(ctx.locks_dir.is_dir());
    assert!(ctx.guards_dir.is_dir());
    assert!(ctx.events_dir().is_dir());

    let config = Config::load(ctx.config_path()).unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(events_for(temp.path()), vec![EventAction::Init]);
}

#[test]
fn init_is_idempotent_and_keeps_existing_config() {
    let temp = create_test_root();
    let ctx = StoreContext::resolve_from(temp.path()).unwrap();
    let before = fs::read_to_string(ctx.config_path()).unwrap();

    cmd_init(Some(temp.path())).unwrap();
    cmd_init(Some(temp.path())).unwrap();

    assert_eq!(fs::read_to_string(ctx.config_path()).unwrap(), before);
    let config = Config::load(ctx.config_path()).unwrap();
    assert!(config.mounts.contains_key("alice"));
}

#[test]
fn lock_commands_require_init() {
    let temp = TempDir::new().unwrap();
    let err = cmd_lock(Some(temp.path()), lock_args(FILE, "t1", "exclusive")).unwrap_err();

    assert!(matches!(err, DavLockError::UserError(_)));
    assert!(err.to_string().contains("davlock init"));
}

// ============================================================================
// lock / unlock / locks
// ============================================================================

#[test]
fn lock_persists_record_and_logs_event() {
    let temp = create_test_root();
    let mut args = lock_args(FILE, "t1", "exclusive");
    args.owner = Some("mailto:alice@example.com".to_string());
    args.timeout = Some(120);

    cmd_lock(Some(temp.path()), args).unwrap();

    let record = store_for(temp.path()).find_by_token("t1").unwrap().unwrap();
    assert_eq!(record.storage_id, "local::alice");
    assert_eq!(record.target_file, "locked-file.txt");
    assert_eq!(record.owner_user_id, "alice");
    assert_eq!(record.owner, "mailto:alice@example.com");
    assert_eq!(record.scope, LockScope::Exclusive);
    assert_eq!(record.depth, 0);
    assert_eq!(record.timeout, 120);
    assert_eq!(events_for(temp.path()), vec![EventAction::Lock]);
}

#[test]
fn conflicting_exclusive_lock_is_refused() {
    let temp = create_test_root();
    cmd_lock(Some(temp.path()), lock_args(FILE, "t1", "exclusive")).unwrap();

    let err = cmd_lock(Some(temp.path()), lock_args(FILE, "t2", "exclusive")).unwrap_err();
    assert!(matches!(err, DavLockError::LockRefused(_)));
    assert_eq!(err.exit_code(), exit_codes::LOCK_REFUSED);
    assert!(store_for(temp.path()).find_by_token("t2").unwrap().is_none());
}

#[test]
fn shared_locks_coexist() {
    let temp = create_test_root();
    cmd_lock(Some(temp.path()), lock_args(FILE, "s1", "shared")).unwrap();
    cmd_lock(Some(temp.path()), lock_args(FILE, "s2", "SHARED")).unwrap();

    let locks = store_for(temp.path())
        .find_locks("local::alice", "locked-file.txt")
        .unwrap();
    assert_eq!(locks.len(), 2);
}

#[test]
fn unknown_scope_is_a_user_error() {
    let temp = create_test_root();
    let err = cmd_lock(Some(temp.path()), lock_args(FILE, "t1", "owner")).unwrap_err();

    assert!(matches!(err, DavLockError::Scope(_)));
    assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
}

#[test]
fn zero_timeout_and_blank_token_are_rejected() {
    let mut args = lock_args(FILE, "t1", "exclusive");
    args.timeout = Some(0);
    assert!(matches!(
        build_lock_request(&args),
        Err(DavLockError::UserError(_))
    ));

    let args = lock_args(FILE, "  ", "exclusive");
    assert!(matches!(
        build_lock_request(&args),
        Err(DavLockError::UserError(_))
    ));
}

#[test]
fn build_lock_request_carries_owner_and_timeout() {
    let mut args = lock_args(FILE, "t1", "shared");
    args.owner = Some("bob".to_string());
    args.timeout = Some(30);

    let request = build_lock_request(&args).unwrap();
    assert_eq!(
        request,
        LockDescriptor::new("t1", Scope::Shared)
            .with_owner("bob")
            .with_timeout(30)
    );
}

#[test]
fn lock_on_unresolvable_targets_is_refused() {
    let temp = create_test_root();

    for path in ["bob/locked-file.txt", "alice/missing.txt", "alice/docs", "alice"] {
        let err = cmd_lock(Some(temp.path()), lock_args(path, "t1", "exclusive")).unwrap_err();
        assert!(
            matches!(err, DavLockError::LockRefused(_)),
            "expected refusal for {}",
            path
        );
    }
    assert!(events_for(temp.path()).is_empty());
}

#[test]
fn lock_on_mount_without_persistent_locking_is_refused() {
    let temp = create_test_root();
    let ctx = StoreContext::resolve_from(temp.path()).unwrap();
    let mut config = Config::load(ctx.config_path()).unwrap();
    if let Some(mount) = config.mounts.get_mut("alice") {
        mount.persistent_locking = false;
    }
    fs::write(ctx.config_path(), config.to_yaml().unwrap()).unwrap();

    let err = cmd_lock(Some(temp.path()), lock_args(FILE, "t1", "exclusive")).unwrap_err();
    assert!(matches!(err, DavLockError::LockRefused(_)));
}

#[test]
fn unlock_releases_matching_token_only() {
    let temp = create_test_root();
    cmd_lock(Some(temp.path()), lock_args(FILE, "t1", "exclusive")).unwrap();

    let err = cmd_unlock(Some(temp.path()), unlock_args(FILE, "other")).unwrap_err();
    assert!(matches!(err, DavLockError::LockRefused(_)));

    cmd_unlock(Some(temp.path()), unlock_args(FILE, "t1")).unwrap();
    assert!(store_for(temp.path()).find_by_token("t1").unwrap().is_none());
    assert_eq!(
        events_for(temp.path()),
        vec![EventAction::Lock, EventAction::Unlock]
    );

    // The file is free again.
    cmd_lock(Some(temp.path()), lock_args(FILE, "t2", "exclusive")).unwrap();
}

#[test]
fn locks_listing_succeeds_with_and_without_locks() {
    let temp = create_test_root();
    let args = || LocksArgs {
        path: FILE.to_string(),
        depth: 0,
    };

    cmd_locks(Some(temp.path()), args()).unwrap();
    cmd_lock(Some(temp.path()), lock_args(FILE, "t1", "exclusive")).unwrap();
    cmd_locks(Some(temp.path()), args()).unwrap();

    // Unresolvable paths list nothing rather than failing.
    cmd_locks(
        Some(temp.path()),
        LocksArgs {
            path: "nobody/file.txt".to_string(),
            depth: -1,
        },
    )
    .unwrap();
}

#[test]
fn format_lock_line_shows_remaining_time() {
    let mut lock = LockDescriptor::new("t1", Scope::Exclusive).with_timeout(600);
    lock.created = Some(1_000);
    lock.uri = "files/alice/locked-file.txt".to_string();

    let line = format_lock_line(&lock, 1_000 + 300);
    assert!(line.contains("t1"));
    assert!(line.contains("exclusive"));
    assert!(line.contains("owner=-"));
    assert!(line.contains("remaining=5m"));
    assert!(line.contains("uri=files/alice/locked-file.txt"));

    let expired = format_lock_line(&lock, 1_000 + 601);
    assert!(expired.contains("remaining=expired"));
}

#[test]
#[serial]
fn commands_default_to_current_directory() {
    let temp = create_test_root();
    let _guard = DirGuard::new(temp.path());

    cmd_lock(None, lock_args(FILE, "t1", "exclusive")).unwrap();
    assert!(store_for(temp.path()).find_by_token("t1").unwrap().is_some());
}

// ============================================================================
// cleanup
// ============================================================================

fn expired_record(token: &str) -> LockRecord {
    LockRecord {
        token: token.to_string(),
        scope: LockScope::Exclusive,
        depth: 0,
        storage_id: "local::alice".to_string(),
        target_file: "locked-file.txt".to_string(),
        owner_user_id: "alice".to_string(),
        owner: String::new(),
        timeout: 10,
        created_at: Utc::now().timestamp() - 3_600,
    }
}

#[test]
fn cleanup_removes_only_expired_locks() {
    let temp = create_test_root();
    let store = store_for(temp.path());
    store.insert(&expired_record("old")).unwrap();
    cmd_lock(Some(temp.path()), lock_args(FILE, "live", "shared")).unwrap();

    cmd_cleanup(Some(temp.path()), cleanup_args(false)).unwrap();

    assert!(store.find_by_token("old").unwrap().is_none());
    assert!(store.find_by_token("live").unwrap().is_some());
    assert_eq!(
        events_for(temp.path()),
        vec![EventAction::Lock, EventAction::Cleanup]
    );
}

#[test]
fn expired_lock_is_listed_until_swept() {
    let temp = create_test_root();
    let store = store_for(temp.path());
    store.insert(&expired_record("old")).unwrap();

    let found = store.find_locks("local::alice", "locked-file.txt").unwrap();
    assert_eq!(found.len(), 1);

    cmd_cleanup(Some(temp.path()), cleanup_args(false)).unwrap();
    let found = store.find_locks("local::alice", "locked-file.txt").unwrap();
    assert!(found.is_empty());
}

#[test]
fn cleanup_watch_runs_job_on_first_tick() {
    let temp = create_test_root();
    let store = store_for(temp.path());
    store.insert(&expired_record("old")).unwrap();

    let mut args = cleanup_args(true);
    args.interval_secs = Some(3_600);
    cmd_cleanup(Some(temp.path()), args).unwrap();

    assert!(store.find_by_token("old").unwrap().is_none());
    let ctx = StoreContext::resolve_from(temp.path()).unwrap();
    let events = read_events(&ctx).unwrap();
    let last = events.last().unwrap();
    assert_eq!(last.action, EventAction::Cleanup);
    assert_eq!(last.details["watch"], true);
    assert_eq!(last.details["runs"], 1);
}

#[test]
fn cleanup_watch_rejects_zero_interval() {
    let temp = create_test_root();
    let mut args = cleanup_args(true);
    args.interval_secs = Some(0);

    let err = cmd_cleanup(Some(temp.path()), args).unwrap_err();
    assert!(matches!(err, DavLockError::UserError(_)));
}
