//! Persistent lock records and their store.
//!
//! This module owns the persisted side of WebDAV locking:
//! - `LockRecord`: one persisted lock (token, scope, owner, timeout, ...)
//! - `LockStore`: the access contract over records, keyed by storage id and
//!   internal path, plus the expiry predicate used by cleanup
//! - `FileLockStore`: a store keeping one JSON file per lock token
//! - `LockManager`: the cleanup entry point used by the scheduled job
//!
//! # Lock Files
//!
//! Lock files are stored in `.davlock/locks/`, one file per token. They are
//! created using **create_new** semantics (exclusive create), so a token can
//! never be inserted twice while its record exists.
//!
//! # Expiry
//!
//! A record is expired once `created_at + timeout < now`. Lookups do not
//! filter expired records; they are removed by the cleanup sweep.

mod guard;
mod manager;
mod record;
mod store;


use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

// Re-export public API
pub use guard::{GuardMetadata, PathGuard, guard_key};
pub(crate) use guard::owner_string;
pub use manager::LockManager;
pub use record::{LockRecord, LockScope, PERSISTED_DEPTH, ScopeError, format_remaining};
pub use store::{FileLockStore, LockStore, LockStoreError};

/// Escape a string into a single filesystem-safe file stem.
///
/// ASCII alphanumerics, `-` and `_` are kept; every other byte becomes `%XX`.
/// The mapping is injective, so distinct inputs never share a file.
pub(crate) fn escape_file_stem(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

/// A unique sibling name for moving `path` aside before deciding its fate.
pub(crate) fn aside_path(path: &Path, suffix: &str) -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(
        "{}.{}.{}.{}",
        file_name,
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::Relaxed),
        suffix
    ))
}
