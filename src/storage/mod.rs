//! Storage backends and the persistent-locking capability.
//!
//! A storage may or may not support persistent locks. Eligibility is decided
//! by two independent predicates:
//! 1. `Storage::as_persistent_locking` - does the storage implement
//!    `PersistentLockingStorage` at all (the type-level check)
//! 2. `PersistentLockingStorage::supports_persistent_locking` - is it actually
//!    backed by the capability right now (a wrapper may say no)
//!
//! `persistent_locking` composes both.

mod local;


pub use local::{LocalStorage, LockSettings};

use crate::locks::{LockRecord, LockScope, LockStoreError};

/// Attributes passed to a persistent lock acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockAttributes {
    pub token: String,
    pub scope: LockScope,
    pub depth: u32,
    pub owner: String,
    /// Requested lifetime in seconds; the storage default applies when absent.
    pub timeout: Option<u64>,
}

/// Attributes passed to a persistent lock release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockAttributes {
    pub token: String,
}

/// A file storage backend.
pub trait Storage: Send + Sync {
    /// Unique id of this storage.
    fn id(&self) -> &str;

    /// The persistent-locking view of this storage, if it implements one.
    fn as_persistent_locking(&self) -> Option<&dyn PersistentLockingStorage> {
        None
    }
}

/// Storage-side persistent locking.
///
/// Implementations are responsible for atomic acquisition: two racing
/// exclusive requests on the same internal path must not both succeed.
pub trait PersistentLockingStorage: Storage {
    /// Whether this instance is actually backed by persistent locking.
    fn supports_persistent_locking(&self) -> bool;

    /// All persisted locks on `internal_path`.
    fn get_locks(&self, internal_path: &str) -> Result<Vec<LockRecord>, LockStoreError>;

    /// Acquire (or refresh) a lock. `Ok(false)` means the lock was refused.
    fn lock_node_persistent(
        &self,
        internal_path: &str,
        attrs: &LockAttributes,
    ) -> Result<bool, LockStoreError>;

    /// Release a lock. `Ok(false)` means no such lock was held on the path.
    fn unlock_node_persistent(
        &self,
        internal_path: &str,
        attrs: &UnlockAttributes,
    ) -> Result<bool, LockStoreError>;
}

/// Return the storage's locking view only if both capability predicates hold.
pub fn persistent_locking(storage: &dyn Storage) -> Option<&dyn PersistentLockingStorage> {
    storage
        .as_persistent_locking()
        .filter(|locking| locking.supports_persistent_locking())
}
