//! Local storage backend with persistent locking.

use super::{LockAttributes, PersistentLockingStorage, Storage, UnlockAttributes};
use crate::locks::{
    LockRecord, LockScope, LockStore, LockStoreError, PERSISTED_DEPTH, PathGuard, guard_key,
};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Lock tuning shared by local storages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockSettings {
    /// Lifetime applied when a request carries no timeout.
    pub default_timeout_seconds: u64,
    /// Age after which an abandoned acquisition guard is broken.
    pub guard_stale_seconds: u64,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            default_timeout_seconds: 1800,
            guard_stale_seconds: 30,
        }
    }
}

/// A storage mounted from a local directory, owned by one user.
pub struct LocalStorage {
    id: String,
    owner_user_id: String,
    persistent_locking: bool,
    store: Arc<dyn LockStore>,
    guards_dir: PathBuf,
    settings: LockSettings,
}

impl LocalStorage {
    pub fn new(
        id: impl Into<String>,
        owner_user_id: impl Into<String>,
        store: Arc<dyn LockStore>,
        guards_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: id.into(),
            owner_user_id: owner_user_id.into(),
            persistent_locking: true,
            store,
            guards_dir: guards_dir.into(),
            settings: LockSettings::default(),
        }
    }

    /// Enable or disable persistent locking on this mount.
    pub fn with_persistent_locking(mut self, enabled: bool) -> Self {
        self.persistent_locking = enabled;
        self
    }

    pub fn with_settings(mut self, settings: LockSettings) -> Self {
        self.settings = settings;
        self
    }

    /// User owning this storage.
    pub fn owner_user_id(&self) -> &str {
        &self.owner_user_id
    }

    /// Take the guard serializing every lock change on `internal_path`.
    fn guard(&self, internal_path: &str) -> Result<Option<PathGuard>, LockStoreError> {
        PathGuard::try_acquire(
            &self.guards_dir,
            &guard_key(&self.id, internal_path),
            self.settings.guard_stale_seconds,
        )
        .map_err(|e| LockStoreError::io("acquire guard", &self.guards_dir, e))
    }

    fn conflicts(requested: LockScope, live: &[&LockRecord]) -> bool {
        match requested {
            LockScope::Exclusive => !live.is_empty(),
            LockScope::Shared => live.iter().any(|r| r.scope == LockScope::Exclusive),
        }
    }
}

impl Storage for LocalStorage {
    fn id(&self) -> &str {
        &self.id
    }

    fn as_persistent_locking(&self) -> Option<&dyn PersistentLockingStorage> {
        Some(self)
    }
}

impl PersistentLockingStorage for LocalStorage {
    fn supports_persistent_locking(&self) -> bool {
        self.persistent_locking
    }

    fn get_locks(&self, internal_path: &str) -> Result<Vec<LockRecord>, LockStoreError> {
        self.store.find_locks(&self.id, internal_path)
    }

    fn lock_node_persistent(
        &self,
        internal_path: &str,
        attrs: &LockAttributes,
    ) -> Result<bool, LockStoreError> {
        let Some(_guard) = self.guard(internal_path)? else {
            debug!(path = internal_path, "acquisition in progress elsewhere; refusing");
            return Ok(false);
        };

        let now = Utc::now().timestamp();
        let timeout = attrs
            .timeout
            .unwrap_or(self.settings.default_timeout_seconds);
        let existing = self.store.find_locks(&self.id, internal_path)?;

        // Same token on the same path: refresh
        if let Some(current) = existing.iter().find(|r| r.token == attrs.token) {
            let mut refreshed = current.clone();
            refreshed.created_at = now;
            refreshed.timeout = timeout;
            self.store.replace(&refreshed)?;
            debug!(path = internal_path, token = %attrs.token, "refreshed lock");
            return Ok(true);
        }

        let live: Vec<&LockRecord> = existing.iter().filter(|r| !r.is_expired_at(now)).collect();
        if Self::conflicts(attrs.scope, &live) {
            debug!(path = internal_path, held = live.len(), "lock conflicts with held locks");
            return Ok(false);
        }

        let record = LockRecord {
            token: attrs.token.clone(),
            scope: attrs.scope,
            depth: PERSISTED_DEPTH,
            storage_id: self.id.clone(),
            target_file: internal_path.to_string(),
            owner_user_id: self.owner_user_id.clone(),
            owner: attrs.owner.clone(),
            timeout,
            created_at: now,
        };

        match self.store.insert(&record) {
            Ok(()) => Ok(true),
            // Token still held on another path
            Err(LockStoreError::Duplicate(token)) => {
                debug!(path = internal_path, token = %token, "token already in use");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn unlock_node_persistent(
        &self,
        internal_path: &str,
        attrs: &UnlockAttributes,
    ) -> Result<bool, LockStoreError> {
        let Some(_guard) = self.guard(internal_path)? else {
            debug!(path = internal_path, "lock change in progress elsewhere; refusing unlock");
            return Ok(false);
        };

        match self.store.find_by_token(&attrs.token)? {
            Some(record) if record.storage_id == self.id && record.target_file == internal_path => {
                self.store.delete_by_token(&attrs.token)
            }
            _ => Ok(false),
        }
    }
}
