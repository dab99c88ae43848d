//! Cleanup orchestration over a lock store.

use super::store::{LockStore, LockStoreError};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

/// Removes expired locks from a store. Holds no other state.
#[derive(Clone)]
pub struct LockManager {
    store: Arc<dyn LockStore>,
}

impl LockManager {
    pub fn new(store: Arc<dyn LockStore>) -> Self {
        Self { store }
    }

    /// Sweep records that expired before the current time.
    pub fn cleanup(&self) -> Result<usize, LockStoreError> {
        self.cleanup_at(Utc::now().timestamp())
    }

    /// Sweep records with `created_at + timeout < now`.
    ///
    /// Returns the number of records removed. Calling it again with no newly
    /// expired records removes nothing.
    pub fn cleanup_at(&self, now: i64) -> Result<usize, LockStoreError> {
        let removed = self.store.delete_expired(now)?;
        if removed > 0 {
            info!(removed, now, "removed expired persistent locks");
        }
        Ok(removed)
    }
}

impl std::fmt::Debug for LockManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockManager").finish_non_exhaustive()
    }
}
