//! Lock-request adapter between the protocol server and storages.

use super::descriptor::LockDescriptor;
use super::tree::{FileInfo, ResourceTree};
use crate::locks::{LockStoreError, PERSISTED_DEPTH};
use crate::storage::{LockAttributes, PersistentLockingStorage, UnlockAttributes, persistent_locking};
use std::sync::Arc;
use tracing::{debug, warn};

/// Delegates WebDAV lock operations to the persistent-locking capability of
/// the storage owning each resource.
///
/// All three operations soft-fail: an unknown path, a non-file node, or a
/// storage without the capability yields `false` or an empty list.
#[derive(Clone)]
pub struct FileLocksBackend {
    tree: Arc<dyn ResourceTree>,
}

impl FileLocksBackend {
    pub fn new(tree: Arc<dyn ResourceTree>) -> Self {
        Self { tree }
    }

    /// Locks held directly on `path`.
    ///
    /// `depth` is accepted for the caller contract; only the exact resource
    /// is reported whatever its value.
    pub fn get_locks(&self, path: &str, depth: i32) -> Vec<LockDescriptor> {
        debug!(path, depth, "lock discovery");
        self.with_locking_storage(path, "get_locks", Vec::new(), |storage, internal_path| {
            let records = storage.get_locks(internal_path)?;
            Ok(records.iter().map(LockDescriptor::from_record).collect())
        })
    }

    /// Acquire or refresh a lock on `path`.
    ///
    /// Returns exactly what the storage answered; conflicting locks are the
    /// storage's to reject.
    pub fn lock(&self, path: &str, request: &LockDescriptor) -> bool {
        let attrs = LockAttributes {
            token: request.token.clone(),
            scope: request.scope.to_storage(),
            depth: PERSISTED_DEPTH,
            owner: request.owner.clone().unwrap_or_default(),
            timeout: request.timeout,
        };

        self.with_locking_storage(path, "lock", false, |storage, internal_path| {
            storage.lock_node_persistent(internal_path, &attrs)
        })
    }

    /// Release the lock identified by `request.token` on `path`.
    pub fn unlock(&self, path: &str, request: &LockDescriptor) -> bool {
        let attrs = UnlockAttributes {
            token: request.token.clone(),
        };

        self.with_locking_storage(path, "unlock", false, |storage, internal_path| {
            storage.unlock_node_persistent(internal_path, &attrs)
        })
    }

    /// Resolve `path` to a file and its storage location.
    fn resolve_file(&self, path: &str) -> Option<FileInfo> {
        let node = match self.tree.node_for_path(path) {
            Ok(node) => node,
            Err(e) => {
                debug!(path, error = %e, "path did not resolve");
                return None;
            }
        };

        let info = node.file_info().cloned();
        if info.is_none() {
            debug!(path, node = node.name(), "node is not a storage-backed file");
        }
        info
    }

    /// Run `op` against the locking storage behind `path`, or return `fallback`.
    fn with_locking_storage<T>(
        &self,
        path: &str,
        operation: &'static str,
        fallback: T,
        op: impl FnOnce(&dyn PersistentLockingStorage, &str) -> Result<T, LockStoreError>,
    ) -> T {
        let Some(info) = self.resolve_file(path) else {
            return fallback;
        };

        let Some(storage) = persistent_locking(info.storage()) else {
            debug!(path, storage = info.storage().id(), "storage lacks persistent locking");
            return fallback;
        };

        match op(storage, info.internal_path()) {
            Ok(result) => result,
            Err(e) => {
                warn!(path, operation, error = %e, "persistent lock operation failed");
                fallback
            }
        }
    }
}
