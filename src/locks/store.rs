//! Lock store contract and the file-backed implementation.

use super::guard::{PathGuard, guard_key};
use super::record::LockRecord;
use super::{aside_path, escape_file_stem};
use crate::fs::atomic_write;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Extension carried by every lock record file.
const LOCK_FILE_EXTENSION: &str = "lock";

/// Errors raised by a lock store.
#[derive(Error, Debug)]
pub enum LockStoreError {
    /// A record with this token already exists.
    #[error("lock token '{0}' already exists")]
    Duplicate(String),

    /// No record with this token exists.
    #[error("lock token '{0}' does not exist")]
    NotFound(String),

    /// Filesystem failure.
    #[error("failed to {action} '{}': {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The record could not be serialized.
    #[error("failed to serialize lock record: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl LockStoreError {
    pub(crate) fn io(action: &'static str, path: &Path, source: io::Error) -> Self {
        LockStoreError::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Access contract over persisted lock records.
///
/// Every mutation is keyed by token or by the expiry predicate, never a
/// read-modify-write of the whole collection, so concurrent callers cannot
/// lose each other's updates.
pub trait LockStore: Send + Sync {
    /// All records on `internal_path` of storage `storage_id`, expired or not.
    fn find_locks(
        &self,
        storage_id: &str,
        internal_path: &str,
    ) -> Result<Vec<LockRecord>, LockStoreError>;

    /// The record holding `token`, if any.
    fn find_by_token(&self, token: &str) -> Result<Option<LockRecord>, LockStoreError>;

    /// Insert a new record. Fails with `Duplicate` if the token is taken.
    fn insert(&self, record: &LockRecord) -> Result<(), LockStoreError>;

    /// Overwrite the record with the same token. Fails with `NotFound` if absent.
    fn replace(&self, record: &LockRecord) -> Result<(), LockStoreError>;

    /// Delete the record holding `token`. Returns whether one was removed.
    fn delete_by_token(&self, token: &str) -> Result<bool, LockStoreError>;

    /// Delete every record with `created_at + timeout < now`. Returns the count.
    fn delete_expired(&self, now: i64) -> Result<usize, LockStoreError>;
}

/// Lock store keeping one JSON file per token.
#[derive(Debug, Clone)]
pub struct FileLockStore {
    locks_dir: PathBuf,
    guards: Option<SweepGuards>,
}

/// Path guards the sweep shares with storages writing to this store.
#[derive(Debug, Clone)]
struct SweepGuards {
    dir: PathBuf,
    stale_seconds: u64,
}

impl FileLockStore {
    /// Create a store rooted at `locks_dir`. The directory is created lazily.
    pub fn new(locks_dir: impl Into<PathBuf>) -> Self {
        Self {
            locks_dir: locks_dir.into(),
            guards: None,
        }
    }

    /// Sweep each expired record under the same path guard storages take,
    /// skipping paths that are busy.
    pub fn with_guards(mut self, guards_dir: impl Into<PathBuf>, stale_seconds: u64) -> Self {
        self.guards = Some(SweepGuards {
            dir: guards_dir.into(),
            stale_seconds,
        });
        self
    }

    /// Directory holding the lock files.
    pub fn locks_dir(&self) -> &Path {
        &self.locks_dir
    }

    /// Path of the file holding `token`.
    pub fn record_path(&self, token: &str) -> PathBuf {
        self.locks_dir.join(format!(
            "{}.{}",
            escape_file_stem(token),
            LOCK_FILE_EXTENSION
        ))
    }

    /// Read every parsable record in the store.
    ///
    /// Files that vanish between listing and reading are skipped silently;
    /// unparsable files are skipped with a warning.
    fn read_all(&self) -> Result<Vec<(PathBuf, LockRecord)>, LockStoreError> {
        let entries = match fs::read_dir(&self.locks_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(LockStoreError::io("read locks directory", &self.locks_dir, e)),
        };

        let mut records = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| LockStoreError::io("read locks directory", &self.locks_dir, e))?;
            let path = entry.path();

            if path.extension().and_then(|e| e.to_str()) != Some(LOCK_FILE_EXTENSION) {
                continue;
            }

            match LockRecord::from_file(&path) {
                Ok(record) => records.push((path, record)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable lock file");
                }
            }
        }

        Ok(records)
    }
}

impl LockStore for FileLockStore {
    fn find_locks(
        &self,
        storage_id: &str,
        internal_path: &str,
    ) -> Result<Vec<LockRecord>, LockStoreError> {
        let mut locks: Vec<LockRecord> = self
            .read_all()?
            .into_iter()
            .map(|(_, record)| record)
            .filter(|r| r.storage_id == storage_id && r.target_file == internal_path)
            .collect();

        // Stable output for listings
        locks.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.token.cmp(&b.token))
        });

        Ok(locks)
    }

    fn find_by_token(&self, token: &str) -> Result<Option<LockRecord>, LockStoreError> {
        let path = self.record_path(token);
        match LockRecord::from_file(&path) {
            Ok(record) => Ok(Some(record)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LockStoreError::io("read lock file", &path, e)),
        }
    }

    fn insert(&self, record: &LockRecord) -> Result<(), LockStoreError> {
        if !self.locks_dir.exists() {
            fs::create_dir_all(&self.locks_dir)
                .map_err(|e| LockStoreError::io("create locks directory", &self.locks_dir, e))?;
        }

        let path = self.record_path(&record.token);
        let json = record.to_json()?;

        // Exclusive create: a second insert of the same token fails here
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                if e.kind() == io::ErrorKind::AlreadyExists {
                    LockStoreError::Duplicate(record.token.clone())
                } else {
                    LockStoreError::io("create lock file", &path, e)
                }
            })?;

        if let Err(e) = file.write_all(json.as_bytes()).and_then(|_| file.sync_all()) {
            let _ = fs::remove_file(&path);
            return Err(LockStoreError::io("write lock file", &path, e));
        }

        debug!(token = %record.token, path = %record.target_file, "inserted lock record");
        Ok(())
    }

    /// Callers hold the path guard, so the record cannot be deleted between
    /// the existence check and the rewrite.
    fn replace(&self, record: &LockRecord) -> Result<(), LockStoreError> {
        let path = self.record_path(&record.token);
        if !path.exists() {
            return Err(LockStoreError::NotFound(record.token.clone()));
        }

        let json = record.to_json()?;
        atomic_write(&path, json.as_bytes())
            .map_err(|e| LockStoreError::io("replace lock file", &path, e))?;

        debug!(token = %record.token, "replaced lock record");
        Ok(())
    }

    fn delete_by_token(&self, token: &str) -> Result<bool, LockStoreError> {
        let path = self.record_path(token);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(token, "deleted lock record");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(LockStoreError::io("remove lock file", &path, e)),
        }
    }

    fn delete_expired(&self, now: i64) -> Result<usize, LockStoreError> {
        let mut removed = 0;

        for (path, record) in self.read_all()? {
            if !record.is_expired_at(now) {
                continue;
            }

            let _guard = match &self.guards {
                Some(guards) => {
                    let key = guard_key(&record.storage_id, &record.target_file);
                    match PathGuard::try_acquire(&guards.dir, &key, guards.stale_seconds) {
                        Ok(Some(guard)) => Some(guard),
                        Ok(None) => {
                            debug!(token = %record.token, "path busy; left for the next sweep");
                            continue;
                        }
                        Err(e) => return Err(LockStoreError::io("acquire guard", &guards.dir, e)),
                    }
                }
                None => None,
            };

            if self.remove_if_expired(&path, now)? {
                debug!(token = %record.token, expired_at = record.expires_at(), "removed expired lock");
                removed += 1;
            }
        }

        Ok(removed)
    }
}

impl FileLockStore {
    /// Remove the record file at `path` only if what it holds now is expired.
    ///
    /// The file is renamed aside first, so a refresh that rewrote it after the
    /// sweep listed it is seen and put back instead of deleted.
    pub(super) fn remove_if_expired(&self, path: &Path, now: i64) -> Result<bool, LockStoreError> {
        let aside = aside_path(path, "sweep");
        match fs::rename(path, &aside) {
            Ok(()) => {}
            // Unlocked or swept concurrently
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(LockStoreError::io("move expired lock file", path, e)),
        }

        let expired = LockRecord::from_file(&aside).is_ok_and(|record| record.is_expired_at(now));
        if !expired {
            match fs::hard_link(&aside, path) {
                Ok(()) => {}
                // Token inserted again meanwhile; the newer record stays
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(LockStoreError::io("restore lock file", path, e)),
            }
        }

        fs::remove_file(&aside).map_err(|e| LockStoreError::io("remove lock file", &aside, e))?;
        Ok(expired)
    }
}
