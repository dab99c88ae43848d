//! Lock record and storage-level scope definitions.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Depth written to every persisted record.
///
/// Persistence is per concrete file, so protocol-level depth never reaches
/// the store.
pub const PERSISTED_DEPTH: u32 = 0;

/// A scope value that does not belong to the closed scope set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    /// A storage-level integer with no scope behind it.
    #[error("unmapped lock scope value: {0}")]
    Unmapped(u8),

    /// A protocol-level scope name that is neither shared nor exclusive.
    #[error("unknown lock scope '{0}' (expected 'shared' or 'exclusive')")]
    UnknownName(String),
}

/// Storage-level lock scope.
///
/// Persisted as an integer constant; unknown integers are rejected on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum LockScope {
    /// Only one holder; conflicts with every other lock on the path.
    Exclusive,
    /// Any number of holders; conflicts only with an exclusive lock.
    Shared,
}

impl LockScope {
    /// Storage constant for exclusive locks.
    pub const LOCK_SCOPE_EXCLUSIVE: u8 = 1;
    /// Storage constant for shared locks.
    pub const LOCK_SCOPE_SHARED: u8 = 2;

    /// Every storage scope.
    pub const ALL: [LockScope; 2] = [LockScope::Exclusive, LockScope::Shared];

    /// The integer constant persisted for this scope.
    pub fn as_u8(self) -> u8 {
        match self {
            LockScope::Exclusive => Self::LOCK_SCOPE_EXCLUSIVE,
            LockScope::Shared => Self::LOCK_SCOPE_SHARED,
        }
    }
}

impl TryFrom<u8> for LockScope {
    type Error = ScopeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            Self::LOCK_SCOPE_EXCLUSIVE => Ok(LockScope::Exclusive),
            Self::LOCK_SCOPE_SHARED => Ok(LockScope::Shared),
            other => Err(ScopeError::Unmapped(other)),
        }
    }
}

impl From<LockScope> for u8 {
    fn from(scope: LockScope) -> Self {
        scope.as_u8()
    }
}

/// One persisted lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    /// Opaque token supplied by the protocol layer. Unique among live locks.
    pub token: String,

    /// Storage-level scope.
    pub scope: LockScope,

    /// Always `PERSISTED_DEPTH`.
    pub depth: u32,

    /// Id of the storage owning the locked file.
    pub storage_id: String,

    /// Internal path of the locked file inside its storage.
    pub target_file: String,

    /// User owning the storage; used to rebuild the protocol URI.
    pub owner_user_id: String,

    /// Human-readable owner label supplied by the requester.
    pub owner: String,

    /// Requested lifetime in seconds.
    pub timeout: u64,

    /// Creation time, seconds since the epoch.
    pub created_at: i64,
}

impl LockRecord {
    /// Parse a lock record from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Serialize the record to a JSON string.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Time at which the lock stops being valid, seconds since the epoch.
    pub fn expires_at(&self) -> i64 {
        let timeout = i64::try_from(self.timeout).unwrap_or(i64::MAX);
        self.created_at.saturating_add(timeout)
    }

    /// Whether the cleanup sweep at `now` removes this record.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at() < now
    }

}

/// Render a number of seconds left as `1d 2h`, `3h 4m`, `5m`, `6s` or `expired`.
///
/// Zero seconds left is still live, matching `LockRecord::is_expired_at`.
pub fn format_remaining(remaining: i64) -> String {
    if remaining < 0 {
        return "expired".to_string();
    }

    let minutes = remaining / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{}d {}h", days, hours % 24)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{}m", minutes)
    } else {
        format!("{}s", remaining)
    }
}
