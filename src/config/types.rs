//! Configuration types and defaults for davlock.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A directory exposed as a storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountConfig {
    /// User owning the storage; appears in lock URIs.
    pub owner: String,

    /// Directory backing the storage, absolute or relative to the root.
    pub root: PathBuf,

    /// Whether the storage keeps persistent locks.
    #[serde(default = "default_true")]
    pub persistent_locking: bool,
}

// Default value functions for serde
pub(crate) fn default_cleanup_interval_minutes() -> u64 {
    30
}
pub(crate) fn default_lock_timeout_seconds() -> u64 {
    1800
}
pub(crate) fn default_guard_stale_seconds() -> u64 {
    30
}
pub(crate) fn default_true() -> bool {
    true
}
