//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration for a davlock state directory.
///
/// This struct represents the contents of `.davlock/config.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Lock settings
    // =========================================================================
    /// Minutes between two runs of the expired-lock cleanup job.
    #[serde(default = "default_cleanup_interval_minutes")]
    pub cleanup_interval_minutes: u64,

    /// Lifetime given to locks whose request carries no timeout.
    #[serde(default = "default_lock_timeout_seconds")]
    pub default_lock_timeout_seconds: u64,

    /// Seconds after which an abandoned acquisition guard is broken.
    #[serde(default = "default_guard_stale_seconds")]
    pub guard_stale_seconds: u64,

    // =========================================================================
    // Storage settings
    // =========================================================================
    /// Mounts by name; a protocol path starts with the mount name.
    #[serde(default)]
    pub mounts: BTreeMap<String, MountConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cleanup_interval_minutes: default_cleanup_interval_minutes(),
            default_lock_timeout_seconds: default_lock_timeout_seconds(),
            guard_stale_seconds: default_guard_stale_seconds(),
            mounts: BTreeMap::new(),
        }
    }
}
