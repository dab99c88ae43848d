//! Config loading, validation, and utility operations.

use super::model::Config;
use crate::error::{DavLockError, Result};
use crate::storage::LockSettings;
use std::path::Path;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            DavLockError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| DavLockError::UserError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            DavLockError::UserError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - all intervals and timeouts must be positive
    /// - mount names must be non-empty and contain no `/`
    /// - mount owners must be non-empty
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("cleanup_interval_minutes", self.cleanup_interval_minutes),
            (
                "default_lock_timeout_seconds",
                self.default_lock_timeout_seconds,
            ),
            ("guard_stale_seconds", self.guard_stale_seconds),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(DavLockError::UserError(format!(
                    "config validation failed: {} must be greater than 0",
                    name
                )));
            }
        }

        for (name, mount) in &self.mounts {
            if name.is_empty() || name.contains('/') {
                return Err(DavLockError::UserError(format!(
                    "config validation failed: invalid mount name '{}' (must be non-empty without '/')",
                    name
                )));
            }
            if mount.owner.trim().is_empty() {
                return Err(DavLockError::UserError(format!(
                    "config validation failed: mount '{}' has an empty owner",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Cleanup interval in seconds, as handed to the job runner.
    pub fn cleanup_interval_seconds(&self) -> u64 {
        self.cleanup_interval_minutes.saturating_mul(60)
    }

    /// Lock tuning applied to every mounted storage.
    pub fn lock_settings(&self) -> LockSettings {
        LockSettings {
            default_timeout_seconds: self.default_lock_timeout_seconds,
            guard_stale_seconds: self.guard_stale_seconds,
        }
    }
}
