//! Per-path acquisition guard.
//!
//! A storage serializes lock acquisition on one internal path by creating a
//! guard file with **create_new** semantics. The guard is removed when the
//! RAII `PathGuard` drops. A guard left behind by a crashed process is broken
//! once it is older than the configured stale threshold; breaking renames the
//! stale file aside first so two contenders cannot both break it.

use super::{aside_path, escape_file_stem};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::warn;

/// Metadata written into a guard file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardMetadata {
    /// Process owner (`user@HOST`).
    pub owner: String,

    /// Process ID of the guard holder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    /// Timestamp when the guard was taken (RFC3339).
    pub created_at: DateTime<Utc>,
}

impl GuardMetadata {
    /// Create new guard metadata with the current timestamp.
    pub fn new() -> Self {
        Self {
            owner: owner_string(),
            pid: Some(std::process::id()),
            created_at: Utc::now(),
        }
    }

    /// Parse guard metadata from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Age of the guard.
    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.created_at)
    }

    /// Whether the guard is older than `stale_seconds`.
    pub fn is_stale(&self, stale_seconds: u64) -> bool {
        self.age().num_seconds() > i64::try_from(stale_seconds).unwrap_or(i64::MAX)
    }
}

impl Default for GuardMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard over one path key. Dropping it removes the guard file.
#[derive(Debug)]
pub struct PathGuard {
    path: PathBuf,
}

/// What a guard file held when it was judged stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Observed {
    content: Vec<u8>,
    modified: Option<SystemTime>,
}

impl Observed {
    pub(super) fn read(path: &Path) -> io::Result<Self> {
        let content = fs::read(path)?;
        let modified = fs::metadata(path)?.modified().ok();
        Ok(Self { content, modified })
    }
}

enum Holder {
    Gone,
    Live,
    Stale(Observed),
}

impl PathGuard {
    /// Try to take the guard for `key` inside `guards_dir`.
    ///
    /// Returns `Ok(None)` when another holder has it. A stale guard is taken
    /// over and acquisition is attempted exactly once more.
    pub fn try_acquire(
        guards_dir: &Path,
        key: &str,
        stale_seconds: u64,
    ) -> io::Result<Option<PathGuard>> {
        fs::create_dir_all(guards_dir)?;
        let path = guards_dir.join(format!("{}.guard", escape_file_stem(key)));

        if let Some(guard) = Self::create(&path)? {
            return Ok(Some(guard));
        }

        match inspect(&path, stale_seconds)? {
            // Released between our create and read
            Holder::Gone => Self::create(&path),
            Holder::Live => Ok(None),
            Holder::Stale(observed) => {
                warn!(guard = %path.display(), "breaking stale guard");
                if take_over(&path, &observed)? {
                    Self::create(&path)
                } else {
                    Ok(None)
                }
            }
        }
    }

    fn create(path: &Path) -> io::Result<Option<PathGuard>> {
        let json = serde_json::to_string(&GuardMetadata::new())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(None),
            Err(e) => return Err(e),
        };

        if let Err(e) = file.write_all(json.as_bytes()) {
            let _ = fs::remove_file(path);
            return Err(e);
        }

        Ok(Some(PathGuard {
            path: path.to_path_buf(),
        }))
    }

    /// Path to the guard file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PathGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(guard = %self.path.display(), error = %e, "failed to release guard");
        }
    }
}

/// Decide whether the guard at `path` is held, stale or gone.
///
/// A guard whose metadata does not parse (holder died mid-write) is aged by
/// its modification time instead.
fn inspect(path: &Path, stale_seconds: u64) -> io::Result<Holder> {
    let observed = match Observed::read(path) {
        Ok(observed) => observed,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Holder::Gone),
        Err(e) => return Err(e),
    };

    let stale = match serde_json::from_slice::<GuardMetadata>(&observed.content) {
        Ok(meta) => meta.is_stale(stale_seconds),
        Err(_) => observed
            .modified
            .and_then(|modified| modified.elapsed().ok())
            .is_some_and(|age| age.as_secs() > stale_seconds),
    };

    Ok(if stale {
        Holder::Stale(observed)
    } else {
        Holder::Live
    })
}

/// Remove the stale guard at `path`, but only if it is still the one observed.
///
/// The guard is first renamed aside, which only one contender can do. If the
/// file moved aside is not the observed one, another contender already
/// replaced the stale guard; it is linked back and `false` is returned.
pub(super) fn take_over(path: &Path, observed: &Observed) -> io::Result<bool> {
    let aside = aside_path(path, "broken");

    match fs::rename(path, &aside) {
        Ok(()) => {}
        // Someone else removed it; the next create decides
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(e),
    }

    let taken = Observed::read(&aside);
    if taken.as_ref().ok() == Some(observed) {
        fs::remove_file(&aside)?;
        return Ok(true);
    }

    match fs::hard_link(&aside, path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
        Err(e) => {
            let _ = fs::remove_file(&aside);
            return Err(e);
        }
    }
    fs::remove_file(&aside)?;
    Ok(false)
}

/// Guard key serializing lock changes on one file of one storage.
pub fn guard_key(storage_id: &str, internal_path: &str) -> String {
    format!("{}/{}", storage_id, internal_path)
}

/// Owner string for guard metadata.
pub(crate) fn owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}
