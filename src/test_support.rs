use crate::config::{Config, MountConfig};
use crate::context::StoreContext;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, MutexGuard};
use tempfile::TempDir;

static CWD_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub(crate) struct DirGuard {
    original: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl DirGuard {
    pub(crate) fn new(new_dir: &Path) -> Self {
        // Changing the process current working directory is global and not thread-safe.
        // Lock it so tests don't race even if a #[serial] annotation is missed.
        let lock = CWD_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(new_dir).unwrap();
        Self {
            original,
            _lock: lock,
        }
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.original);
    }
}

/// Mount name used by `create_test_root`.
pub(crate) const TEST_MOUNT: &str = "alice";

/// Create an initialized root with one mount, `alice`, backed by
/// `files/alice/` and holding `locked-file.txt` and a `docs/` directory.
pub(crate) fn create_test_root() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let ctx = StoreContext::resolve_from(root).unwrap();

    fs::create_dir_all(&ctx.locks_dir).unwrap();
    fs::create_dir_all(&ctx.guards_dir).unwrap();
    fs::create_dir_all(ctx.events_dir()).unwrap();

    let files = root.join("files").join(TEST_MOUNT);
    fs::create_dir_all(files.join("docs")).unwrap();
    fs::write(files.join("locked-file.txt"), "content\n").unwrap();

    let mut config = Config::default();
    config.mounts.insert(
        TEST_MOUNT.to_string(),
        MountConfig {
            owner: TEST_MOUNT.to_string(),
            root: PathBuf::from("files").join(TEST_MOUNT),
            persistent_locking: true,
        },
    );
    fs::write(ctx.config_path(), config.to_yaml().unwrap()).unwrap();

    temp_dir
}
