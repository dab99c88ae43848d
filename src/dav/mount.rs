//! Resource tree over configured local mounts.
//!
//! A protocol path `<mount>/<rest>` resolves to `<mount root>/<rest>` on disk;
//! `<rest>` is the internal path inside the mount's storage.

use super::tree::{DirectoryNode, FileInfo, FileNode, Node, ResourceTree, TreeError};
use crate::config::Config;
use crate::context::StoreContext;
use crate::locks::LockStore;
use crate::storage::{LocalStorage, Storage};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

/// A named directory served by one storage.
#[derive(Clone)]
pub struct Mount {
    root: PathBuf,
    storage: Arc<dyn Storage>,
}

impl Mount {
    pub fn new(root: impl Into<PathBuf>, storage: Arc<dyn Storage>) -> Self {
        Self {
            root: root.into(),
            storage,
        }
    }
}

/// Resolves paths against a set of mounts.
#[derive(Clone, Default)]
pub struct MountTree {
    mounts: BTreeMap<String, Mount>,
}

impl MountTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mount(mut self, name: impl Into<String>, mount: Mount) -> Self {
        self.mounts.insert(name.into(), mount);
        self
    }

    /// Build one `LocalStorage` per configured mount, all sharing `store`.
    ///
    /// Relative mount roots are resolved against the context root.
    pub fn from_config(config: &Config, ctx: &StoreContext, store: Arc<dyn LockStore>) -> Self {
        let settings = config.lock_settings();
        let mut tree = Self::new();

        for (name, mount) in &config.mounts {
            let root = if mount.root.is_absolute() {
                mount.root.clone()
            } else {
                ctx.root.join(&mount.root)
            };
            let storage = LocalStorage::new(
                format!("local::{}", name),
                mount.owner.clone(),
                Arc::clone(&store),
                ctx.guards_dir.clone(),
            )
            .with_persistent_locking(mount.persistent_locking)
            .with_settings(settings);

            tree = tree.with_mount(name.clone(), Mount::new(root, Arc::new(storage)));
        }

        tree
    }
}

impl ResourceTree for MountTree {
    fn node_for_path(&self, path: &str) -> Result<Arc<dyn Node>, TreeError> {
        let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        let Some((mount_name, rest)) = components.split_first() else {
            return Err(TreeError::NotFound(path.to_string()));
        };

        let mount = self
            .mounts
            .get(*mount_name)
            .ok_or_else(|| TreeError::NotFound(path.to_string()))?;

        if rest.iter().any(|c| *c == "." || *c == "..") {
            return Err(TreeError::NotFound(path.to_string()));
        }

        let Some(name) = rest.last() else {
            return Ok(Arc::new(DirectoryNode::new(*mount_name)));
        };

        let internal_path = rest.join("/");
        let metadata = match fs::metadata(mount.root.join(&internal_path)) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(TreeError::NotFound(path.to_string()));
            }
            Err(e) => {
                return Err(TreeError::Backend {
                    path: path.to_string(),
                    message: e.to_string(),
                });
            }
        };

        if metadata.is_dir() {
            Ok(Arc::new(DirectoryNode::new(*name)))
        } else {
            let info = FileInfo::new(Arc::clone(&mount.storage), internal_path);
            Ok(Arc::new(FileNode::new(*name, info)))
        }
    }
}
