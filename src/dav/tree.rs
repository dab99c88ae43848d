//! Resource resolution boundary.

use crate::storage::Storage;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while resolving a path to a node.
#[derive(Error, Debug)]
pub enum TreeError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("failed to resolve '{path}': {message}")]
    Backend { path: String, message: String },
}

/// Where a file lives: its storage and its path inside that storage.
#[derive(Clone)]
pub struct FileInfo {
    storage: Arc<dyn Storage>,
    internal_path: String,
}

impl FileInfo {
    pub fn new(storage: Arc<dyn Storage>, internal_path: impl Into<String>) -> Self {
        Self {
            storage,
            internal_path: internal_path.into(),
        }
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    pub fn internal_path(&self) -> &str {
        &self.internal_path
    }
}

impl fmt::Debug for FileInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileInfo")
            .field("storage", &self.storage.id())
            .field("internal_path", &self.internal_path)
            .finish()
    }
}

/// A resolved resource.
pub trait Node: Send + Sync {
    fn name(&self) -> &str;

    /// Storage location, for nodes that are files backed by a storage.
    fn file_info(&self) -> Option<&FileInfo> {
        None
    }
}

/// Resolves protocol paths to nodes.
pub trait ResourceTree: Send + Sync {
    fn node_for_path(&self, path: &str) -> Result<Arc<dyn Node>, TreeError>;
}

/// A regular file backed by a storage.
#[derive(Debug, Clone)]
pub struct FileNode {
    name: String,
    info: FileInfo,
}

impl FileNode {
    pub fn new(name: impl Into<String>, info: FileInfo) -> Self {
        Self {
            name: name.into(),
            info,
        }
    }
}

impl Node for FileNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn file_info(&self) -> Option<&FileInfo> {
        Some(&self.info)
    }
}

/// A collection. Collections are never persistently locked.
#[derive(Debug, Clone)]
pub struct DirectoryNode {
    name: String,
}

impl DirectoryNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Node for DirectoryNode {
    fn name(&self) -> &str {
        &self.name
    }
}
