//! WebDAV-facing lock plumbing.
//!
//! The protocol server resolves lock requests by path; `FileLocksBackend`
//! bridges them onto the storage owning the resolved file:
//!
//! ```text
//! path -> ResourceTree -> Node::file_info -> Storage capability -> LockStore
//! ```
//!
//! Every failure along that chain is a normal outcome (`false` or an empty
//! list), never an error returned to the protocol layer.

mod backend;
mod descriptor;
mod mount;
mod tree;


pub use backend::FileLocksBackend;
pub use descriptor::{DEPTH_INFINITY, LockDescriptor, Scope};
pub use mount::{Mount, MountTree};
pub use tree::{DirectoryNode, FileInfo, FileNode, Node, ResourceTree, TreeError};
