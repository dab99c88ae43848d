//! Davlock: persistent WebDAV locks for file storage backends.
//!
//! Lock requests arrive through [`dav::FileLocksBackend`], which resolves the
//! protocol path to a file in some [`storage::Storage`] and, when that storage
//! keeps persistent locks, delegates to it. Locks are stored as
//! [`locks::LockRecord`]s in a [`locks::LockStore`]; expired records are swept
//! by [`locks::LockManager`], usually from the
//! [`jobs::CleanupPersistentFileLocks`] timed job.

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod dav;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod fs;
pub mod jobs;
pub mod locks;
pub mod logging;
pub mod storage;

#[cfg(test)]
mod test_support;
