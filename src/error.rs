//! Error types for davlock.
//!
//! Uses thiserror for derive macros. `DavLockError` is the application-level
//! error surfaced by the CLI; the lock-request adapter never returns it and
//! instead folds failures into `false` / empty results.

use crate::exit_codes;
use crate::locks::{LockStoreError, ScopeError};
use thiserror::Error;

/// Main error type for davlock operations.
#[derive(Error, Debug)]
pub enum DavLockError {
    /// User provided invalid arguments or the system is in an invalid state.
    #[error("{0}")]
    UserError(String),

    /// The storage refused to grant or release a lock.
    #[error("Lock refused: {0}")]
    LockRefused(String),

    /// The lock store failed.
    #[error("Lock store failure: {0}")]
    Store(#[from] LockStoreError),

    /// A scope value did not map onto the closed scope table.
    #[error(transparent)]
    Scope(#[from] ScopeError),
}

impl DavLockError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            DavLockError::UserError(_) => exit_codes::USER_ERROR,
            DavLockError::Scope(_) => exit_codes::USER_ERROR,
            DavLockError::LockRefused(_) => exit_codes::LOCK_REFUSED,
            DavLockError::Store(_) => exit_codes::STORAGE_FAILURE,
        }
    }
}

/// Result type alias for davlock operations.
pub type Result<T> = std::result::Result<T, DavLockError>;
