//! Protocol-level lock representation and the scope mapping.

use crate::locks::{LockRecord, LockScope, ScopeError};
use std::fmt;
use std::str::FromStr;

/// Depth value meaning "the resource and all its descendants".
pub const DEPTH_INFINITY: i32 = -1;

/// Protocol-level lock scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Shared,
    Exclusive,
}

impl Scope {
    /// Every protocol scope.
    pub const ALL: [Scope; 2] = [Scope::Shared, Scope::Exclusive];

    /// Storage-level scope for this protocol scope.
    pub fn to_storage(self) -> LockScope {
        match self {
            Scope::Shared => LockScope::Shared,
            Scope::Exclusive => LockScope::Exclusive,
        }
    }

    /// Protocol scope for a storage-level scope.
    pub fn from_storage(scope: LockScope) -> Self {
        match scope {
            LockScope::Shared => Scope::Shared,
            LockScope::Exclusive => Scope::Exclusive,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Shared => "shared",
            Scope::Exclusive => "exclusive",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "shared" => Ok(Scope::Shared),
            "exclusive" => Ok(Scope::Exclusive),
            _ => Err(ScopeError::UnknownName(s.to_string())),
        }
    }
}

/// A lock as the protocol layer sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockDescriptor {
    /// Opaque lock token.
    pub token: String,

    pub scope: Scope,

    /// Requested depth (`0` or `DEPTH_INFINITY`).
    pub depth: i32,

    /// Protocol URI of the locked resource.
    pub uri: String,

    /// Owner label supplied by the requester.
    pub owner: Option<String>,

    /// Lifetime in seconds.
    pub timeout: Option<u64>,

    /// Creation time, seconds since the epoch.
    pub created: Option<i64>,
}

impl LockDescriptor {
    /// A lock request carrying only a token and scope.
    pub fn new(token: impl Into<String>, scope: Scope) -> Self {
        Self {
            token: token.into(),
            scope,
            depth: 0,
            uri: String::new(),
            owner: None,
            timeout: None,
            created: None,
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the protocol view of a persisted record.
    ///
    /// The URI is `files/<owner user>/<internal path>`.
    pub fn from_record(record: &LockRecord) -> Self {
        Self {
            token: record.token.clone(),
            scope: Scope::from_storage(record.scope),
            depth: record.depth as i32,
            uri: format!("files/{}/{}", record.owner_user_id, record.target_file),
            owner: Some(record.owner.clone()),
            timeout: Some(record.timeout),
            created: Some(record.created_at),
        }
    }
}
