//! Row store error types
//!
//! Error codes:
//! - NEST_STORE_CONFLICT (ERROR severity) - concurrent commit on the same scope
//! - NEST_STORE_LOCKED (ERROR severity) - another handle holds the commit log
//! - NEST_STORE_REJECTED (ERROR severity) - malformed batch, nothing applied
//! - NEST_STORE_CORRUPTION (FATAL severity) - commit log failed verification
//! - NEST_STORE_IO_ERROR (ERROR severity)
//! - NEST_STORE_SERIALIZATION (ERROR severity)
//! - NEST_STORE_POISONED (FATAL severity) - a writer panicked while holding the scope lock

use std::fmt;
use std::io;

use thiserror::Error;

use crate::node::TreeId;

use super::batch::Revision;

/// Severity levels for store errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, store stays usable
    Error,
    /// Store must not be used any further
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Row store failure
#[derive(Debug, Error)]
pub enum StoreError {
    /// The scope changed between the caller's read and its batch
    #[error("scope {tree} is at revision {actual}, batch expected {expected}")]
    Conflict {
        tree: TreeId,
        expected: Revision,
        actual: Revision,
    },

    /// Another handle already owns the commit log
    #[error("commit log {path} is locked by another handle")]
    Locked { path: String },

    /// The batch cannot be applied as a whole
    #[error("batch rejected for scope {tree}: {reason}")]
    Rejected { tree: TreeId, reason: String },

    /// The commit log failed verification
    #[error("commit log corrupted at byte_offset {offset}: {reason}")]
    Corruption { offset: u64, reason: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("{context}: {source}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("store lock poisoned: {0}")]
    Poisoned(String),
}

impl StoreError {
    pub fn conflict(tree: &TreeId, expected: Revision, actual: Revision) -> Self {
        Self::Conflict {
            tree: tree.clone(),
            expected,
            actual,
        }
    }

    pub fn locked(path: impl Into<String>) -> Self {
        Self::Locked { path: path.into() }
    }

    pub fn rejected(tree: &TreeId, reason: impl Into<String>) -> Self {
        Self::Rejected {
            tree: tree.clone(),
            reason: reason.into(),
        }
    }

    pub fn corruption_at_offset(offset: u64, reason: impl Into<String>) -> Self {
        Self::Corruption {
            offset,
            reason: reason.into(),
        }
    }

    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Conflict { .. } => "NEST_STORE_CONFLICT",
            Self::Locked { .. } => "NEST_STORE_LOCKED",
            Self::Rejected { .. } => "NEST_STORE_REJECTED",
            Self::Corruption { .. } => "NEST_STORE_CORRUPTION",
            Self::Io { .. } => "NEST_STORE_IO_ERROR",
            Self::Serialization { .. } => "NEST_STORE_SERIALIZATION",
            Self::Poisoned(_) => "NEST_STORE_POISONED",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::Corruption { .. } | Self::Poisoned(_) => Severity::Fatal,
            _ => Severity::Error,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
