//! Engine error types
//!
//! Error codes:
//! - NEST_NOT_FOUND - a referenced node does not exist; nothing was written
//! - NEST_INVALID_STATE - the mutation would break a structural invariant; nothing was written
//! - NEST_CONFLICT - a concurrent commit won; retry the whole operation
//! - NEST_INVARIANT_* - a committed scope failed verification
//! - NEST_UNVERIFIED_COMMIT - a mutation committed but the scope then failed verification
//! - NEST_CONFIG_INVALID - engine configuration rejected at construction
//! - NEST_STORE_* - row store failures, passed through unchanged

use thiserror::Error;

use crate::node::{InvariantViolation, NodeId, TreeId};
use crate::store::{Revision, StoreError};

/// Engine failure
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("node {node} not found in tree {tree}")]
    NotFound { tree: TreeId, node: NodeId },

    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The scope moved on while the mutation was computing its shift
    #[error("conflict: {0}")]
    Conflict(StoreError),

    #[error("invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),

    /// The batch is durable; the scope it produced did not verify
    #[error("mutation committed at revision {revision} but verification failed: {source}")]
    Unverified {
        revision: Revision,
        #[source]
        source: Box<TreeError>,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Store(StoreError),
}

impl TreeError {
    pub fn not_found(tree: &TreeId, node: &NodeId) -> Self {
        Self::NotFound {
            tree: tree.clone(),
            node: node.clone(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    pub fn unverified(revision: Revision, source: TreeError) -> Self {
        Self::Unverified {
            revision,
            source: Box::new(source),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NEST_NOT_FOUND",
            Self::InvalidState(_) => "NEST_INVALID_STATE",
            Self::Conflict(_) => "NEST_CONFLICT",
            Self::Invariant(v) => v.code(),
            Self::Unverified { .. } => "NEST_UNVERIFIED_COMMIT",
            Self::Config(_) => "NEST_CONFIG_INVALID",
            Self::Store(e) => e.code(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState(_))
    }

    /// Whether the mutation was applied despite the error
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Unverified { .. })
    }

    /// Whether retrying the whole operation may succeed
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<StoreError> for TreeError {
    fn from(e: StoreError) -> Self {
        if e.is_conflict() {
            Self::Conflict(e)
        } else {
            Self::Store(e)
        }
    }
}

/// Result type for engine operations
pub type TreeResult<T> = Result<T, TreeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_conflict_maps_to_conflict() {
        let err: TreeError = StoreError::conflict(&TreeId::from("t"), 1, 2).into();
        assert!(err.is_conflict());
        assert_eq!(err.code(), "NEST_CONFLICT");
    }

    #[test]
    fn test_infrastructure_errors_pass_through() {
        let err: TreeError = StoreError::corruption_at_offset(7, "bad frame").into();
        assert_eq!(err.code(), "NEST_STORE_CORRUPTION");
        assert!(err.to_string().contains("bad frame"));
    }

    #[test]
    fn test_not_found_display() {
        let err = TreeError::not_found(&TreeId::from("menu"), &NodeId::from("ghost"));
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "node ghost not found in tree menu");
    }
}
