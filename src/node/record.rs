//! Node rows
//!
//! A `TreeNode` is what the row store persists: an id plus its bounds.
//! `NodeView` is the shape handed to collaborators (schema/UI adapters),
//! carrying the resolved parent id alongside the triple.

use serde::{Deserialize, Serialize};

use super::bounds::NodeBounds;
use super::ids::NodeId;

/// A placed node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: NodeId,
    #[serde(flatten)]
    pub bounds: NodeBounds,
}

impl TreeNode {
    pub fn new(id: NodeId, bounds: NodeBounds) -> Self {
        Self { id, bounds }
    }

    pub fn left(&self) -> u64 {
        self.bounds.left
    }

    pub fn right(&self) -> u64 {
        self.bounds.right
    }

    pub fn depth(&self) -> u32 {
        self.bounds.depth
    }

    pub fn is_root(&self) -> bool {
        self.bounds.is_root()
    }

    pub fn is_leaf(&self) -> bool {
        self.bounds.is_leaf()
    }
}

/// External view of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeView {
    pub id: NodeId,
    pub left: u64,
    pub right: u64,
    pub depth: u32,
    /// `None` for the root
    pub parent: Option<NodeId>,
}

impl NodeView {
    pub fn new(node: &TreeNode, parent: Option<NodeId>) -> Self {
        Self {
            id: node.id.clone(),
            left: node.left(),
            right: node.right(),
            depth: node.depth(),
            parent,
        }
    }
}
