//! Atomic write batches
//!
//! A batch carries every row change of one mutation together with the scope
//! revision the mutation read from. The store applies it all-or-nothing.

use serde::{Deserialize, Serialize};

use crate::node::{NodeBounds, NodeId, TreeId, TreeNode};

/// Per-scope commit counter. An empty, never-written scope is at revision 0.
pub type Revision = u64;

/// Typed `field -> value` assignments for one row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
}

impl FieldChanges {
    pub fn left(value: u64) -> Self {
        Self {
            left: Some(value),
            ..Self::default()
        }
    }

    pub fn right(value: u64) -> Self {
        Self {
            right: Some(value),
            ..Self::default()
        }
    }

    /// Changes that turn `from` into `to`, only for fields that differ.
    pub fn between(from: &NodeBounds, to: &NodeBounds) -> Self {
        Self {
            left: (from.left != to.left).then_some(to.left),
            right: (from.right != to.right).then_some(to.right),
            depth: (from.depth != to.depth).then_some(to.depth),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_none() && self.right.is_none() && self.depth.is_none()
    }

    /// Fold later assignments over earlier ones.
    pub fn merge(&mut self, other: FieldChanges) {
        if other.left.is_some() {
            self.left = other.left;
        }
        if other.right.is_some() {
            self.right = other.right;
        }
        if other.depth.is_some() {
            self.depth = other.depth;
        }
    }

    pub fn apply(&self, bounds: &NodeBounds) -> NodeBounds {
        NodeBounds {
            left: self.left.unwrap_or(bounds.left),
            right: self.right.unwrap_or(bounds.right),
            depth: self.depth.unwrap_or(bounds.depth),
        }
    }
}

/// One row change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum RowWrite {
    Insert { node: TreeNode },
    Update { id: NodeId, changes: FieldChanges },
    Delete { id: NodeId },
}

impl RowWrite {
    pub fn id(&self) -> &NodeId {
        match self {
            RowWrite::Insert { node } => &node.id,
            RowWrite::Update { id, .. } => id,
            RowWrite::Delete { id } => id,
        }
    }
}

/// All row changes of one mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteBatch {
    tree: TreeId,
    expected_revision: Revision,
    writes: Vec<RowWrite>,
}

impl WriteBatch {
    /// Start a batch computed from the scope as of `expected_revision`
    pub fn new(tree: TreeId, expected_revision: Revision) -> Self {
        Self {
            tree,
            expected_revision,
            writes: Vec::new(),
        }
    }

    pub fn insert(&mut self, node: TreeNode) {
        self.writes.push(RowWrite::Insert { node });
    }

    /// Queue an update; empty change sets are dropped.
    pub fn update(&mut self, id: NodeId, changes: FieldChanges) {
        if !changes.is_empty() {
            self.writes.push(RowWrite::Update { id, changes });
        }
    }

    pub fn delete(&mut self, id: NodeId) {
        self.writes.push(RowWrite::Delete { id });
    }

    pub fn extend(&mut self, writes: impl IntoIterator<Item = RowWrite>) {
        for write in writes {
            match write {
                RowWrite::Update { id, changes } => self.update(id, changes),
                other => self.writes.push(other),
            }
        }
    }

    pub fn tree(&self) -> &TreeId {
        &self.tree
    }

    pub fn expected_revision(&self) -> Revision {
        self.expected_revision
    }

    pub fn writes(&self) -> &[RowWrite] {
        &self.writes
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}
