//! Structural filters
//!
//! Each filter turns a reference node into a range predicate that can be
//! handed straight to `RowStore::find_many`.

use serde::{Deserialize, Serialize};

use crate::node::{NodeBounds, NodeId};
use crate::store::RangePredicate;

/// Relations to resolve into a single predicate.
///
/// Every populated field contributes its conditions; the result is their
/// conjunction. An empty filter matches the whole scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeFilter {
    /// Select the previous sibling of this node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_sibling_id: Option<NodeId>,
    /// Select the next sibling of this node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_sibling_id: Option<NodeId>,
    /// Select the parent of this node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_of: Option<NodeId>,
    /// Select the direct children of this node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_of: Option<NodeId>,
}

impl NodeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prev_sibling_id(mut self, id: impl Into<NodeId>) -> Self {
        self.prev_sibling_id = Some(id.into());
        self
    }

    pub fn next_sibling_id(mut self, id: impl Into<NodeId>) -> Self {
        self.next_sibling_id = Some(id.into());
        self
    }

    pub fn parent_of(mut self, id: impl Into<NodeId>) -> Self {
        self.parent_of = Some(id.into());
        self
    }

    pub fn child_of(mut self, id: impl Into<NodeId>) -> Self {
        self.child_of = Some(id.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.prev_sibling_id.is_none()
            && self.next_sibling_id.is_none()
            && self.parent_of.is_none()
            && self.child_of.is_none()
    }
}

/// The node ending right before `reference` starts, at the same depth
pub fn prev_sibling_predicate(reference: &NodeBounds) -> RangePredicate {
    RangePredicate::all()
        .depth_eq(reference.depth)
        .right_eq(reference.left.saturating_sub(1))
}

/// The node starting right after `reference` ends, at the same depth
pub fn next_sibling_predicate(reference: &NodeBounds) -> RangePredicate {
    RangePredicate::all()
        .depth_eq(reference.depth)
        .left_eq(reference.right + 1)
}

/// Nodes one level below `reference` and inside its range
pub fn children_predicate(reference: &NodeBounds) -> RangePredicate {
    RangePredicate::all()
        .depth_eq(reference.depth + 1)
        .left_gt(reference.left)
        .right_lt(reference.right)
}

/// The node one level above `reference` whose range contains it.
///
/// For a root this matches nothing: no row has `left < 1`.
pub fn parent_predicate(reference: &NodeBounds) -> RangePredicate {
    RangePredicate::all()
        .depth_eq(reference.depth.saturating_sub(1))
        .left_lt(reference.left)
        .right_gt(reference.right)
}

/// Strict ancestors of `reference`, root first
pub fn ancestors_predicate(reference: &NodeBounds) -> RangePredicate {
    RangePredicate::all()
        .left_lt(reference.left)
        .right_gt(reference.right)
}

/// Strict descendants of `reference`
pub fn descendants_predicate(reference: &NodeBounds) -> RangePredicate {
    RangePredicate::all()
        .left_gt(reference.left)
        .right_lt(reference.right)
}

/// Nodes at `depth` whose range overlaps `reference`.
///
/// Depth 0 is counted as depth 1.
pub fn weight_predicate(reference: &NodeBounds, depth: u32) -> RangePredicate {
    RangePredicate::all()
        .depth_eq(depth.max(1))
        .left_lt(reference.right)
        .right_gt(reference.left)
}
