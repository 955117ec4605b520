//! The `(left, right, depth)` triple
//!
//! A node's subtree is exactly the set of nodes whose range lies strictly
//! inside `[left, right]`. Everything the engine knows about structure is
//! derived from these three integers.

use serde::{Deserialize, Serialize};

/// Position of a node in its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeBounds {
    /// Left boundary, >= 1
    pub left: u64,
    /// Right boundary, > left
    pub right: u64,
    /// Number of ancestors; 0 for the root
    pub depth: u32,
}

impl NodeBounds {
    pub fn new(left: u64, right: u64, depth: u32) -> Self {
        Self { left, right, depth }
    }

    /// Bounds of a freshly created root.
    pub fn root() -> Self {
        Self::new(1, 2, 0)
    }

    /// Bounds of a leaf occupying `position` and `position + 1`.
    pub fn leaf_at(position: u64, depth: u32) -> Self {
        Self::new(position, position + 1, depth)
    }

    pub fn is_root(&self) -> bool {
        self.left == 1
    }

    pub fn is_leaf(&self) -> bool {
        self.right == self.left + 1
    }

    /// Number of positions the subtree occupies (always even).
    pub fn width(&self) -> u64 {
        self.right - self.left + 1
    }

    /// Number of strict descendants implied by the range.
    pub fn descendant_count(&self) -> u64 {
        (self.right - self.left - 1) / 2
    }

    /// Strict containment: `other` is a descendant of `self`.
    pub fn contains(&self, other: &NodeBounds) -> bool {
        self.left < other.left && self.right > other.right
    }

    /// Whether `position` falls inside `[left, right]`.
    pub fn spans(&self, position: u64) -> bool {
        self.left <= position && position <= self.right
    }

    pub fn is_disjoint(&self, other: &NodeBounds) -> bool {
        self.right < other.left || other.right < self.left
    }

    /// Ranges intersect without one containing the other.
    pub fn partially_overlaps(&self, other: &NodeBounds) -> bool {
        !self.is_disjoint(other) && !self.contains(other) && !other.contains(self) && self != other
    }

    /// Local well-formedness: `left >= 1`, `right > left` and an odd span.
    pub fn is_well_formed(&self) -> bool {
        self.left >= 1 && self.right > self.left && (self.right - self.left) % 2 == 1
    }
}

/// Apply a signed offset to a position; `None` on underflow or overflow.
pub fn shift_position(position: u64, delta: i64) -> Option<u64> {
    position.checked_add_signed(delta)
}

/// Apply a signed offset to a depth; `None` on underflow or overflow.
pub fn shift_depth(depth: u32, delta: i64) -> Option<u32> {
    let delta = i32::try_from(delta).ok()?;
    depth.checked_add_signed(delta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_bounds() {
        let root = NodeBounds::root();
        assert_eq!(root, NodeBounds::new(1, 2, 0));
        assert!(root.is_root());
        assert!(root.is_leaf());
    }

    #[test]
    fn test_leaf_is_a_comparison() {
        let leaf = NodeBounds::new(2, 3, 1);
        assert!(leaf.is_leaf());
        assert!(!leaf.is_root());

        let inner = NodeBounds::new(1, 6, 0);
        assert!(!inner.is_leaf());
        // Asking must not change anything.
        assert_eq!(inner, NodeBounds::new(1, 6, 0));
    }

    #[test]
    fn test_descendant_count() {
        assert_eq!(NodeBounds::new(1, 2, 0).descendant_count(), 0);
        assert_eq!(NodeBounds::new(1, 8, 0).descendant_count(), 3);
        assert_eq!(NodeBounds::new(1, 8, 0).width(), 8);
    }

    #[test]
    fn test_containment_and_overlap() {
        let root = NodeBounds::new(1, 8, 0);
        let a = NodeBounds::new(2, 3, 1);
        let b = NodeBounds::new(4, 7, 1);
        assert!(root.contains(&a));
        assert!(!a.contains(&root));
        assert!(a.is_disjoint(&b));
        assert!(!root.partially_overlaps(&b));
        assert!(NodeBounds::new(2, 5, 1).partially_overlaps(&NodeBounds::new(4, 7, 1)));
    }

    #[test]
    fn test_well_formed() {
        assert!(NodeBounds::new(1, 4, 0).is_well_formed());
        assert!(!NodeBounds::new(0, 1, 0).is_well_formed());
        assert!(!NodeBounds::new(3, 3, 0).is_well_formed());
        assert!(!NodeBounds::new(1, 3, 0).is_well_formed());
    }

    #[test]
    fn test_checked_shifts() {
        assert_eq!(shift_position(4, 2), Some(6));
        assert_eq!(shift_position(4, -4), Some(0));
        assert_eq!(shift_position(1, -2), None);
        assert_eq!(shift_depth(2, -1), Some(1));
        assert_eq!(shift_depth(0, -1), None);
    }
}
