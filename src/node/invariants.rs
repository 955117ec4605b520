//! Structural invariant checker
//!
//! Verifies a whole scope in a single pass over the nodes sorted by `left`,
//! keeping a stack of the ranges that are still open:
//!
//! 1. `right > left` for every node (and `left >= 1`)
//! 2. Ranges are disjoint or strictly nested, never partially overlapping
//! 3. `right - left - 1 == 2 * descendants`
//! 4. `depth` equals the number of enclosing ranges
//! 5. The root has `left == 1`, and a non-empty scope has exactly one root
//!
//! Positions must also cover `1..=2n` exactly once, which is what makes the
//! encoding gap-free after every committed mutation.

use thiserror::Error;

use super::ids::NodeId;
use super::record::TreeNode;

/// A violated structural invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("node {id} has an empty or inverted range [{left}, {right}]")]
    EmptyRange { id: NodeId, left: u64, right: u64 },

    #[error("node {id} has left boundary {left} below 1")]
    LeftBelowOne { id: NodeId, left: u64 },

    #[error("position {position} is used more than once")]
    DuplicatePosition { position: u64 },

    #[error("positions are not contiguous: expected {expected}, found {found}")]
    PositionGap { expected: u64, found: u64 },

    #[error("ranges of {outer} and {inner} partially overlap")]
    PartialOverlap { outer: NodeId, inner: NodeId },

    #[error("node {id} spans {expected} descendants but has {actual}")]
    DescendantMismatch { id: NodeId, expected: u64, actual: u64 },

    #[error("node {id} has depth {actual} but {expected} ancestors")]
    DepthMismatch { id: NodeId, expected: u32, actual: u32 },

    #[error("root {id} starts at {left}, not 1")]
    RootNotAtOne { id: NodeId, left: u64 },

    #[error("scope has more than one root: {first} and {second}")]
    MultipleRoots { first: NodeId, second: NodeId },
}

impl InvariantViolation {
    /// Stable code for this violation
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyRange { .. } => "NEST_INVARIANT_EMPTY_RANGE",
            Self::LeftBelowOne { .. } => "NEST_INVARIANT_LEFT_BELOW_ONE",
            Self::DuplicatePosition { .. } => "NEST_INVARIANT_DUPLICATE_POSITION",
            Self::PositionGap { .. } => "NEST_INVARIANT_POSITION_GAP",
            Self::PartialOverlap { .. } => "NEST_INVARIANT_PARTIAL_OVERLAP",
            Self::DescendantMismatch { .. } => "NEST_INVARIANT_DESCENDANT_MISMATCH",
            Self::DepthMismatch { .. } => "NEST_INVARIANT_DEPTH_MISMATCH",
            Self::RootNotAtOne { .. } => "NEST_INVARIANT_ROOT_NOT_AT_ONE",
            Self::MultipleRoots { .. } => "NEST_INVARIANT_MULTIPLE_ROOTS",
        }
    }
}

/// Checks a full scope against the nested-set invariants.
pub struct InvariantChecker;

/// An open range on the ancestor stack.
struct Open<'a> {
    node: &'a TreeNode,
    descendants: u64,
}

impl InvariantChecker {
    /// Check every invariant, returning the first violation found.
    ///
    /// The input does not need to be sorted.
    pub fn check(nodes: &[TreeNode]) -> Result<(), InvariantViolation> {
        let mut sorted: Vec<&TreeNode> = nodes.iter().collect();
        sorted.sort_by_key(|n| n.left());

        for node in &sorted {
            Self::check_local(node)?;
        }
        Self::check_positions(&sorted)?;
        Self::check_nesting(&sorted)
    }

    fn check_local(node: &TreeNode) -> Result<(), InvariantViolation> {
        if node.left() < 1 {
            return Err(InvariantViolation::LeftBelowOne {
                id: node.id.clone(),
                left: node.left(),
            });
        }
        if node.right() <= node.left() {
            return Err(InvariantViolation::EmptyRange {
                id: node.id.clone(),
                left: node.left(),
                right: node.right(),
            });
        }
        Ok(())
    }

    fn check_positions(sorted: &[&TreeNode]) -> Result<(), InvariantViolation> {
        let mut positions: Vec<u64> = sorted
            .iter()
            .flat_map(|n| [n.left(), n.right()])
            .collect();
        positions.sort_unstable();

        for (i, position) in positions.iter().enumerate() {
            if i > 0 && positions[i - 1] == *position {
                return Err(InvariantViolation::DuplicatePosition {
                    position: *position,
                });
            }
            let expected = i as u64 + 1;
            if *position != expected {
                return Err(InvariantViolation::PositionGap {
                    expected,
                    found: *position,
                });
            }
        }
        Ok(())
    }

    fn check_nesting(sorted: &[&TreeNode]) -> Result<(), InvariantViolation> {
        let mut stack: Vec<Open<'_>> = Vec::new();
        let mut root: Option<&TreeNode> = None;

        for &node in sorted {
            while let Some(top) = stack.last() {
                if top.node.right() < node.left() {
                    Self::close(&mut stack)?;
                } else {
                    break;
                }
            }

            if let Some(top) = stack.last() {
                if top.node.right() <= node.right() {
                    return Err(InvariantViolation::PartialOverlap {
                        outer: top.node.id.clone(),
                        inner: node.id.clone(),
                    });
                }
            } else {
                if let Some(first) = root {
                    return Err(InvariantViolation::MultipleRoots {
                        first: first.id.clone(),
                        second: node.id.clone(),
                    });
                }
                if node.left() != 1 {
                    return Err(InvariantViolation::RootNotAtOne {
                        id: node.id.clone(),
                        left: node.left(),
                    });
                }
                root = Some(node);
            }

            let expected_depth = stack.len() as u32;
            if node.depth() != expected_depth {
                return Err(InvariantViolation::DepthMismatch {
                    id: node.id.clone(),
                    expected: expected_depth,
                    actual: node.depth(),
                });
            }

            stack.push(Open {
                node,
                descendants: 0,
            });
        }

        while !stack.is_empty() {
            Self::close(&mut stack)?;
        }
        Ok(())
    }

    /// Pop the top range and verify its descendant count.
    fn close(stack: &mut Vec<Open<'_>>) -> Result<(), InvariantViolation> {
        let Some(open) = stack.pop() else {
            return Ok(());
        };
        let span = open.node.right() - open.node.left() - 1;
        if span != 2 * open.descendants {
            return Err(InvariantViolation::DescendantMismatch {
                id: open.node.id.clone(),
                expected: span / 2,
                actual: open.descendants,
            });
        }
        if let Some(parent) = stack.last_mut() {
            parent.descendants += open.descendants + 1;
        }
        Ok(())
    }
}
