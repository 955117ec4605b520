//! Shift planning
//!
//! Pure functions from "rows read" to "row changes". No I/O happens here;
//! the engine reads the candidate rows, hands them to a planner and commits
//! the returned writes as one batch.
//!
//! Every planner preserves the invariants of the scope as long as the
//! candidate set it is given is complete for its read predicate.

use std::collections::HashMap;

use crate::errors::{TreeError, TreeResult};
use crate::node::{shift_depth, shift_position, NodeBounds, NodeId, TreeNode};
use crate::store::{FieldChanges, RangePredicate, RowWrite};

/// Positions taken by a new leaf
pub const LEAF_WIDTH: u64 = 2;

fn offset(position: u64, delta: i64) -> TreeResult<u64> {
    shift_position(position, delta).ok_or_else(|| {
        TreeError::invalid_state(format!(
            "shifting position {} by {} leaves the valid range",
            position, delta
        ))
    })
}

fn update(node: &TreeNode, to: NodeBounds) -> Option<RowWrite> {
    let changes = FieldChanges::between(&node.bounds, &to);
    (!changes.is_empty()).then(|| RowWrite::Update {
        id: node.id.clone(),
        changes,
    })
}

/// Rows a last-child insertion under `parent` may touch
pub fn last_child_predicate(parent: &NodeBounds) -> RangePredicate {
    RangePredicate::all().right_gte(parent.right)
}

/// Open a gap at `parent.right` for a new last child.
///
/// - `left > parent.right`: both boundaries move by +2
/// - `right >= parent.right AND left < parent.right` (the parent and its
///   ancestors): `right` moves by +2
pub fn plan_last_child(parent: &NodeBounds, candidates: &[TreeNode]) -> TreeResult<Vec<RowWrite>> {
    let step = LEAF_WIDTH as i64;
    let mut writes = Vec::new();

    for node in candidates {
        let to = if node.left() > parent.right {
            NodeBounds {
                left: offset(node.left(), step)?,
                right: offset(node.right(), step)?,
                ..node.bounds
            }
        } else if node.right() >= parent.right && node.left() < parent.right {
            NodeBounds {
                right: offset(node.right(), step)?,
                ..node.bounds
            }
        } else {
            continue;
        };
        writes.extend(update(node, to));
    }

    Ok(writes)
}

/// Rows whose `left` moves when a gap opens at `point` inside `root`
pub fn left_phase_predicate(point: u64, root: &NodeBounds) -> RangePredicate {
    RangePredicate::all()
        .left_gte(point)
        .right_lte(root.right)
}

/// Rows whose `right` moves when a gap opens at `point` inside `root`
pub fn right_phase_predicate(point: u64, root: &NodeBounds) -> RangePredicate {
    RangePredicate::all()
        .right_gte(point)
        .right_lte(root.right)
        .left_gte(root.left)
}

/// Open a gap of `width` positions at `point`, bounded by the root's range.
///
/// Phase one moves `left` of every row in `left_phase`, phase two moves
/// `right` of every row in `right_phase`. A row present in both gets one
/// update carrying both fields.
pub fn plan_open_gap(
    width: u64,
    left_phase: &[TreeNode],
    right_phase: &[TreeNode],
) -> TreeResult<Vec<RowWrite>> {
    let step = width as i64;
    let mut order: Vec<&NodeId> = Vec::new();
    let mut changes: HashMap<&NodeId, FieldChanges> = HashMap::new();

    for node in left_phase {
        let entry = changes.entry(&node.id).or_insert_with(|| {
            order.push(&node.id);
            FieldChanges::default()
        });
        entry.merge(FieldChanges::left(offset(node.left(), step)?));
    }
    for node in right_phase {
        let entry = changes.entry(&node.id).or_insert_with(|| {
            order.push(&node.id);
            FieldChanges::default()
        });
        entry.merge(FieldChanges::right(offset(node.right(), step)?));
    }

    Ok(order
        .into_iter()
        .filter_map(|id| {
            let changes = changes.remove(id)?;
            Some(RowWrite::Update {
                id: id.clone(),
                changes,
            })
        })
        .collect())
}

/// Rows a removal of `removed` may touch: everything ending after it
pub fn close_gap_predicate(removed: &NodeBounds) -> RangePredicate {
    RangePredicate::all().right_gt(removed.right)
}

/// Close the gap left by deleting the subtree `removed`.
///
/// Mirror image of insertion:
/// - `left > removed.right`: both boundaries move by `-width`
/// - ancestors (`left < removed.left AND right > removed.right`): `right`
///   moves by `-width`
///
/// Rows inside `removed` are ignored; the caller deletes them.
pub fn plan_close_gap(removed: &NodeBounds, candidates: &[TreeNode]) -> TreeResult<Vec<RowWrite>> {
    let step = -(removed.width() as i64);
    let mut writes = Vec::new();

    for node in candidates {
        let to = if node.left() > removed.right {
            NodeBounds {
                left: offset(node.left(), step)?,
                right: offset(node.right(), step)?,
                ..node.bounds
            }
        } else if node.left() < removed.left && node.right() > removed.right {
            NodeBounds {
                right: offset(node.right(), step)?,
                ..node.bounds
            }
        } else {
            continue;
        };
        writes.extend(update(node, to));
    }

    Ok(writes)
}

/// Relocation of a subtree to a new slot.
///
/// `target` is the position the subtree's left boundary takes before the
/// vacated range is closed (for "last child of P" it is `P.right`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    pub subtree: NodeBounds,
    pub target: u64,
    pub depth_delta: i64,
}

impl Relocation {
    /// Move `subtree` to become the last child of `new_parent`.
    pub fn as_last_child(subtree: NodeBounds, new_parent: &NodeBounds) -> Self {
        Self {
            subtree,
            target: new_parent.right,
            depth_delta: i64::from(new_parent.depth) + 1 - i64::from(subtree.depth),
        }
    }

    /// Rows with at least one boundary in the affected window
    pub fn window_predicate(&self) -> RangePredicate {
        let (low, high) = self.window();
        RangePredicate::all().right_gte(low).left_lte(high)
    }

    /// Bounds of the subtree root once the move is applied
    pub fn destination(&self) -> TreeResult<NodeBounds> {
        let depth = shift_depth(self.subtree.depth, self.depth_delta).ok_or_else(|| {
            TreeError::invalid_state(format!(
                "depth {} cannot move by {}",
                self.subtree.depth, self.depth_delta
            ))
        })?;
        Ok(NodeBounds {
            left: self.remap(self.subtree.left)?,
            right: self.remap(self.subtree.right)?,
            depth,
        })
    }

    fn window(&self) -> (u64, u64) {
        let s = &self.subtree;
        if self.target > s.right {
            (s.left, self.target - 1)
        } else {
            (self.target, s.right)
        }
    }

    /// Where `position` ends up after the move.
    ///
    /// Moving right, positions between the subtree and the target slide left
    /// by its width; moving left, positions between the target and the
    /// subtree slide right by its width. The subtree itself moves as a block.
    fn remap(&self, position: u64) -> TreeResult<u64> {
        let s = &self.subtree;
        let width = s.width() as i64;

        if s.spans(position) {
            let delta = if self.target > s.right {
                self.target as i64 - 1 - s.right as i64
            } else {
                self.target as i64 - s.left as i64
            };
            return offset(position, delta);
        }
        if self.target > s.right && position > s.right && position < self.target {
            return offset(position, -width);
        }
        if self.target < s.left && position >= self.target && position < s.left {
            return offset(position, width);
        }
        Ok(position)
    }
}

/// Close the vacated range and open the destination range in one pass.
///
/// `candidates` must contain every row with a boundary inside the window
/// (see `Relocation::window_predicate`), which includes the whole subtree.
pub fn plan_move(relocation: &Relocation, candidates: &[TreeNode]) -> TreeResult<Vec<RowWrite>> {
    let s = &relocation.subtree;
    if s.spans(relocation.target) {
        return Err(TreeError::invalid_state(format!(
            "target position {} lies inside the moved range [{}, {}]",
            relocation.target, s.left, s.right
        )));
    }

    let mut writes = Vec::new();
    for node in candidates {
        let in_subtree = s.spans(node.left());
        let depth = if in_subtree {
            shift_depth(node.depth(), relocation.depth_delta).ok_or_else(|| {
                TreeError::invalid_state(format!(
                    "depth of {} cannot move by {}",
                    node.id, relocation.depth_delta
                ))
            })?
        } else {
            node.depth()
        };
        let to = NodeBounds {
            left: relocation.remap(node.left())?,
            right: relocation.remap(node.right())?,
            depth,
        };
        writes.extend(update(node, to));
    }

    Ok(writes)
}
