//! Mutation engine
//!
//! Every mutation follows the same sequence:
//!
//! 1. Read the scope revision
//! 2. Read the minimal set of rows the shift depends on
//! 3. Plan the shift (pure, see `shift`)
//! 4. Commit one batch that expects the revision from step 1
//!
//! Validation failures surface before step 4, so a rejected mutation never
//! writes. If another commit lands between steps 1 and 4 the store rejects
//! the batch and the caller gets `Conflict`.

use crate::errors::{TreeError, TreeResult};
use crate::node::{NodeBounds, NodeId, TreeId, TreeNode};
use crate::query::QueryEngine;
use crate::store::{Revision, RowStore, WriteBatch};

use super::shift::{
    close_gap_predicate, last_child_predicate, left_phase_predicate, plan_close_gap,
    plan_last_child, plan_move, plan_open_gap, right_phase_predicate, Relocation, LEAF_WIDTH,
};

/// Result of a committed mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationReceipt {
    /// The placed, moved or removed node, as of the commit
    pub node: TreeNode,
    /// Scope revision after the commit
    pub revision: Revision,
    /// Rows inserted, updated or deleted
    pub rows_written: usize,
}

/// Where a new sibling goes relative to its reference node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SiblingSide {
    Next,
    Prev,
}

/// Writes to one scope through an explicit store handle.
pub struct MutationEngine<'a, S: RowStore + ?Sized> {
    store: &'a S,
    tree: &'a TreeId,
}

impl<'a, S: RowStore + ?Sized> MutationEngine<'a, S> {
    pub fn new(store: &'a S, tree: &'a TreeId) -> Self {
        Self { store, tree }
    }

    fn query(&self) -> QueryEngine<'a, S> {
        QueryEngine::new(self.store, self.tree)
    }

    fn commit(&self, batch: WriteBatch, node: TreeNode) -> TreeResult<MutationReceipt> {
        let rows_written = batch.len();
        let revision = self.store.batch_update(&batch)?;
        Ok(MutationReceipt {
            node,
            revision,
            rows_written,
        })
    }

    fn ensure_absent(&self, id: &NodeId) -> TreeResult<()> {
        if self.query().find(id)?.is_some() {
            return Err(TreeError::invalid_state(format!(
                "node {} is already placed in tree {}",
                id, self.tree
            )));
        }
        Ok(())
    }

    /// Place `id` as the root of an empty scope.
    ///
    /// A scope holds a single tree; a second root is `InvalidState`.
    pub fn create_root(&self, id: NodeId) -> TreeResult<MutationReceipt> {
        let revision = self.store.revision(self.tree)?;
        self.ensure_absent(&id)?;

        if let Some(root) = self.query().root()? {
            return Err(TreeError::invalid_state(format!(
                "tree {} already has root {}",
                self.tree, root.id
            )));
        }

        let node = TreeNode::new(id, NodeBounds::root());
        let mut batch = WriteBatch::new(self.tree.clone(), revision);
        batch.insert(node.clone());
        self.commit(batch, node)
    }

    /// Place `id` as the last child of `parent_id`.
    pub fn insert_last_child_of(&self, id: NodeId, parent_id: &NodeId) -> TreeResult<MutationReceipt> {
        let revision = self.store.revision(self.tree)?;
        let parent = self.query().node(parent_id)?;
        self.ensure_absent(&id)?;

        let candidates = self.query().find_many(&last_child_predicate(&parent.bounds))?;
        let writes = plan_last_child(&parent.bounds, &candidates)?;

        let node = TreeNode::new(
            id,
            NodeBounds::leaf_at(parent.right(), parent.depth() + 1),
        );
        let mut batch = WriteBatch::new(self.tree.clone(), revision);
        batch.extend(writes);
        batch.insert(node.clone());
        self.commit(batch, node)
    }

    /// Place `id` right after `target_id`, at the same depth.
    pub fn insert_next_sibling_of(&self, id: NodeId, target_id: &NodeId) -> TreeResult<MutationReceipt> {
        self.insert_sibling(id, target_id, SiblingSide::Next)
    }

    /// Place `id` right before `target_id`, at the same depth.
    pub fn insert_prev_sibling_of(&self, id: NodeId, target_id: &NodeId) -> TreeResult<MutationReceipt> {
        self.insert_sibling(id, target_id, SiblingSide::Prev)
    }

    fn insert_sibling(&self, id: NodeId, target_id: &NodeId, side: SiblingSide) -> TreeResult<MutationReceipt> {
        let revision = self.store.revision(self.tree)?;
        let target = self.query().node(target_id)?;
        self.ensure_absent(&id)?;

        if target.is_root() {
            return Err(TreeError::invalid_state(format!(
                "cannot place a sibling next to root {}",
                target.id
            )));
        }
        let root = self.query().root()?.ok_or_else(|| {
            TreeError::invalid_state(format!("tree {} has nodes but no root", self.tree))
        })?;

        let point = match side {
            SiblingSide::Next => target.right() + 1,
            SiblingSide::Prev => target.left(),
        };

        let left_phase = self.query().find_many(&left_phase_predicate(point, &root.bounds))?;
        let right_phase = self.query().find_many(&right_phase_predicate(point, &root.bounds))?;
        let writes = plan_open_gap(LEAF_WIDTH, &left_phase, &right_phase)?;

        let node = TreeNode::new(id, NodeBounds::leaf_at(point, target.depth()));
        let mut batch = WriteBatch::new(self.tree.clone(), revision);
        batch.extend(writes);
        batch.insert(node.clone());
        self.commit(batch, node)
    }

    /// Relocate the subtree rooted at `node_id` to become the last child of
    /// `new_parent_id`.
    ///
    /// The subtree keeps its internal shape; every row in it changes depth by
    /// the same amount. Fails with `InvalidState` before any write when the
    /// move would create a cycle or targets the root.
    pub fn move_as_child_of(&self, node_id: &NodeId, new_parent_id: &NodeId) -> TreeResult<MutationReceipt> {
        let revision = self.store.revision(self.tree)?;
        let node = self.query().node(node_id)?;
        let new_parent = self.query().node(new_parent_id)?;

        if node.id == new_parent.id {
            return Err(TreeError::invalid_state(format!(
                "cannot move {} under itself",
                node.id
            )));
        }
        if node.bounds.contains(&new_parent.bounds) {
            return Err(TreeError::invalid_state(format!(
                "cannot move {} under its descendant {}",
                node.id, new_parent.id
            )));
        }
        if node.is_root() {
            return Err(TreeError::invalid_state(format!(
                "cannot move root {}",
                node.id
            )));
        }

        let relocation = Relocation::as_last_child(node.bounds, &new_parent.bounds);
        let candidates = self.query().find_many(&relocation.window_predicate())?;
        let writes = plan_move(&relocation, &candidates)?;
        let placed = TreeNode::new(node.id, relocation.destination()?);

        let mut batch = WriteBatch::new(self.tree.clone(), revision);
        batch.extend(writes);
        self.commit(batch, placed)
    }

    /// Delete the subtree rooted at `node_id` and close the gap it leaves.
    ///
    /// Removing the root empties the scope.
    pub fn remove_subtree(&self, node_id: &NodeId) -> TreeResult<MutationReceipt> {
        let revision = self.store.revision(self.tree)?;
        let node = self.query().node(node_id)?;

        let mut batch = WriteBatch::new(self.tree.clone(), revision);
        for doomed in self.query().descendants_of(&node)? {
            batch.delete(doomed.id);
        }
        batch.delete(node.id.clone());

        let candidates = self.query().find_many(&close_gap_predicate(&node.bounds))?;
        batch.extend(plan_close_gap(&node.bounds, &candidates)?);

        self.commit(batch, node)
    }
}
