//! Query engine
//!
//! Answers structural questions with range reads. Read-only; every method
//! issues one `find_many` or `get` against the row store it was given.

use crate::errors::{TreeError, TreeResult};
use crate::node::{NodeId, NodeKey, TreeId, TreeNode};
use crate::store::{RangePredicate, RowStore};

use super::filter::{
    ancestors_predicate, children_predicate, descendants_predicate, next_sibling_predicate,
    parent_predicate, prev_sibling_predicate, weight_predicate, NodeFilter,
};

/// Read-only view of one scope through an explicit store handle.
pub struct QueryEngine<'a, S: RowStore + ?Sized> {
    store: &'a S,
    tree: &'a TreeId,
}

impl<'a, S: RowStore + ?Sized> QueryEngine<'a, S> {
    pub fn new(store: &'a S, tree: &'a TreeId) -> Self {
        Self { store, tree }
    }

    pub fn tree(&self) -> &TreeId {
        self.tree
    }

    /// Lookup by id; `None` if absent
    pub fn find(&self, id: &NodeId) -> TreeResult<Option<TreeNode>> {
        let key = NodeKey::new(self.tree.clone(), id.clone());
        Ok(self.store.get(&key)?)
    }

    /// Lookup by id; `NotFound` if absent
    pub fn node(&self, id: &NodeId) -> TreeResult<TreeNode> {
        self.find(id)?
            .ok_or_else(|| TreeError::not_found(self.tree, id))
    }

    /// Rows matching `predicate`, ordered by `left`
    pub fn find_many(&self, predicate: &RangePredicate) -> TreeResult<Vec<TreeNode>> {
        Ok(self.store.find_many(self.tree, predicate)?)
    }

    /// Whole scope in preorder
    pub fn nodes(&self) -> TreeResult<Vec<TreeNode>> {
        self.find_many(&RangePredicate::all())
    }

    pub fn is_root(&self, node: &TreeNode) -> bool {
        node.is_root()
    }

    pub fn is_leaf(&self, node: &TreeNode) -> bool {
        node.is_leaf()
    }

    /// The scope's root, `None` for an empty scope
    pub fn root(&self) -> TreeResult<Option<TreeNode>> {
        let roots = self.find_many(&RangePredicate::all().depth_eq(0).left_eq(1))?;
        Ok(roots.into_iter().next())
    }

    /// The node whose range directly encloses `node`; `None` for the root.
    pub fn parent_of(&self, node: &TreeNode) -> TreeResult<Option<TreeNode>> {
        if node.is_root() {
            return Ok(None);
        }
        let mut parents = self.find_many(&parent_predicate(&node.bounds))?;
        match parents.len() {
            1 => Ok(parents.pop()),
            0 => Err(TreeError::invalid_state(format!(
                "node {} at depth {} has no parent",
                node.id,
                node.depth()
            ))),
            n => Err(TreeError::invalid_state(format!(
                "node {} has {} candidate parents",
                node.id, n
            ))),
        }
    }

    pub fn parent_id_of(&self, node: &TreeNode) -> TreeResult<Option<NodeId>> {
        Ok(self.parent_of(node)?.map(|parent| parent.id))
    }

    /// Direct children, in order
    pub fn children_of(&self, node: &TreeNode) -> TreeResult<Vec<TreeNode>> {
        if node.is_leaf() {
            return Ok(Vec::new());
        }
        self.find_many(&children_predicate(&node.bounds))
    }

    /// Number of direct children (not all descendants)
    pub fn children_count_of(&self, node: &TreeNode) -> TreeResult<usize> {
        Ok(self.children_of(node)?.len())
    }

    /// Strict ancestors, root first
    pub fn ancestors_of(&self, node: &TreeNode) -> TreeResult<Vec<TreeNode>> {
        self.find_many(&ancestors_predicate(&node.bounds))
    }

    /// Strict descendants in preorder
    pub fn descendants_of(&self, node: &TreeNode) -> TreeResult<Vec<TreeNode>> {
        if node.is_leaf() {
            return Ok(Vec::new());
        }
        self.find_many(&descendants_predicate(&node.bounds))
    }

    pub fn prev_sibling_of(&self, node: &TreeNode) -> TreeResult<Option<TreeNode>> {
        let siblings = self.find_many(&prev_sibling_predicate(&node.bounds))?;
        Ok(siblings.into_iter().next())
    }

    pub fn next_sibling_of(&self, node: &TreeNode) -> TreeResult<Option<TreeNode>> {
        let siblings = self.find_many(&next_sibling_predicate(&node.bounds))?;
        Ok(siblings.into_iter().next())
    }

    /// Number of nodes at `depth` overlapping `node`'s range
    pub fn weight_at(&self, node: &TreeNode, depth: u32) -> TreeResult<usize> {
        Ok(self.find_many(&weight_predicate(&node.bounds, depth))?.len())
    }

    /// Predicate selecting the previous sibling of `id`
    pub fn prev_sibling_filter(&self, id: &NodeId) -> TreeResult<RangePredicate> {
        Ok(prev_sibling_predicate(&self.node(id)?.bounds))
    }

    /// Predicate selecting the next sibling of `id`
    pub fn next_sibling_filter(&self, id: &NodeId) -> TreeResult<RangePredicate> {
        Ok(next_sibling_predicate(&self.node(id)?.bounds))
    }

    /// Predicate selecting the direct children of `id`
    pub fn child_of_filter(&self, id: &NodeId) -> TreeResult<RangePredicate> {
        Ok(children_predicate(&self.node(id)?.bounds))
    }

    /// Predicate selecting the parent of `id`
    pub fn parent_of_filter(&self, id: &NodeId) -> TreeResult<RangePredicate> {
        Ok(parent_predicate(&self.node(id)?.bounds))
    }

    /// Resolve every relation in `filter` into one conjunction.
    pub fn filter_by(&self, filter: &NodeFilter) -> TreeResult<RangePredicate> {
        let mut predicate = RangePredicate::all();
        if let Some(id) = &filter.prev_sibling_id {
            predicate = predicate.and(self.prev_sibling_filter(id)?);
        }
        if let Some(id) = &filter.next_sibling_id {
            predicate = predicate.and(self.next_sibling_filter(id)?);
        }
        if let Some(id) = &filter.parent_of {
            predicate = predicate.and(self.parent_of_filter(id)?);
        }
        if let Some(id) = &filter.child_of {
            predicate = predicate.and(self.child_of_filter(id)?);
        }
        Ok(predicate)
    }
}
