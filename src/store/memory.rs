//! In-memory row store
//!
//! Each scope keeps its rows plus an ordered `left -> id` index so that
//! left-bounded predicates scan only the matching window. A batch is staged
//! on a copy of the scope and swapped in under the write lock, so readers
//! never see a half-applied shift.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::node::{NodeBounds, NodeId, NodeKey, TreeId, TreeNode};

use super::backend::RowStore;
use super::batch::{Revision, RowWrite, WriteBatch};
use super::errors::{StoreError, StoreResult};
use super::predicate::RangePredicate;

/// Rows of one scope
#[derive(Debug, Clone, Default)]
pub(crate) struct ScopeState {
    revision: Revision,
    rows: HashMap<NodeId, NodeBounds>,
    /// `left` values are unique within a scope
    by_left: BTreeMap<u64, NodeId>,
}

impl ScopeState {
    fn get(&self, id: &NodeId) -> Option<TreeNode> {
        self.rows
            .get(id)
            .map(|bounds| TreeNode::new(id.clone(), *bounds))
    }

    fn find(&self, predicate: &RangePredicate) -> Vec<TreeNode> {
        let Some(window) = predicate.left_window() else {
            return Vec::new();
        };
        self.by_left
            .range(window)
            .filter_map(|(_, id)| {
                let bounds = self.rows.get(id)?;
                predicate
                    .matches(bounds)
                    .then(|| TreeNode::new(id.clone(), *bounds))
            })
            .collect()
    }

    /// Apply `batch` to a copy of this scope.
    ///
    /// Fails without side effects on a revision mismatch, a write against a
    /// missing row, an insert of an existing row, or two rows claiming the
    /// same `left`.
    fn stage(&self, tree: &TreeId, batch: &WriteBatch) -> StoreResult<ScopeState> {
        if batch.expected_revision() != self.revision {
            return Err(StoreError::conflict(
                tree,
                batch.expected_revision(),
                self.revision,
            ));
        }

        let mut next = self.clone();
        let mut touched: HashSet<&NodeId> = HashSet::new();

        for write in batch.writes() {
            match write {
                RowWrite::Insert { node } => {
                    if next.rows.contains_key(&node.id) {
                        return Err(StoreError::rejected(
                            tree,
                            format!("node {} already exists", node.id),
                        ));
                    }
                    next.rows.insert(node.id.clone(), node.bounds);
                }
                RowWrite::Update { id, changes } => {
                    let bounds = next.rows.get_mut(id).ok_or_else(|| {
                        StoreError::rejected(tree, format!("update of unknown node {}", id))
                    })?;
                    *bounds = changes.apply(bounds);
                }
                RowWrite::Delete { id } => {
                    next.rows.remove(id).ok_or_else(|| {
                        StoreError::rejected(tree, format!("delete of unknown node {}", id))
                    })?;
                }
            }
            touched.insert(write.id());
        }

        // Drop stale index entries first; shifted rows may take over each other's slots.
        for id in &touched {
            if let Some(old) = self.rows.get(*id) {
                if next.by_left.get(&old.left) == Some(*id) {
                    next.by_left.remove(&old.left);
                }
            }
        }
        for id in &touched {
            if let Some(bounds) = next.rows.get(*id) {
                if let Some(previous) = next.by_left.insert(bounds.left, (*id).clone()) {
                    if &previous != *id {
                        return Err(StoreError::rejected(
                            tree,
                            format!(
                                "left {} claimed by both {} and {}",
                                bounds.left, previous, id
                            ),
                        ));
                    }
                }
            }
        }

        next.revision += 1;
        Ok(next)
    }
}

/// Thread-safe in-memory row store
#[derive(Debug, Default)]
pub struct MemoryRowStore {
    scopes: RwLock<HashMap<TreeId, ScopeState>>,
}

impl MemoryRowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of every scope that has been written to, sorted
    pub fn trees(&self) -> StoreResult<Vec<TreeId>> {
        let scopes = self.read()?;
        let mut trees: Vec<TreeId> = scopes.keys().cloned().collect();
        trees.sort();
        Ok(trees)
    }

    /// Number of rows in `tree`
    pub fn len(&self, tree: &TreeId) -> StoreResult<usize> {
        let scopes = self.read()?;
        Ok(scopes.get(tree).map(|s| s.rows.len()).unwrap_or(0))
    }

    /// Stage `batch`, run `before_install` with the new revision while the
    /// write lock is held, then make the staged scope visible.
    ///
    /// If `before_install` fails nothing becomes visible.
    pub(crate) fn commit_with<F>(&self, batch: &WriteBatch, before_install: F) -> StoreResult<Revision>
    where
        F: FnOnce(Revision) -> StoreResult<()>,
    {
        let mut scopes = self.write()?;
        let staged = match scopes.get(batch.tree()) {
            Some(scope) => scope.stage(batch.tree(), batch)?,
            None => ScopeState::default().stage(batch.tree(), batch)?,
        };
        let revision = staged.revision;

        before_install(revision)?;

        scopes.insert(batch.tree().clone(), staged);
        Ok(revision)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<TreeId, ScopeState>>> {
        self.scopes
            .read()
            .map_err(|_| StoreError::Poisoned("scope table".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<TreeId, ScopeState>>> {
        self.scopes
            .write()
            .map_err(|_| StoreError::Poisoned("scope table".to_string()))
    }
}

impl RowStore for MemoryRowStore {
    fn get(&self, key: &NodeKey) -> StoreResult<Option<TreeNode>> {
        let scopes = self.read()?;
        Ok(scopes.get(&key.tree).and_then(|s| s.get(&key.node)))
    }

    fn find_many(&self, tree: &TreeId, predicate: &RangePredicate) -> StoreResult<Vec<TreeNode>> {
        let scopes = self.read()?;
        Ok(scopes
            .get(tree)
            .map(|s| s.find(predicate))
            .unwrap_or_default())
    }

    fn revision(&self, tree: &TreeId) -> StoreResult<Revision> {
        let scopes = self.read()?;
        Ok(scopes.get(tree).map(|s| s.revision).unwrap_or(0))
    }

    fn batch_update(&self, batch: &WriteBatch) -> StoreResult<Revision> {
        self.commit_with(batch, |_| Ok(()))
    }
}
