//! # Row Store Trait
//!
//! The only I/O boundary the engine consumes.

use crate::node::{NodeKey, TreeId, TreeNode};

use super::batch::{Revision, WriteBatch};
use super::errors::StoreResult;
use super::predicate::RangePredicate;

/// Keyed node storage with range reads and atomic batches.
///
/// Implementations must apply a batch all-or-nothing and must reject it with
/// `StoreError::Conflict` when the scope's revision is no longer the one the
/// batch was computed from. Readers observe a scope either entirely before
/// or entirely after a batch.
pub trait RowStore: Send + Sync {
    /// Point lookup
    fn get(&self, key: &NodeKey) -> StoreResult<Option<TreeNode>>;

    /// All rows of `tree` matching `predicate`, ordered by `left` ascending
    fn find_many(&self, tree: &TreeId, predicate: &RangePredicate) -> StoreResult<Vec<TreeNode>>;

    /// Current revision of `tree`
    fn revision(&self, tree: &TreeId) -> StoreResult<Revision>;

    /// Apply `batch` atomically, returning the new revision
    fn batch_update(&self, batch: &WriteBatch) -> StoreResult<Revision>;
}

impl<S: RowStore + ?Sized> RowStore for std::sync::Arc<S> {
    fn get(&self, key: &NodeKey) -> StoreResult<Option<TreeNode>> {
        (**self).get(key)
    }

    fn find_many(&self, tree: &TreeId, predicate: &RangePredicate) -> StoreResult<Vec<TreeNode>> {
        (**self).find_many(tree, predicate)
    }

    fn revision(&self, tree: &TreeId) -> StoreResult<Revision> {
        (**self).revision(tree)
    }

    fn batch_update(&self, batch: &WriteBatch) -> StoreResult<Revision> {
        (**self).batch_update(batch)
    }
}
