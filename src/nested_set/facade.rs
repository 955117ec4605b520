//! `NestedSet`: one scope, one store, by id

use std::sync::Arc;

use crate::errors::{TreeError, TreeResult};
use crate::mutation::{MutationEngine, MutationReceipt};
use crate::node::{InvariantChecker, NodeId, NodeView, TreeId, TreeNode};
use crate::observability::{
    log_event, Event, LoggingObserver, MutationContext, MutationKind, MutationObserver,
};
use crate::query::{NodeFilter, QueryEngine};
use crate::store::{RangePredicate, Revision, RowStore};

use super::config::TreeConfig;

/// Nested-set tree stored in one scope of a row store.
///
/// Cheap to clone; clones share the store and observer.
pub struct NestedSet<S: RowStore> {
    store: Arc<S>,
    tree: TreeId,
    config: TreeConfig,
    observer: Arc<dyn MutationObserver>,
}

impl<S: RowStore> Clone for NestedSet<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            tree: self.tree.clone(),
            config: self.config.clone(),
            observer: Arc::clone(&self.observer),
        }
    }
}

impl<S: RowStore> NestedSet<S> {
    /// Default configuration, JSON logging observer, no verification.
    pub fn new(store: Arc<S>, tree: impl Into<TreeId>) -> Self {
        Self {
            store,
            tree: tree.into(),
            config: TreeConfig::default(),
            observer: Arc::new(LoggingObserver),
        }
    }

    /// Validate `config` and, if `verify_on_open` is set, check the scope.
    pub fn open(store: Arc<S>, tree: impl Into<TreeId>, config: TreeConfig) -> TreeResult<Self> {
        config.validate()?;
        let set = Self::new(store, tree).with_config(config);
        if set.config.verify_on_open {
            set.verify()?;
        }
        Ok(set)
    }

    pub fn with_config(mut self, config: TreeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn MutationObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn tree(&self) -> &TreeId {
        &self.tree
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn revision(&self) -> TreeResult<Revision> {
        Ok(self.store.revision(&self.tree)?)
    }

    fn query(&self) -> QueryEngine<'_, S> {
        QueryEngine::new(self.store.as_ref(), &self.tree)
    }

    fn mutation(&self) -> MutationEngine<'_, S> {
        MutationEngine::new(self.store.as_ref(), &self.tree)
    }

    /// Run `op` with observer callbacks, re-running it from scratch on
    /// conflict up to `conflict_retries` times.
    fn run<F>(&self, mut ctx: MutationContext, op: F) -> TreeResult<MutationReceipt>
    where
        F: Fn(&MutationEngine<'_, S>) -> TreeResult<MutationReceipt>,
    {
        loop {
            self.observer.before(&ctx);

            match op(&self.mutation()) {
                Ok(receipt) => {
                    self.observer.committed(&ctx, &receipt);
                    if self.config.verify_after_mutation {
                        // The batch is durable either way.
                        if let Err(e) = self.verify() {
                            return Err(TreeError::unverified(receipt.revision, e));
                        }
                    }
                    return Ok(receipt);
                }
                Err(e) => {
                    self.observer.failed(&ctx, &e);
                    if e.is_conflict() && ctx.attempt <= self.config.conflict_retries {
                        ctx = ctx.retry();
                        continue;
                    }
                    return Err(e);
                }
            }
        }
    }

    fn context(&self, kind: MutationKind, node: &NodeId, reference: Option<&NodeId>) -> MutationContext {
        MutationContext::new(self.tree.clone(), kind, node.clone(), reference.cloned())
    }

    // Mutations

    pub fn create_root(&self, id: NodeId) -> TreeResult<MutationReceipt> {
        let ctx = self.context(MutationKind::CreateRoot, &id, None);
        self.run(ctx, |m| m.create_root(id.clone()))
    }

    pub fn insert_last_child_of(&self, id: NodeId, parent_id: &NodeId) -> TreeResult<MutationReceipt> {
        let ctx = self.context(MutationKind::InsertLastChild, &id, Some(parent_id));
        self.run(ctx, |m| m.insert_last_child_of(id.clone(), parent_id))
    }

    pub fn insert_next_sibling_of(&self, id: NodeId, target_id: &NodeId) -> TreeResult<MutationReceipt> {
        let ctx = self.context(MutationKind::InsertNextSibling, &id, Some(target_id));
        self.run(ctx, |m| m.insert_next_sibling_of(id.clone(), target_id))
    }

    pub fn insert_prev_sibling_of(&self, id: NodeId, target_id: &NodeId) -> TreeResult<MutationReceipt> {
        let ctx = self.context(MutationKind::InsertPrevSibling, &id, Some(target_id));
        self.run(ctx, |m| m.insert_prev_sibling_of(id.clone(), target_id))
    }

    pub fn move_as_child_of(&self, id: &NodeId, new_parent_id: &NodeId) -> TreeResult<MutationReceipt> {
        let ctx = self.context(MutationKind::Move, id, Some(new_parent_id));
        self.run(ctx, |m| m.move_as_child_of(id, new_parent_id))
    }

    pub fn remove_subtree(&self, id: &NodeId) -> TreeResult<MutationReceipt> {
        let ctx = self.context(MutationKind::Remove, id, None);
        self.run(ctx, |m| m.remove_subtree(id))
    }

    // Queries by id

    pub fn node(&self, id: &NodeId) -> TreeResult<TreeNode> {
        self.query().node(id)
    }

    pub fn root(&self) -> TreeResult<Option<TreeNode>> {
        self.query().root()
    }

    pub fn parent_id_of(&self, id: &NodeId) -> TreeResult<Option<NodeId>> {
        let node = self.node(id)?;
        self.query().parent_id_of(&node)
    }

    pub fn children_count_of(&self, id: &NodeId) -> TreeResult<usize> {
        let node = self.node(id)?;
        self.query().children_count_of(&node)
    }

    pub fn is_root_of(&self, id: &NodeId) -> TreeResult<bool> {
        Ok(self.node(id)?.is_root())
    }

    pub fn is_leaf_of(&self, id: &NodeId) -> TreeResult<bool> {
        Ok(self.node(id)?.is_leaf())
    }

    pub fn children_of(&self, id: &NodeId) -> TreeResult<Vec<TreeNode>> {
        let node = self.node(id)?;
        self.query().children_of(&node)
    }

    pub fn ancestors_of(&self, id: &NodeId) -> TreeResult<Vec<TreeNode>> {
        let node = self.node(id)?;
        self.query().ancestors_of(&node)
    }

    pub fn descendants_of(&self, id: &NodeId) -> TreeResult<Vec<TreeNode>> {
        let node = self.node(id)?;
        self.query().descendants_of(&node)
    }

    pub fn weight_at(&self, id: &NodeId, depth: u32) -> TreeResult<usize> {
        let node = self.node(id)?;
        self.query().weight_at(&node, depth)
    }

    /// Resolve `filter` into a predicate for `find_many`
    pub fn filter_by(&self, filter: &NodeFilter) -> TreeResult<RangePredicate> {
        self.query().filter_by(filter)
    }

    pub fn find_many(&self, predicate: &RangePredicate) -> TreeResult<Vec<TreeNode>> {
        self.query().find_many(predicate)
    }

    /// Whole scope in preorder
    pub fn nodes(&self) -> TreeResult<Vec<TreeNode>> {
        self.query().nodes()
    }

    /// External view of one node, parent included
    pub fn describe(&self, id: &NodeId) -> TreeResult<NodeView> {
        let node = self.node(id)?;
        let parent = self.query().parent_id_of(&node)?;
        Ok(NodeView::new(&node, parent))
    }

    /// External view of the whole scope in preorder, from a single read.
    pub fn describe_all(&self) -> TreeResult<Vec<NodeView>> {
        let nodes = self.nodes()?;
        let mut open: Vec<&TreeNode> = Vec::new();
        let mut views = Vec::with_capacity(nodes.len());

        for node in &nodes {
            while open.last().is_some_and(|top| top.right() < node.left()) {
                open.pop();
            }
            let parent = open.last().map(|p| p.id.clone());
            views.push(NodeView::new(node, parent));
            open.push(node);
        }
        Ok(views)
    }

    /// Check every structural invariant over the committed scope.
    ///
    /// Returns the number of nodes checked.
    pub fn verify(&self) -> TreeResult<usize> {
        let nodes = self.nodes()?;
        let count = nodes.len().to_string();

        if let Err(violation) = InvariantChecker::check(&nodes) {
            let reason = violation.to_string();
            log_event(
                Event::VerifyFailed,
                &[
                    ("code", violation.code()),
                    ("reason", reason.as_str()),
                    ("tree", self.tree.as_str()),
                ],
            );
            return Err(TreeError::from(violation));
        }

        log_event(
            Event::VerifyComplete,
            &[("nodes", count.as_str()), ("tree", self.tree.as_str())],
        );
        Ok(nodes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeBounds;
    use crate::observability::{MetricsObserver, NoopObserver};
    use crate::store::{MemoryRowStore, StoreResult, WriteBatch};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn id(s: &str) -> NodeId {
        NodeId::from(s)
    }

    fn menu() -> NestedSet<MemoryRowStore> {
        NestedSet::new(Arc::new(MemoryRowStore::new()), "menu")
            .with_observer(Arc::new(NoopObserver))
    }

    /// Fails the first `remaining` commits with a conflict, then delegates.
    struct FlakyStore {
        inner: MemoryRowStore,
        remaining: AtomicU32,
    }

    impl RowStore for FlakyStore {
        fn get(&self, key: &crate::node::NodeKey) -> StoreResult<Option<TreeNode>> {
            self.inner.get(key)
        }

        fn find_many(&self, tree: &TreeId, predicate: &RangePredicate) -> StoreResult<Vec<TreeNode>> {
            self.inner.find_many(tree, predicate)
        }

        fn revision(&self, tree: &TreeId) -> StoreResult<Revision> {
            self.inner.revision(tree)
        }

        fn batch_update(&self, batch: &WriteBatch) -> StoreResult<Revision> {
            if self.remaining.load(Ordering::SeqCst) > 0 {
                self.remaining.fetch_sub(1, Ordering::SeqCst);
                let actual = self.inner.revision(batch.tree())? + 1;
                return Err(crate::store::StoreError::conflict(
                    batch.tree(),
                    batch.expected_revision(),
                    actual,
                ));
            }
            self.inner.batch_update(batch)
        }
    }

    fn flaky(conflicts: u32) -> Arc<FlakyStore> {
        Arc::new(FlakyStore {
            inner: MemoryRowStore::new(),
            remaining: AtomicU32::new(conflicts),
        })
    }

    #[test]
    fn test_surface_by_id() {
        let set = menu();
        set.create_root(id("r")).unwrap();
        set.insert_last_child_of(id("a"), &id("r")).unwrap();
        set.insert_last_child_of(id("a1"), &id("a")).unwrap();
        set.insert_next_sibling_of(id("b"), &id("a")).unwrap();

        assert!(set.is_root_of(&id("r")).unwrap());
        assert!(!set.is_leaf_of(&id("a")).unwrap());
        assert!(set.is_leaf_of(&id("b")).unwrap());
        assert_eq!(set.parent_id_of(&id("a1")).unwrap(), Some(id("a")));
        assert_eq!(set.parent_id_of(&id("r")).unwrap(), None);
        assert_eq!(set.children_count_of(&id("r")).unwrap(), 2);
        assert_eq!(set.verify().unwrap(), 4);
    }

    #[test]
    fn test_filter_by_feeds_find_many() {
        let set = menu();
        set.create_root(id("r")).unwrap();
        set.insert_last_child_of(id("a"), &id("r")).unwrap();
        set.insert_last_child_of(id("b"), &id("r")).unwrap();

        let predicate = set.filter_by(&NodeFilter::new().child_of("r")).unwrap();
        let children: Vec<NodeId> = set
            .find_many(&predicate)
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(children, vec![id("a"), id("b")]);
    }

    #[test]
    fn test_describe_all_matches_describe() {
        let set = menu();
        set.create_root(id("r")).unwrap();
        set.insert_last_child_of(id("a"), &id("r")).unwrap();
        set.insert_last_child_of(id("a1"), &id("a")).unwrap();
        set.insert_last_child_of(id("b"), &id("r")).unwrap();

        let all = set.describe_all().unwrap();
        assert_eq!(all.len(), 4);
        for view in &all {
            assert_eq!(view, &set.describe(&view.id).unwrap());
        }
        assert_eq!(all[3].parent, Some(id("r")));
    }

    #[test]
    fn test_conflict_retried_when_configured() {
        let store = flaky(2);
        let metrics = Arc::new(MetricsObserver::new());
        let set = NestedSet::new(store, "menu")
            .with_config(TreeConfig::default().with_conflict_retries(2))
            .with_observer(metrics.clone());

        set.create_root(id("r")).unwrap();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.attempts, 3);
        assert_eq!(snapshot.retries, 2);
        assert_eq!(snapshot.conflicts, 2);
        assert_eq!(snapshot.inserts, 1);
    }

    #[test]
    fn test_conflict_surfaces_without_retries() {
        let set = NestedSet::new(flaky(1), "menu").with_observer(Arc::new(NoopObserver));
        let err = set.create_root(id("r")).unwrap_err();
        assert!(err.is_conflict());
        assert!(set.nodes().unwrap().is_empty());

        // Next attempt goes through
        set.create_root(id("r")).unwrap();
    }

    #[test]
    fn test_retries_exhausted() {
        let set = NestedSet::new(flaky(5), "menu")
            .with_config(TreeConfig::default().with_conflict_retries(2))
            .with_observer(Arc::new(NoopObserver));
        assert!(set.create_root(id("r")).unwrap_err().is_conflict());
    }

    #[test]
    fn test_open_verifies_scope() {
        let store = Arc::new(MemoryRowStore::new());
        let mut batch = WriteBatch::new(TreeId::from("menu"), 0);
        batch.insert(TreeNode::new(id("r"), NodeBounds::new(1, 4, 0)));
        store.batch_update(&batch).unwrap();

        let err = NestedSet::open(store.clone(), "menu", TreeConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, TreeError::Invariant(_)));

        let lenient = TreeConfig::default().with_verify_on_open(false);
        assert!(NestedSet::open(store, "menu", lenient).is_ok());
    }

    #[test]
    fn test_open_rejects_bad_config() {
        let config = TreeConfig::default().with_conflict_retries(1000);
        let err = NestedSet::open(Arc::new(MemoryRowStore::new()), "menu", config)
            .err()
            .unwrap();
        assert_eq!(err.code(), "NEST_CONFIG_INVALID");
    }

    /// Commits inserts only, dropping every shift of existing rows.
    struct LossyStore {
        inner: MemoryRowStore,
    }

    impl RowStore for LossyStore {
        fn get(&self, key: &crate::node::NodeKey) -> StoreResult<Option<TreeNode>> {
            self.inner.get(key)
        }

        fn find_many(&self, tree: &TreeId, predicate: &RangePredicate) -> StoreResult<Vec<TreeNode>> {
            self.inner.find_many(tree, predicate)
        }

        fn revision(&self, tree: &TreeId) -> StoreResult<Revision> {
            self.inner.revision(tree)
        }

        fn batch_update(&self, batch: &WriteBatch) -> StoreResult<Revision> {
            let mut lossy = WriteBatch::new(batch.tree().clone(), batch.expected_revision());
            lossy.extend(
                batch
                    .writes()
                    .iter()
                    .filter(|w| matches!(w, crate::store::RowWrite::Insert { .. }))
                    .cloned(),
            );
            self.inner.batch_update(&lossy)
        }
    }

    #[test]
    fn test_verify_after_mutation_passes_clean_commits() {
        let set = menu().with_config(TreeConfig::default().with_verify_after_mutation(true));
        set.create_root(id("r")).unwrap();
        set.insert_last_child_of(id("a"), &id("r")).unwrap();
        set.move_as_child_of(&id("a"), &id("r")).unwrap();
        assert_eq!(set.revision().unwrap(), 3);
    }

    #[test]
    fn test_unverified_commit_is_distinct_from_rejection() {
        let store = Arc::new(LossyStore {
            inner: MemoryRowStore::new(),
        });
        let metrics = Arc::new(MetricsObserver::new());
        let set = NestedSet::new(store, "menu")
            .with_config(TreeConfig::default().with_verify_after_mutation(true))
            .with_observer(metrics.clone());

        set.create_root(id("r")).unwrap();
        let err = set.insert_last_child_of(id("a"), &id("r")).unwrap_err();

        assert_eq!(err.code(), "NEST_UNVERIFIED_COMMIT");
        assert!(err.is_committed());
        assert!(matches!(err, TreeError::Unverified { revision: 2, .. }));
        assert_eq!(set.revision().unwrap(), 2);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.inserts, 2);
        assert_eq!(snapshot.rejections, 0);
        assert_eq!(snapshot.attempts, 2);
    }
}
