//! Mutation observer hooks
//!
//! Observers run around a whole mutation, never inside the shift itself.
//! They see the request before it starts and its outcome after it commits
//! or fails; they cannot change either.

use std::sync::Arc;

use crate::errors::TreeError;
use crate::mutation::MutationReceipt;
use crate::node::{NodeId, TreeId};

use super::events::Event;
use super::logger::{Logger, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    CreateRoot,
    InsertLastChild,
    InsertNextSibling,
    InsertPrevSibling,
    Move,
    Remove,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::CreateRoot => "create_root",
            MutationKind::InsertLastChild => "insert_last_child",
            MutationKind::InsertNextSibling => "insert_next_sibling",
            MutationKind::InsertPrevSibling => "insert_prev_sibling",
            MutationKind::Move => "move",
            MutationKind::Remove => "remove",
        }
    }

    pub fn is_insert(&self) -> bool {
        matches!(
            self,
            MutationKind::CreateRoot
                | MutationKind::InsertLastChild
                | MutationKind::InsertNextSibling
                | MutationKind::InsertPrevSibling
        )
    }
}

/// What a mutation was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationContext {
    pub tree: TreeId,
    pub kind: MutationKind,
    /// Node being placed, moved or removed
    pub node: NodeId,
    /// Parent or sibling the operation is relative to
    pub reference: Option<NodeId>,
    /// 1 for the first try, incremented on every conflict retry
    pub attempt: u32,
}

impl MutationContext {
    pub fn new(tree: TreeId, kind: MutationKind, node: NodeId, reference: Option<NodeId>) -> Self {
        Self {
            tree,
            kind,
            node,
            reference,
            attempt: 1,
        }
    }

    pub fn retry(&self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self.clone()
        }
    }
}

pub trait MutationObserver: Send + Sync {
    fn before(&self, _ctx: &MutationContext) {}

    fn committed(&self, _ctx: &MutationContext, _receipt: &MutationReceipt) {}

    fn failed(&self, _ctx: &MutationContext, _error: &TreeError) {}
}

/// Observer that does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl MutationObserver for NoopObserver {}

/// Logs every mutation as JSON lines
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl MutationObserver for LoggingObserver {
    fn before(&self, ctx: &MutationContext) {
        let attempt = ctx.attempt.to_string();
        let event = if ctx.attempt > 1 {
            Event::MutationRetry
        } else {
            Event::MutationBegin
        };
        Logger::log(
            Severity::Trace,
            event.as_str(),
            &[
                ("attempt", attempt.as_str()),
                ("kind", ctx.kind.as_str()),
                ("node", ctx.node.as_str()),
                ("tree", ctx.tree.as_str()),
            ],
        );
    }

    fn committed(&self, ctx: &MutationContext, receipt: &MutationReceipt) {
        let revision = receipt.revision.to_string();
        let rows = receipt.rows_written.to_string();
        Logger::info(
            Event::MutationCommit.as_str(),
            &[
                ("kind", ctx.kind.as_str()),
                ("node", ctx.node.as_str()),
                ("revision", revision.as_str()),
                ("rows_written", rows.as_str()),
                ("tree", ctx.tree.as_str()),
            ],
        );
    }

    fn failed(&self, ctx: &MutationContext, error: &TreeError) {
        let (event, severity) = if error.is_conflict() {
            (Event::MutationConflict, Severity::Warn)
        } else {
            (Event::MutationRejected, Severity::Error)
        };
        let message = error.to_string();
        Logger::log(
            severity,
            event.as_str(),
            &[
                ("code", error.code()),
                ("kind", ctx.kind.as_str()),
                ("message", message.as_str()),
                ("node", ctx.node.as_str()),
                ("tree", ctx.tree.as_str()),
            ],
        );
    }
}

/// Fans every callback out to several observers, in order
#[derive(Default, Clone)]
pub struct ObserverChain {
    observers: Vec<Arc<dyn MutationObserver>>,
}

impl ObserverChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn MutationObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl MutationObserver for ObserverChain {
    fn before(&self, ctx: &MutationContext) {
        for observer in &self.observers {
            observer.before(ctx);
        }
    }

    fn committed(&self, ctx: &MutationContext, receipt: &MutationReceipt) {
        for observer in &self.observers {
            observer.committed(ctx, receipt);
        }
    }

    fn failed(&self, ctx: &MutationContext, error: &TreeError) {
        for observer in &self.observers {
            observer.failed(ctx, error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl MutationObserver for Recorder {
        fn before(&self, ctx: &MutationContext) {
            self.calls.lock().unwrap().push(format!("before:{}", ctx.attempt));
        }

        fn failed(&self, _ctx: &MutationContext, error: &TreeError) {
            self.calls.lock().unwrap().push(format!("failed:{}", error.code()));
        }
    }

    fn ctx() -> MutationContext {
        MutationContext::new(
            TreeId::from("menu"),
            MutationKind::InsertLastChild,
            NodeId::from("a"),
            Some(NodeId::from("r")),
        )
    }

    #[test]
    fn test_retry_bumps_attempt() {
        let first = ctx();
        let second = first.retry();
        assert_eq!(first.attempt, 1);
        assert_eq!(second.attempt, 2);
        assert_eq!(second.node, first.node);
    }

    #[test]
    fn test_chain_fans_out() {
        let a = Arc::new(Recorder::default());
        let b = Arc::new(Recorder::default());
        let chain = ObserverChain::new().with(a.clone()).with(b.clone());
        assert_eq!(chain.len(), 2);

        chain.before(&ctx());
        chain.failed(&ctx(), &TreeError::invalid_state("nope"));

        for recorder in [a, b] {
            let calls = recorder.calls.lock().unwrap();
            assert_eq!(calls.len(), 2);
            assert_eq!(calls[0], "before:1");
            assert!(calls[1].starts_with("failed:"));
        }
    }

    #[test]
    fn test_kind_classification() {
        assert!(MutationKind::CreateRoot.is_insert());
        assert!(MutationKind::InsertPrevSibling.is_insert());
        assert!(!MutationKind::Move.is_insert());
        assert!(!MutationKind::Remove.is_insert());
    }
}
