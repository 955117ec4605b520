//! Mutation counters
//!
//! - Counters only, monotonic
//! - Reset only on process start
//! - Relaxed atomics; exact once all writers are joined

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::errors::TreeError;
use crate::mutation::MutationReceipt;

use super::hooks::{MutationContext, MutationKind, MutationObserver};

/// Counts mutations as they pass through the observer hooks
#[derive(Debug, Default)]
pub struct MetricsObserver {
    attempts: AtomicU64,
    retries: AtomicU64,
    inserts: AtomicU64,
    moves: AtomicU64,
    removals: AtomicU64,
    rows_written: AtomicU64,
    conflicts: AtomicU64,
    rejections: AtomicU64,
}

/// Point-in-time copy of every counter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub attempts: u64,
    pub retries: u64,
    pub inserts: u64,
    pub moves: u64,
    pub removals: u64,
    pub rows_written: u64,
    pub conflicts: u64,
    pub rejections: u64,
}

impl MetricsSnapshot {
    pub fn commits(&self) -> u64 {
        self.inserts + self.moves + self.removals
    }
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            attempts: self.attempts.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            moves: self.moves.load(Ordering::Relaxed),
            removals: self.removals.load(Ordering::Relaxed),
            rows_written: self.rows_written.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
        }
    }
}

impl MutationObserver for MetricsObserver {
    fn before(&self, ctx: &MutationContext) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        if ctx.attempt > 1 {
            self.retries.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn committed(&self, ctx: &MutationContext, receipt: &MutationReceipt) {
        let counter = match ctx.kind {
            MutationKind::Move => &self.moves,
            MutationKind::Remove => &self.removals,
            _ => &self.inserts,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.rows_written
            .fetch_add(receipt.rows_written as u64, Ordering::Relaxed);
    }

    fn failed(&self, _ctx: &MutationContext, error: &TreeError) {
        if error.is_conflict() {
            self.conflicts.fetch_add(1, Ordering::Relaxed);
        } else {
            self.rejections.fetch_add(1, Ordering::Relaxed);
        }
    }
}
