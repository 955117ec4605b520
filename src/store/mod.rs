//! Row store subsystem
//!
//! The row store is the only I/O boundary the engine consumes: point
//! lookups, range-filtered reads ordered by `left`, and atomic batches
//! validated against the scope revision they were computed from.
//!
//! # Adapters
//!
//! - `MemoryRowStore`: process-local, staged copy-and-swap commits
//! - `FileRowStore`: the same, made durable by a checksummed commit log
//!
//! # Guarantees
//!
//! - A batch is applied entirely or not at all
//! - A batch computed from a stale revision is rejected as a conflict
//! - Readers see a scope before or after a batch, never in between

mod backend;
mod batch;
mod checksum;
mod errors;
mod file;
mod frame;
mod memory;
mod predicate;

pub use backend::RowStore;
pub use batch::{FieldChanges, Revision, RowWrite, WriteBatch};
pub use checksum::compute_checksum;
pub use errors::{Severity, StoreError, StoreResult};
pub use file::{FileRowStore, LOG_FILE};
pub use frame::CommitRecord;
pub use memory::MemoryRowStore;
pub use predicate::{CompareOp, Condition, NodeField, RangePredicate};
