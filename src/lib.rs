//! nestedset - nested-set (MPTT) tree storage
//!
//! A tree is stored as flat rows carrying `left`, `right` and `depth`.
//! Structural questions become range predicates; structural changes become
//! a single atomic batch of boundary shifts, validated against the scope
//! revision it was computed from.
//!
//! # Layers
//!
//! - `node`: typed rows, bounds codec, invariant checker
//! - `store`: the row store boundary plus in-memory and file adapters
//! - `query`: read-only structural queries
//! - `mutation`: shift planning and commit
//! - `nested_set`: the engine surface, with retries, hooks and verification

pub mod cli;
pub mod errors;
pub mod mutation;
pub mod nested_set;
pub mod node;
pub mod observability;
pub mod query;
pub mod store;

pub use errors::{TreeError, TreeResult};
pub use mutation::{MutationEngine, MutationReceipt};
pub use nested_set::{NestedSet, TreeConfig};
pub use node::{InvariantChecker, NodeBounds, NodeId, NodeView, TreeId, TreeNode};
pub use query::{NodeFilter, QueryEngine};
pub use store::{FileRowStore, MemoryRowStore, RangePredicate, RowStore, StoreError};
