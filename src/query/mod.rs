//! Query engine
//!
//! Root, leaf, parent, children, sibling and ancestor questions, each
//! translated into a range predicate over `left`, `right`, `depth`.
//! Queries never write and never observe a range mid-shift: the row store
//! serves them from committed state only.

mod engine;
mod filter;

pub use engine::QueryEngine;
pub use filter::{
    ancestors_predicate, children_predicate, descendants_predicate, next_sibling_predicate,
    parent_predicate, prev_sibling_predicate, weight_predicate, NodeFilter,
};
