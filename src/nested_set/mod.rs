//! Nested-set engine surface
//!
//! `NestedSet` binds a row store, a scope and a configuration together and
//! exposes the query and mutation engines by node id. It adds what the raw
//! engines leave out: observer hooks around each mutation, whole-operation
//! retry after a conflict, and optional verification.

mod config;
mod facade;

pub use config::{TreeConfig, MAX_CONFLICT_RETRIES};
pub use facade::NestedSet;
