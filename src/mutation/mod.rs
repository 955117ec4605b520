//! Mutation engine
//!
//! Inserts, moves and removals. Each operation reads the rows its shift
//! depends on, plans the boundary changes and commits them as a single
//! batch guarded by the scope revision it read.
//!
//! # Shift rules
//!
//! - Last child: rows right of the parent move by +2, the parent and its
//!   ancestors grow by +2
//! - Sibling: two phases bounded by the root range, one on `left`, one on
//!   `right`
//! - Move: the vacated range closes and the destination range opens in one
//!   remap; the subtree's depth moves by a single delta
//! - Remove: mirror image of insertion

mod engine;
mod shift;

pub use engine::{MutationEngine, MutationReceipt};
pub use shift::{plan_close_gap, plan_last_child, plan_move, plan_open_gap, Relocation, LEAF_WIDTH};
