//! Node records and the structural codec
//!
//! A node is stored as three integers: `left`, `right`, `depth`. A subtree
//! is exactly the set of nodes whose range is contained in its parent's range.
//!
//! # Invariants Enforced
//!
//! - `right > left` for every node
//! - Ranges are disjoint or nested, never partially overlapping
//! - `right - left - 1 == 2 * descendants`
//! - `depth` equals the number of ancestors
//! - The root has `left == 1`

mod bounds;
mod ids;
mod invariants;
mod record;

pub use bounds::{shift_depth, shift_position, NodeBounds};
pub use ids::{NodeId, NodeKey, TreeId};
pub use invariants::{InvariantChecker, InvariantViolation};
pub use record::{NodeView, TreeNode};
