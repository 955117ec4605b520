//! Range predicates over `left`, `right`, `depth`
//!
//! A predicate is a conjunction of comparisons. No OR, no expressions:
//! every structural question the engine asks reduces to this shape.

use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::node::NodeBounds;

/// Column of a node row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeField {
    Left,
    Right,
    Depth,
}

impl NodeField {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeField::Left => "left",
            NodeField::Right => "right",
            NodeField::Depth => "depth",
        }
    }

    fn read(&self, bounds: &NodeBounds) -> u64 {
        match self {
            NodeField::Left => bounds.left,
            NodeField::Right => bounds.right,
            NodeField::Depth => u64::from(bounds.depth),
        }
    }
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
        }
    }

    fn holds(&self, actual: u64, bound: u64) -> bool {
        match self {
            CompareOp::Eq => actual == bound,
            CompareOp::Lt => actual < bound,
            CompareOp::Lte => actual <= bound,
            CompareOp::Gt => actual > bound,
            CompareOp::Gte => actual >= bound,
        }
    }
}

/// A single comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub field: NodeField,
    pub op: CompareOp,
    pub value: u64,
}

impl Condition {
    pub fn matches(&self, bounds: &NodeBounds) -> bool {
        self.op.holds(self.field.read(bounds), self.value)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field.as_str(), self.op.as_str(), self.value)
    }
}

/// Conjunction of conditions. The empty predicate matches every row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangePredicate {
    conditions: Vec<Condition>,
}

impl RangePredicate {
    /// Predicate matching every row
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: NodeField, op: CompareOp, value: u64) -> Self {
        self.conditions.push(Condition { field, op, value });
        self
    }

    pub fn left_eq(self, value: u64) -> Self {
        self.with(NodeField::Left, CompareOp::Eq, value)
    }

    pub fn left_lt(self, value: u64) -> Self {
        self.with(NodeField::Left, CompareOp::Lt, value)
    }

    pub fn left_lte(self, value: u64) -> Self {
        self.with(NodeField::Left, CompareOp::Lte, value)
    }

    pub fn left_gt(self, value: u64) -> Self {
        self.with(NodeField::Left, CompareOp::Gt, value)
    }

    pub fn left_gte(self, value: u64) -> Self {
        self.with(NodeField::Left, CompareOp::Gte, value)
    }

    pub fn right_eq(self, value: u64) -> Self {
        self.with(NodeField::Right, CompareOp::Eq, value)
    }

    pub fn right_lt(self, value: u64) -> Self {
        self.with(NodeField::Right, CompareOp::Lt, value)
    }

    pub fn right_lte(self, value: u64) -> Self {
        self.with(NodeField::Right, CompareOp::Lte, value)
    }

    pub fn right_gt(self, value: u64) -> Self {
        self.with(NodeField::Right, CompareOp::Gt, value)
    }

    pub fn right_gte(self, value: u64) -> Self {
        self.with(NodeField::Right, CompareOp::Gte, value)
    }

    pub fn depth_eq(self, depth: u32) -> Self {
        self.with(NodeField::Depth, CompareOp::Eq, u64::from(depth))
    }

    pub fn depth_lte(self, depth: u32) -> Self {
        self.with(NodeField::Depth, CompareOp::Lte, u64::from(depth))
    }

    /// Conjunction of two predicates
    pub fn and(mut self, other: RangePredicate) -> Self {
        self.conditions.extend(other.conditions);
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// All conditions hold (AND semantics)
    pub fn matches(&self, bounds: &NodeBounds) -> bool {
        self.conditions.iter().all(|c| c.matches(bounds))
    }

    /// Inclusive window of `left` values the predicate can match, for an
    /// ordered scan. `None` when the conditions on `left` are contradictory.
    pub fn left_window(&self) -> Option<RangeInclusive<u64>> {
        let mut low = 0u64;
        let mut high = u64::MAX;

        for condition in self.conditions.iter().filter(|c| c.field == NodeField::Left) {
            let v = condition.value;
            match condition.op {
                CompareOp::Eq => {
                    low = low.max(v);
                    high = high.min(v);
                }
                CompareOp::Gt => low = low.max(v.checked_add(1)?),
                CompareOp::Gte => low = low.max(v),
                CompareOp::Lt => high = high.min(v.checked_sub(1)?),
                CompareOp::Lte => high = high.min(v),
            }
        }

        if low > high {
            None
        } else {
            Some(low..=high)
        }
    }
}

impl fmt::Display for RangePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conditions.is_empty() {
            return write!(f, "TRUE");
        }
        for (i, condition) in self.conditions.iter().enumerate() {
            if i > 0 {
                write!(f, " AND ")?;
            }
            write!(f, "{}", condition)?;
        }
        Ok(())
    }
}
