//! Pairwise and triple relations between queries of one component.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::query::QueryId;

/// Classification of an intersecting `(larger, smaller)` query pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relation {
    /// The two queries cannot both be in the independent set.
    Conflict,
    /// `smaller` must nest under `larger`.
    Must,
    /// Either arrangement is acceptable.
    Neutral,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflict => write!(f, "conflict"),
            Self::Must => write!(f, "must"),
            Self::Neutral => write!(f, "neutral"),
        }
    }
}

/// Size-3 hyperedge: `child` cannot keep both parents as independent-set
/// ancestors, since nothing between `parent1` and `parent2` resolves their
/// nesting.
///
/// `parent1` is always the greater of the two parents in size-major order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TripleConflict {
    /// Query that must nest under both parents.
    pub child: QueryId,
    /// Greater parent.
    pub parent1: QueryId,
    /// Lesser parent.
    pub parent2: QueryId,
}

impl TripleConflict {
    /// Create a triple conflict, orienting the parents in size-major order.
    pub fn new(child: QueryId, a: QueryId, b: QueryId) -> Self {
        let (parent1, parent2) = if a < b { (a, b) } else { (b, a) };
        Self {
            child,
            parent1,
            parent2,
        }
    }

    /// Members of the hyperedge.
    pub fn members(&self) -> [QueryId; 3] {
        [self.child, self.parent1, self.parent2]
    }
}
