//! Exact similarity: only equal sets cover each other.

use super::{intersection_len, SimilarityFunction, CONTAINMENT_EPSILON};
use crate::types::{ElementSet, Relation};

/// Exact similarity. δ is fixed at 1.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Exact;

impl Exact {
    /// Create the exact function.
    pub fn new() -> Self {
        Self
    }
}

impl SimilarityFunction for Exact {
    fn name(&self) -> &'static str {
        "Exact"
    }

    fn delta(&self) -> f64 {
        1.0
    }

    fn epsilon(&self) -> f64 {
        CONTAINMENT_EPSILON
    }

    fn compute_relation(&self, larger: &ElementSet, smaller: &ElementSet) -> Relation {
        if smaller.is_subset(larger) {
            Relation::Must
        } else {
            Relation::Conflict
        }
    }

    fn is_covering(&self, target: &ElementSet, container: &ElementSet) -> bool {
        target == container
    }

    fn num_missing(&self, target: &ElementSet, container: &ElementSet) -> f64 {
        (target.len() - intersection_len(target, container)) as f64
    }

    fn has_triple_conflicts(&self) -> bool {
        false
    }

    fn refines_tree(&self) -> bool {
        false
    }
}
