//! Perfect-recall similarity: the container must hold every target element,
//! and its precision must stay above δ.

use super::{intersection_len, SimilarityFunction, CONTAINMENT_EPSILON};
use crate::types::{ElementSet, Relation};

/// Perfect-recall similarity with threshold δ.
///
/// Never classifies a pair as NEUTRAL.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerfectRecall {
    delta: f64,
}

impl PerfectRecall {
    /// Create a perfect-recall function with threshold `delta` in (0, 1].
    pub fn new(delta: f64) -> Self {
        Self { delta }
    }
}

impl SimilarityFunction for PerfectRecall {
    fn name(&self) -> &'static str {
        "Perfect-Recall"
    }

    fn delta(&self) -> f64 {
        self.delta
    }

    fn epsilon(&self) -> f64 {
        CONTAINMENT_EPSILON
    }

    fn compute_relation(&self, larger: &ElementSet, smaller: &ElementSet) -> Relation {
        let union = larger.len() + smaller.len() - intersection_len(larger, smaller);
        let precision = larger.len() as f64 / union as f64;
        if precision > self.delta + CONTAINMENT_EPSILON {
            Relation::Must
        } else {
            Relation::Conflict
        }
    }

    fn is_covering(&self, target: &ElementSet, container: &ElementSet) -> bool {
        if container.is_empty() || !target.is_subset(container) {
            return false;
        }
        let precision = target.len() as f64 / container.len() as f64;
        precision > self.delta - CONTAINMENT_EPSILON
    }

    /// Target elements absent from the container. Adding them can only raise
    /// precision, so this is exact whenever coverage is reachable at all.
    fn num_missing(&self, target: &ElementSet, container: &ElementSet) -> f64 {
        (target.len() - intersection_len(target, container)) as f64
    }

    fn refines_tree(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::element_set;

    #[test]
    fn test_relation_is_must_or_conflict() {
        let larger = element_set([1, 2, 3, 4]);
        let smaller = element_set([4, 5, 6]);

        // precision of the merge = 4 / 6
        assert_eq!(PerfectRecall::new(0.6).compute_relation(&larger, &smaller), Relation::Must);
        assert_eq!(PerfectRecall::new(0.7).compute_relation(&larger, &smaller), Relation::Conflict);
        assert_eq!(
            PerfectRecall::new(0.99).compute_relation(&larger, &element_set([1, 2])),
            Relation::Must
        );
    }

    #[test]
    fn test_is_covering_requires_subset() {
        let pr = PerfectRecall::new(0.7);
        assert!(pr.is_covering(&element_set([1, 2, 3]), &element_set([1, 2, 3, 4])));
        assert!(!pr.is_covering(&element_set([1, 2, 5]), &element_set([1, 2, 3, 4])));
        assert!(!PerfectRecall::new(0.8).is_covering(&element_set([1, 2, 3]), &element_set([1, 2, 3, 4])));
    }

    #[test]
    fn test_num_missing_counts_absent_targets() {
        let pr = PerfectRecall::new(0.5);
        assert_eq!(pr.num_missing(&element_set([1, 2, 3]), &element_set([1, 9])), 2.0);
    }
}
