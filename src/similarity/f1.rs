//! F1 similarity: harmonic mean of precision and recall.
//!
//! Uses the same feasibility-interval analysis as [`super::Jaccard`], with
//! the bounds rewritten for F1 (δ/2 plays the role of δ).

use super::{decide, intersection_len, SimilarityFunction, SCORE_EPSILON};
use crate::types::{ElementSet, Relation};

/// F1 similarity with threshold δ.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct F1 {
    delta: f64,
}

impl F1 {
    /// Create an F1 function with threshold `delta` in (0, 1].
    pub fn new(delta: f64) -> Self {
        Self { delta }
    }

    fn together(&self, larger: f64, smaller: f64, inter: f64) -> Option<f64> {
        let half = self.delta / 2.0;
        let must_remain = inter.max(smaller * half / (1.0 - half));
        let lb_extra = must_remain - inter;
        let ub_extra = larger * (1.0 - self.delta) / half;
        if lb_extra > ub_extra - SCORE_EPSILON {
            return None;
        }
        let extra = (smaller - inter).min(ub_extra);
        let p1 = larger / (larger + extra);
        let r2 = (inter + extra) / smaller;
        Some(2.0 * (p1 / (1.0 + p1) + r2 / (1.0 + r2)))
    }

    fn separately(&self, larger: f64, smaller: f64, inter: f64) -> Option<f64> {
        let share = (1.0 - self.delta) / (1.0 - self.delta / 2.0);
        let ub_x = inter.min(share * smaller);
        let lb_x = inter - larger * share;
        if lb_x > ub_x - SCORE_EPSILON {
            return None;
        }
        let r1 = (larger - inter + lb_x) / larger;
        let r2 = (smaller - lb_x) / smaller;
        Some(2.0 * (r1 / (1.0 + r1) + r2 / (1.0 + r2)))
    }
}

impl SimilarityFunction for F1 {
    fn name(&self) -> &'static str {
        "F1"
    }

    fn delta(&self) -> f64 {
        self.delta
    }

    fn epsilon(&self) -> f64 {
        SCORE_EPSILON
    }

    fn compute_relation(&self, larger: &ElementSet, smaller: &ElementSet) -> Relation {
        let inter = intersection_len(larger, smaller) as f64;
        let (l, s) = (larger.len() as f64, smaller.len() as f64);
        decide(self.together(l, s, inter), self.separately(l, s, inter), SCORE_EPSILON)
    }

    fn is_covering(&self, target: &ElementSet, container: &ElementSet) -> bool {
        let inter = intersection_len(target, container);
        if container.is_empty() || inter == 0 {
            return false;
        }
        let precision = inter as f64 / container.len() as f64;
        let recall = inter as f64 / target.len() as f64;
        let score = 2.0 * precision * recall / (precision + recall);
        score > self.delta - SCORE_EPSILON
    }

    fn num_missing(&self, target: &ElementSet, container: &ElementSet) -> f64 {
        let inter = intersection_len(target, container) as f64;
        let half = self.delta / 2.0;
        (half * (target.len() + container.len()) as f64 - inter) / (1.0 - half)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::element_set;

    #[test]
    fn test_nested_pair_is_must() {
        let f = F1::new(0.8);
        let rel = f.compute_relation(&element_set([1, 2, 3, 4]), &element_set([1, 2, 3]));
        assert_eq!(rel, Relation::Must);
    }

    #[test]
    fn test_disjoint_heavy_pair_is_conflict() {
        let f = F1::new(0.95);
        let rel = f.compute_relation(&element_set(1..=10), &element_set(6..=14));
        assert_eq!(rel, Relation::Conflict);
    }

    #[test]
    fn test_is_covering() {
        let f = F1::new(0.8);
        let target = element_set([1, 2, 3]);
        assert!(f.is_covering(&target, &element_set([1, 2, 3, 4])));
        assert!(!f.is_covering(&target, &element_set([4, 5])));
        assert!(!f.is_covering(&target, &ElementSet::new()));
        assert!(!F1::new(0.9).is_covering(&target, &element_set([1, 2, 3, 4])));
    }

    #[test]
    fn test_num_missing_reaches_cover() {
        let f = F1::new(0.8);
        let target = element_set([1, 2, 3, 4, 5]);
        let container = element_set([1, 2, 3]);
        assert!(!f.is_covering(&target, &container));

        let missing = f.num_missing(&target, &container).ceil() as u32;
        let grown: ElementSet = container.iter().copied().chain(element_set(4..4 + missing)).collect();
        assert!(f.is_covering(&target, &grown));
    }
}
