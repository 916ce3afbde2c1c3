//! Jaccard similarity: |A ∩ B| / |A ∪ B|.

use super::{decide, intersection_len, SimilarityFunction, SCORE_EPSILON};
use crate::types::{ElementSet, Relation};

/// Jaccard similarity with threshold δ.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Jaccard {
    delta: f64,
}

impl Jaccard {
    /// Create a Jaccard function with threshold `delta` in (0, 1].
    pub fn new(delta: f64) -> Self {
        Self { delta }
    }

    /// Best combined score if `smaller` is folded into `larger`'s category.
    ///
    /// `extra` counts elements of `smaller` outside the intersection that the
    /// merged category also takes. It must keep `smaller` covered (lower
    /// bound) without pushing `larger` below δ (upper bound).
    fn together(&self, larger: f64, smaller: f64, inter: f64) -> Option<f64> {
        let d = self.delta;
        let must_remain = inter.max(d * smaller);
        let lb_extra = must_remain - inter;
        let ub_extra = larger * (1.0 - d) / d;
        if lb_extra > ub_extra - SCORE_EPSILON {
            return None;
        }
        let extra = (smaller - inter).min(ub_extra);
        Some(larger / (larger + extra) + (inter + extra) / smaller)
    }

    /// Best combined score if `x` shared elements go to `smaller` exclusively.
    fn separately(&self, larger: f64, smaller: f64, inter: f64) -> Option<f64> {
        let d = self.delta;
        let ub_x = inter.min((1.0 - d) * smaller);
        let lb_x = inter - larger * (1.0 - d);
        if lb_x > ub_x - SCORE_EPSILON {
            return None;
        }
        Some((larger - inter + lb_x) / larger + (smaller - lb_x) / smaller)
    }
}

impl SimilarityFunction for Jaccard {
    fn name(&self) -> &'static str {
        "Jaccard"
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
        let union = target.len() + container.len() - inter;
        if union == 0 {
            return false;
        }
        inter as f64 / union as f64 > self.delta - SCORE_EPSILON
    }

    fn num_missing(&self, target: &ElementSet, container: &ElementSet) -> f64 {
        let inter = intersection_len(target, container) as f64;
        let union = (target.len() + container.len()) as f64 - inter;
        union * self.delta - inter
    }
}
