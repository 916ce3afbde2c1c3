//! Similarity functions (relation classifiers).
//!
//! Every variant answers three questions, parameterized by a threshold δ and
//! a tolerance ε:
//!
//! | Operation | Meaning |
//! |-----------|---------|
//! | `compute_relation(larger, smaller)` | CONFLICT, MUST or NEUTRAL for an intersecting pair |
//! | `is_covering(target, container)` | whether `container` covers `target` within δ |
//! | `num_missing(target, container)` | how many elements `container` must gain to cover `target` |
//!
//! All operations are pure. Callers must never pass empty sets; the loader
//! and [`crate::types::Component`] reject degenerate queries upstream.

pub mod jaccard;
pub mod f1;
pub mod perfect_recall;
pub mod exact;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::{ElementSet, Relation};

pub use jaccard::Jaccard;
pub use f1::F1;
pub use perfect_recall::PerfectRecall;
pub use exact::Exact;

/// Tolerance used by the Jaccard and F1 variants.
pub const SCORE_EPSILON: f64 = 1e-4;

/// Tolerance used by the PerfectRecall and Exact variants.
pub const CONTAINMENT_EPSILON: f64 = 1e-3;

/// Capability set shared by all similarity variants.
pub trait SimilarityFunction: Send + Sync {
    /// Variant name for reports.
    fn name(&self) -> &'static str;

    /// Threshold δ.
    fn delta(&self) -> f64;

    /// Comparison tolerance ε.
    fn epsilon(&self) -> f64;

    /// Classify an intersecting pair, `larger` being the greater query in
    /// size-major order.
    fn compute_relation(&self, larger: &ElementSet, smaller: &ElementSet) -> Relation;

    /// Whether `container` covers `target`.
    fn is_covering(&self, target: &ElementSet, container: &ElementSet) -> bool;

    /// Elements `container` would need to gain for `is_covering` to hold.
    /// May be fractional; callers round it.
    fn num_missing(&self, target: &ElementSet, container: &ElementSet) -> f64;

    /// Whether triple conflicts must be derived from the MUST relations.
    fn has_triple_conflicts(&self) -> bool {
        self.delta() < 1.0
    }

    /// Whether the raw tree goes through duplicate resolution and expansion.
    ///
    /// Variants that never classify a pair as NEUTRAL produce trees whose
    /// branches are already disjoint.
    fn refines_tree(&self) -> bool {
        true
    }
}

/// Error returned when parsing a similarity variant name.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Unknown similarity function: {0}")]
pub struct UnknownSimilarity(pub String);

/// Selectable similarity variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityKind {
    /// Intersection over union.
    Jaccard,
    /// Harmonic mean of precision and recall.
    F1,
    /// Full containment plus a precision bound.
    PerfectRecall,
    /// Set equality.
    Exact,
}

impl FromStr for SimilarityKind {
    type Err = UnknownSimilarity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "jaccard" => Ok(Self::Jaccard),
            "f1" => Ok(Self::F1),
            "perfect_recall" => Ok(Self::PerfectRecall),
            "exact" => Ok(Self::Exact),
            _ => Err(UnknownSimilarity(s.to_string())),
        }
    }
}

impl fmt::Display for SimilarityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jaccard => write!(f, "jaccard"),
            Self::F1 => write!(f, "f1"),
            Self::PerfectRecall => write!(f, "perfect_recall"),
            Self::Exact => write!(f, "exact"),
        }
    }
}

/// Statically dispatched similarity function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Similarity {
    /// See [`Jaccard`].
    Jaccard(Jaccard),
    /// See [`F1`].
    F1(F1),
    /// See [`PerfectRecall`].
    PerfectRecall(PerfectRecall),
    /// See [`Exact`].
    Exact(Exact),
}

impl Similarity {
    /// Build a variant for threshold `delta`. Exact ignores `delta`.
    pub fn new(kind: SimilarityKind, delta: f64) -> Self {
        match kind {
            SimilarityKind::Jaccard => Self::Jaccard(Jaccard::new(delta)),
            SimilarityKind::F1 => Self::F1(F1::new(delta)),
            SimilarityKind::PerfectRecall => Self::PerfectRecall(PerfectRecall::new(delta)),
            SimilarityKind::Exact => Self::Exact(Exact::new()),
        }
    }

    /// Variant of this function.
    pub fn kind(&self) -> SimilarityKind {
        match self {
            Self::Jaccard(_) => SimilarityKind::Jaccard,
            Self::F1(_) => SimilarityKind::F1,
            Self::PerfectRecall(_) => SimilarityKind::PerfectRecall,
            Self::Exact(_) => SimilarityKind::Exact,
        }
    }

    fn inner(&self) -> &dyn SimilarityFunction {
        match self {
            Self::Jaccard(s) => s,
            Self::F1(s) => s,
            Self::PerfectRecall(s) => s,
            Self::Exact(s) => s,
        }
    }
}

impl SimilarityFunction for Similarity {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn delta(&self) -> f64 {
        self.inner().delta()
    }

    fn epsilon(&self) -> f64 {
        self.inner().epsilon()
    }

    fn compute_relation(&self, larger: &ElementSet, smaller: &ElementSet) -> Relation {
        self.inner().compute_relation(larger, smaller)
    }

    fn is_covering(&self, target: &ElementSet, container: &ElementSet) -> bool {
        self.inner().is_covering(target, container)
    }

    fn num_missing(&self, target: &ElementSet, container: &ElementSet) -> f64 {
        self.inner().num_missing(target, container)
    }

    fn has_triple_conflicts(&self) -> bool {
        self.inner().has_triple_conflicts()
    }

    fn refines_tree(&self) -> bool {
        self.inner().refines_tree()
    }
}

/// Size of `a ∩ b`, iterating the smaller set.
pub(crate) fn intersection_len(a: &ElementSet, b: &ElementSet) -> usize {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small.iter().filter(|e| large.contains(e)).count()
}

/// Turn the two feasibility scores of an interval analysis into a relation.
///
/// `None` means the corresponding interval is empty.
pub(crate) fn decide(together: Option<f64>, separately: Option<f64>, epsilon: f64) -> Relation {
    match (together, separately) {
        (None, None) => Relation::Conflict,
        (Some(_), None) => Relation::Must,
        (Some(t), Some(s)) if t > s + epsilon => Relation::Must,
        _ => Relation::Neutral,
    }
}
