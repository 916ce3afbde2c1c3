//! Relation classification over one component.
//!
//! Every intersecting pair `(larger, smaller)` is classified by the
//! similarity function. CONFLICT pairs feed the independent-set solver, MUST
//! pairs become the ancestor index the tree builder reads. When the variant
//! asks for it, triple conflicts are derived from the MUST index: a child
//! with two MUST-parents that are neither MUST-related nor in conflict with
//! each other cannot keep both as ancestors.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::AddAssign;

use crate::similarity::SimilarityFunction;
use crate::types::{Component, QueryId, Relation, TripleConflict};

/// Classified relations of one component.
#[derive(Debug, Clone, Default)]
pub struct RelationSet {
    /// CONFLICT pairs, oriented `(larger, smaller)`.
    pub conflicts: BTreeSet<(QueryId, QueryId)>,
    /// MUST index: child → every query it must nest under.
    pub must_parents: BTreeMap<QueryId, BTreeSet<QueryId>>,
    /// Derived triple conflicts.
    pub triple_conflicts: BTreeSet<TripleConflict>,
    /// Number of NEUTRAL pairs.
    pub neutral_pairs: usize,
}

impl RelationSet {
    /// Classify every intersecting pair of `component`.
    pub fn classify<S: SimilarityFunction + ?Sized>(component: &Component, sim: &S) -> Self {
        let mut set = Self::default();

        for &(larger, smaller) in component.intersecting_pairs() {
            let relation = sim.compute_relation(
                &component.query(larger).elements,
                &component.query(smaller).elements,
            );
            match relation {
                Relation::Conflict => {
                    set.conflicts.insert((larger, smaller));
                }
                Relation::Must => {
                    set.must_parents.entry(smaller).or_default().insert(larger);
                }
                Relation::Neutral => set.neutral_pairs += 1,
            }
        }

        if sim.has_triple_conflicts() {
            set.derive_triple_conflicts();
        }

        tracing::debug!(
            component = component.id(),
            conflicts = set.conflicts.len(),
            must = set.must_pairs(),
            neutral = set.neutral_pairs,
            triples = set.triple_conflicts.len(),
            "classified relations"
        );
        set
    }

    fn derive_triple_conflicts(&mut self) {
        for (&child, parents) in &self.must_parents {
            let parents: Vec<QueryId> = parents.iter().copied().collect();
            for (i, &p1) in parents.iter().enumerate() {
                for &p2 in &parents[i + 1..] {
                    // p1 < p2, so p1 is the greater parent
                    let nested = self
                        .must_parents
                        .get(&p2)
                        .is_some_and(|ps| ps.contains(&p1));
                    if !nested && !self.conflicts.contains(&(p1, p2)) {
                        self.triple_conflicts.insert(TripleConflict::new(child, p1, p2));
                    }
                }
            }
        }
    }

    /// Whether the pair is in conflict, in either orientation.
    pub fn is_conflict(&self, a: QueryId, b: QueryId) -> bool {
        let key = if a < b { (a, b) } else { (b, a) };
        self.conflicts.contains(&key)
    }

    /// Whether `child` must nest under `parent`.
    pub fn is_must(&self, parent: QueryId, child: QueryId) -> bool {
        self.must_parents
            .get(&child)
            .is_some_and(|ps| ps.contains(&parent))
    }

    /// Number of MUST pairs.
    pub fn must_pairs(&self) -> usize {
        self.must_parents.values().map(BTreeSet::len).sum()
    }

    /// Summary counts.
    pub fn stats(&self) -> RelationStats {
        RelationStats {
            pair_conflicts: self.conflicts.len(),
            triple_conflicts: self.triple_conflicts.len(),
            must_pairs: self.must_pairs(),
            neutral_pairs: self.neutral_pairs,
        }
    }
}

/// Relation counts, summable across components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationStats {
    /// CONFLICT pairs.
    pub pair_conflicts: usize,
    /// Triple conflicts.
    pub triple_conflicts: usize,
    /// MUST pairs.
    pub must_pairs: usize,
    /// NEUTRAL pairs.
    pub neutral_pairs: usize,
}

impl AddAssign for RelationStats {
    fn add_assign(&mut self, rhs: Self) {
        self.pair_conflicts += rhs.pair_conflicts;
        self.triple_conflicts += rhs.triple_conflicts;
        self.must_pairs += rhs.must_pairs;
        self.neutral_pairs += rhs.neutral_pairs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::{Exact, Jaccard};
    use crate::types::{element_set, Query};

    fn component(sets: Vec<Vec<u32>>) -> Component {
        let queries = sets
            .into_iter()
            .enumerate()
            .map(|(i, s)| Query::new(format!("q{i}"), element_set(s), 1.0, i as u32))
            .collect();
        Component::from_queries(0, queries).unwrap()
    }

    #[test]
    fn test_exact_nested_is_must() {
        let comp = component(vec![vec![1, 2, 3, 4], vec![1, 2, 3]]);
        let rel = RelationSet::classify(&comp, &Exact::new());

        assert!(rel.is_must(QueryId::new(0), QueryId::new(1)));
        assert!(rel.conflicts.is_empty());
        assert!(rel.triple_conflicts.is_empty());
    }

    #[test]
    fn test_exact_overlap_is_conflict() {
        let comp = component(vec![vec![1, 2, 3, 4], vec![3, 4, 5]]);
        let rel = RelationSet::classify(&comp, &Exact::new());

        assert!(rel.is_conflict(QueryId::new(1), QueryId::new(0)));
        assert_eq!(rel.stats().pair_conflicts, 1);
    }

    #[test]
    fn test_triple_conflict_from_unrelated_parents() {
        // q0 = {1..10} and q1 = {10..19} share one element: neutral at δ = 0.9.
        // q2 = {10, 20} must nest under each of them.
        let comp = component(vec![(1..=10).collect(), (10..=19).collect(), vec![10, 20]]);
        let sim = Jaccard::new(0.9);
        let rel = RelationSet::classify(&comp, &sim);

        assert!(rel.is_must(QueryId::new(0), QueryId::new(2)));
        assert!(rel.is_must(QueryId::new(1), QueryId::new(2)));
        assert!(!rel.is_must(QueryId::new(0), QueryId::new(1)));
        assert!(!rel.is_conflict(QueryId::new(0), QueryId::new(1)));
        assert_eq!(
            rel.triple_conflicts.iter().copied().collect::<Vec<_>>(),
            vec![TripleConflict::new(QueryId::new(2), QueryId::new(0), QueryId::new(1))]
        );
    }

    #[test]
    fn test_stats_add() {
        let mut total = RelationStats::default();
        total += RelationStats { pair_conflicts: 1, triple_conflicts: 2, must_pairs: 3, neutral_pairs: 4 };
        total += RelationStats { pair_conflicts: 1, ..Default::default() };
        assert_eq!(total.pair_conflicts, 2);
        assert_eq!(total.neutral_pairs, 4);
    }
}
