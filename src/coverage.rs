//! Coverage scoring of a finished tree.
//!
//! An independent-set member is covered when some category on the path from
//! its own category up to the root covers it. Any other query is covered
//! when some category reachable from the root through subtrees whose
//! declared `elms` intersect the query covers it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::independent_set::IndependentSet;
use crate::similarity::SimilarityFunction;
use crate::types::{CategoryTree, Component, QueryId};

/// Which queries are scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageScope {
    /// Independent-set members only.
    IndependentSet,
    /// Every query of the component.
    AllQueries,
}

/// Covered queries of one component.
#[derive(Debug, Clone, Default)]
pub struct Coverage {
    /// Covered queries.
    pub covered: BTreeSet<QueryId>,
    /// Weight of covered independent-set members.
    pub member_weight: f64,
    /// Weight of covered queries outside the independent set.
    pub other_weight: f64,
}

impl Coverage {
    /// Total covered weight.
    pub fn weight(&self) -> f64 {
        self.member_weight + self.other_weight
    }
}

/// Scores one component's tree against its queries.
pub struct CoverageScorer<'a, S: SimilarityFunction + ?Sized> {
    component: &'a Component,
    sim: &'a S,
}

impl<'a, S: SimilarityFunction + ?Sized> CoverageScorer<'a, S> {
    /// Create a scorer.
    pub fn new(component: &'a Component, sim: &'a S) -> Self {
        Self { component, sim }
    }

    /// Whether a member is covered on the path from its category to the root.
    ///
    /// Queries without a category are never covered this way.
    pub fn is_member_covered(&self, tree: &CategoryTree, query: QueryId) -> bool {
        let Some(category) = tree.category_of(query) else {
            return false;
        };
        let target = &self.component.query(query).elements;
        tree.ancestors(category)
            .any(|c| self.sim.is_covering(target, &tree.get(c).actual_elms))
    }

    /// Whether a query is covered by some category reachable from the root
    /// through subtrees whose declared elements intersect it.
    pub fn is_reachable_covered(&self, tree: &CategoryTree, query: QueryId) -> bool {
        let target = &self.component.query(query).elements;
        let mut stack = vec![tree.root()];
        while let Some(id) = stack.pop() {
            let category = tree.get(id);
            if self.sim.is_covering(target, &category.actual_elms) {
                return true;
            }
            stack.extend(
                category
                    .children
                    .iter()
                    .rev()
                    .copied()
                    .filter(|&c| !tree.get(c).elms.is_disjoint(target)),
            );
        }
        false
    }

    /// Members of `members` that are currently covered.
    pub fn covered_members<'m>(
        &self,
        tree: &CategoryTree,
        members: impl IntoIterator<Item = &'m QueryId>,
    ) -> BTreeSet<QueryId> {
        members
            .into_iter()
            .copied()
            .filter(|&q| self.is_member_covered(tree, q))
            .collect()
    }

    /// Score the tree.
    pub fn score(&self, tree: &CategoryTree, independent_set: &IndependentSet, scope: CoverageScope) -> Coverage {
        let mut coverage = Coverage::default();

        for q in self.covered_members(tree, &independent_set.members) {
            coverage.member_weight += self.component.query(q).weight;
            coverage.covered.insert(q);
        }

        if scope == CoverageScope::AllQueries {
            for q in self.component.query_ids().filter(|q| !independent_set.contains(*q)) {
                if self.is_reachable_covered(tree, q) {
                    coverage.other_weight += self.component.query(q).weight;
                    coverage.covered.insert(q);
                }
            }
        }

        coverage
    }
}
