//! Connected clusters of mutually intersecting queries.

use std::collections::{BTreeMap, BTreeSet};

use super::query::{ElementSet, Query, QueryId};

/// Error type for component construction.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ComponentError {
    /// Query with zero/negative weight or an empty element set.
    #[error("Degenerate query '{name}': weight must be positive and elements non-empty")]
    DegenerateQuery {
        /// Offending query.
        name: String,
    },
    /// Two queries share a rank.
    #[error("Duplicate rank {rank} in component {component}")]
    DuplicateRank {
        /// Component id.
        component: usize,
        /// Repeated rank.
        rank: u32,
    },
    /// An intersecting pair references a rank that is not in the component.
    #[error("Intersecting pair references unknown rank {0}")]
    UnknownRank(u32),
    /// Component has no queries.
    #[error("Component {0} has no queries")]
    EmptyComponent(usize),
}

/// A maximal cluster of queries connected by pairwise intersection.
///
/// Queries are stored in size-major order (largest first), so
/// `QueryId` order is size-major order. Intersecting pairs are
/// oriented `(larger, smaller)`.
#[derive(Debug, Clone)]
pub struct Component {
    id: usize,
    queries: Vec<Query>,
    intersecting_pairs: Vec<(QueryId, QueryId)>,
    weight: f64,
}

impl Component {
    /// Create a component from its queries and the intersecting pairs
    /// found by the caller, expressed as query ranks.
    pub fn new(
        id: usize,
        mut queries: Vec<Query>,
        pairs_by_rank: &[(u32, u32)],
    ) -> Result<Self, ComponentError> {
        if queries.is_empty() {
            return Err(ComponentError::EmptyComponent(id));
        }
        if let Some(q) = queries.iter().find(|q| q.is_degenerate()) {
            return Err(ComponentError::DegenerateQuery {
                name: q.name.clone(),
            });
        }

        queries.sort_by_key(|q| q.rank);

        let mut by_rank: BTreeMap<u32, QueryId> = BTreeMap::new();
        for (idx, q) in queries.iter().enumerate() {
            if by_rank.insert(q.rank, QueryId::new(idx)).is_some() {
                return Err(ComponentError::DuplicateRank {
                    component: id,
                    rank: q.rank,
                });
            }
        }

        let mut pairs: BTreeSet<(QueryId, QueryId)> = BTreeSet::new();
        for &(ra, rb) in pairs_by_rank {
            let a = *by_rank.get(&ra).ok_or(ComponentError::UnknownRank(ra))?;
            let b = *by_rank.get(&rb).ok_or(ComponentError::UnknownRank(rb))?;
            if a != b {
                pairs.insert(if a < b { (a, b) } else { (b, a) });
            }
        }

        let weight = queries.iter().map(|q| q.weight).sum();

        Ok(Self {
            id,
            queries,
            intersecting_pairs: pairs.into_iter().collect(),
            weight,
        })
    }

    /// Create a component and find its intersecting pairs by brute force.
    pub fn from_queries(id: usize, queries: Vec<Query>) -> Result<Self, ComponentError> {
        let mut pairs = Vec::new();
        for (i, a) in queries.iter().enumerate() {
            for b in &queries[i + 1..] {
                if a.intersects(&b.elements) {
                    pairs.push((a.rank, b.rank));
                }
            }
        }
        Self::new(id, queries, &pairs)
    }

    /// Component id (position in the dataset's component list).
    pub fn id(&self) -> usize {
        self.id
    }

    /// Queries in size-major order.
    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    /// Get a query by id.
    ///
    /// Ids are only ever produced by this component, so indexing is in range.
    pub fn query(&self, id: QueryId) -> &Query {
        &self.queries[id.index()]
    }

    /// All query ids in size-major order.
    pub fn query_ids(&self) -> impl Iterator<Item = QueryId> + '_ {
        (0..self.queries.len()).map(QueryId::new)
    }

    /// Find a query by name.
    pub fn find(&self, name: &str) -> Option<QueryId> {
        self.queries
            .iter()
            .position(|q| q.name == name)
            .map(QueryId::new)
    }

    /// Intersecting pairs, oriented `(larger, smaller)` and sorted.
    pub fn intersecting_pairs(&self) -> &[(QueryId, QueryId)] {
        &self.intersecting_pairs
    }

    /// Number of queries.
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// Whether the component has no queries (never true once constructed).
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Total weight of all queries.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Total weight of a subset of queries.
    pub fn weight_of<'a>(&self, ids: impl IntoIterator<Item = &'a QueryId>) -> f64 {
        ids.into_iter().map(|id| self.query(*id).weight).sum()
    }

    /// Union of the elements of the given queries.
    pub fn elements_of<'a>(&self, ids: impl IntoIterator<Item = &'a QueryId>) -> ElementSet {
        let mut all = ElementSet::new();
        for id in ids {
            all.extend(self.query(*id).elements.iter().copied());
        }
        all
    }
}
