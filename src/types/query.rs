//! Query and element types.
//!
//! A query is a named, weighted set of atomic elements. Queries carry a
//! globally unique rank assigned at load time: larger element sets get
//! smaller ranks. The resulting "size-major" order (smaller rank = greater
//! query) governs pair orientation and every tie-break in the pipeline.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

/// Opaque atomic element. Elements are interned by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Element(u32);

impl Element {
    /// Create an element from its interned id.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the interned id.
    pub fn id(&self) -> u32 {
        self.0
    }
}

impl From<u32> for Element {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Set of elements. Ordered so that every traversal is deterministic.
pub type ElementSet = BTreeSet<Element>;

/// Index of a query inside its component.
///
/// Components store their queries in size-major order, so `QueryId(0)` is
/// the largest query of the component and comparing ids compares queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QueryId(u32);

impl QueryId {
    /// Create a query id from an index.
    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// Zero-based index into the component's query list.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

/// A weighted, named set of elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Query name (unique within a dataset).
    pub name: String,
    /// Elements of the query.
    pub elements: ElementSet,
    /// Positive weight.
    pub weight: f64,
    /// Unique rank; larger element sets have smaller ranks.
    pub rank: u32,
}

impl Query {
    /// Create a new query.
    pub fn new(name: impl Into<String>, elements: ElementSet, weight: f64, rank: u32) -> Self {
        Self {
            name: name.into(),
            elements,
            weight,
            rank,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the query has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Whether the query shares at least one element with `other`.
    pub fn intersects(&self, other: &ElementSet) -> bool {
        !self.elements.is_disjoint(other)
    }

    /// A query is degenerate if it cannot safely reach the similarity
    /// functions (division by its size or weight).
    pub fn is_degenerate(&self) -> bool {
        self.elements.is_empty() || !(self.weight.is_finite() && self.weight > 0.0)
    }

    /// Compare in size-major order: `Greater` iff `self` has the smaller rank.
    pub fn size_major_cmp(&self, other: &Self) -> Ordering {
        other.rank.cmp(&self.rank)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Build an element set from raw ids. Handy in tests and benches.
pub fn element_set<I: IntoIterator<Item = u32>>(ids: I) -> ElementSet {
    ids.into_iter().map(Element::new).collect()
}
