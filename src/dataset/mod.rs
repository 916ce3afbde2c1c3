//! Dataset loading and preprocessing.
//!
//! ## Pipeline
//!
//! ```text
//! JSON → records → rank → drop short → merge duplicates → pairs → components
//! ```
//!
//! Short queries (at most one element) and isolated queries (intersecting
//! nothing) never reach the tree; their weight is reported as trivial weight
//! and counted as covered in the final score.

pub mod loader;

pub use loader::{parse_records, ElementInterner, RawQuery};

use petgraph::unionfind::UnionFind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::types::{Component, ComponentError, Element, ElementSet, Query};

/// Error type for dataset loading.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// The file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid JSON of the expected shape.
    #[error("Invalid dataset JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A record does not follow `[elements, weight?]`.
    #[error("Malformed record '{name}': {reason}")]
    MalformedRecord {
        /// Record name.
        name: String,
        /// What is wrong.
        reason: String,
    },

    /// Weight that is not a positive finite number.
    #[error("Invalid weight {weight} for '{name}'")]
    InvalidWeight {
        /// Record name.
        name: String,
        /// Offending weight.
        weight: f64,
    },

    /// Component construction failed.
    #[error(transparent)]
    Component(#[from] ComponentError),
}

/// Preprocessing statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetStats {
    /// Records read.
    pub queries: usize,
    /// Distinct elements over all records.
    pub elements: usize,
    /// Sum of all record weights.
    pub total_weight: f64,
    /// Queries with at most one element.
    pub short_queries: usize,
    /// Weight of short queries.
    pub short_weight: f64,
    /// Queries merged into an identical earlier query.
    pub duplicates: usize,
    /// Queries intersecting no other query.
    pub isolated_queries: usize,
    /// Weight of isolated queries.
    pub isolated_weight: f64,
    /// Intersecting pairs.
    pub intersecting_pairs: usize,
    /// Components with two or more queries.
    pub components: usize,
    /// Queries in the largest component.
    pub largest_component: usize,
}

impl DatasetStats {
    /// Weight that is covered without any tree: short plus isolated.
    pub fn trivial_weight(&self) -> f64 {
        self.short_weight + self.isolated_weight
    }
}

/// A preprocessed dataset: components ready for the pipeline.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Components, largest first.
    pub components: Vec<Component>,
    /// Preprocessing statistics.
    pub stats: DatasetStats,
}

impl Dataset {
    /// Read and preprocess a JSON dataset file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Preprocess a JSON dataset document.
    pub fn from_json_str(json: &str) -> Result<Self, DatasetError> {
        let (records, _) = parse_records(json)?;
        Self::from_records(records)
    }

    /// Preprocess in-memory records.
    pub fn from_records(records: Vec<RawQuery>) -> Result<Self, DatasetError> {
        let mut stats = DatasetStats {
            queries: records.len(),
            total_weight: records.iter().map(|r| r.weight).sum(),
            ..Default::default()
        };
        let all_elements: BTreeSet<Element> = records.iter().flat_map(|r| r.elements.iter().copied()).collect();
        stats.elements = all_elements.len();

        let ranked = rank(records);
        let (kept, short): (Vec<RawQuery>, Vec<RawQuery>) = ranked.into_iter().partition(|r| r.elements.len() > 1);
        stats.short_queries = short.len();
        stats.short_weight = short.iter().map(|r| r.weight).sum();

        let (queries, duplicates) = merge_duplicates(kept);
        stats.duplicates = duplicates;

        let pairs = intersecting_pairs(&queries);
        stats.intersecting_pairs = pairs.len();

        let mut union_find = UnionFind::<usize>::new(queries.len());
        for &(a, b) in &pairs {
            union_find.union(a, b);
        }
        let labels = union_find.into_labeling();

        let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (idx, &label) in labels.iter().enumerate() {
            groups.entry(label).or_default().push(idx);
        }
        let mut pairs_by_group: BTreeMap<usize, Vec<(u32, u32)>> = BTreeMap::new();
        for &(a, b) in &pairs {
            pairs_by_group
                .entry(labels[a])
                .or_default()
                .push((queries[a].rank, queries[b].rank));
        }

        let mut clusters: Vec<(usize, Vec<usize>)> = Vec::new();
        for (label, members) in groups {
            if let [single] = members.as_slice() {
                stats.isolated_queries += 1;
                stats.isolated_weight += queries[*single].weight;
            } else {
                clusters.push((label, members));
            }
        }
        // largest first; ties keep the order of their best-ranked member
        clusters.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then(a.1[0].cmp(&b.1[0])));

        let mut components = Vec::with_capacity(clusters.len());
        for (id, (label, members)) in clusters.into_iter().enumerate() {
            let component_queries: Vec<Query> = members.iter().map(|&i| queries[i].clone()).collect();
            let component_pairs = pairs_by_group.remove(&label).unwrap_or_default();
            components.push(Component::new(id, component_queries, &component_pairs)?);
        }

        stats.components = components.len();
        stats.largest_component = components.first().map_or(0, Component::len);

        tracing::debug!(
            queries = stats.queries,
            short = stats.short_queries,
            duplicates = stats.duplicates,
            isolated = stats.isolated_queries,
            components = stats.components,
            "preprocessed dataset"
        );

        Ok(Self { components, stats })
    }

    /// Number of queries that reached a component.
    pub fn query_count(&self) -> usize {
        self.components.iter().map(Component::len).sum()
    }
}

/// Order records size-major: more elements first, ties by name.
fn rank(mut records: Vec<RawQuery>) -> Vec<RawQuery> {
    records.sort_by(|a, b| {
        b.elements
            .len()
            .cmp(&a.elements.len())
            .then_with(|| a.name.cmp(&b.name))
    });
    records
}

/// Fold identical element sets into their best-ranked query; returns the
/// ranked queries and the number of folded records.
fn merge_duplicates(ranked: Vec<RawQuery>) -> (Vec<Query>, usize) {
    let mut first_seen: BTreeMap<ElementSet, usize> = BTreeMap::new();
    let mut queries: Vec<Query> = Vec::with_capacity(ranked.len());
    let mut duplicates = 0;

    for record in ranked {
        if let Some(&idx) = first_seen.get(&record.elements) {
            queries[idx].weight += record.weight;
            duplicates += 1;
            continue;
        }
        let rank = queries.len() as u32;
        first_seen.insert(record.elements.clone(), queries.len());
        queries.push(Query::new(record.name, record.elements, record.weight, rank));
    }
    (queries, duplicates)
}

/// Intersecting pairs as `(i, j)` positions with `i < j`, found through an
/// element → query inverted index.
fn intersecting_pairs(queries: &[Query]) -> BTreeSet<(usize, usize)> {
    let mut index: BTreeMap<Element, Vec<usize>> = BTreeMap::new();
    for (i, q) in queries.iter().enumerate() {
        for &e in &q.elements {
            index.entry(e).or_default().push(i);
        }
    }

    let mut pairs = BTreeSet::new();
    for holders in index.values() {
        for (k, &a) in holders.iter().enumerate() {
            for &b in &holders[k + 1..] {
                pairs.insert((a, b));
            }
        }
    }
    pairs
}
