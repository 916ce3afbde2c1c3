//! Weighted independent sets over a component's conflict (hyper)graph.
//!
//! The conflict hypergraph has one vertex per query and one edge per
//! CONFLICT pair or triple conflict. A vertex touching no edge is a
//! singleton and always joins the result.
//!
//! ## Algorithms
//!
//! | Input | Heuristic |
//! |-------|-----------|
//! | pairs only | minimum relative burden: `Σ neighbour weight / own weight`, updated incrementally |
//! | pairs + triples | best of a build-up (min degree) and a peel-down (max degree) greedy |
//!
//! Either result gives way to the heaviest single query, together with every
//! query touching no edge, when that selection weighs more.
//!
//! All heuristics are deterministic: ties are broken by size-major order
//! (smaller `QueryId` first).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::relations::RelationSet;
use crate::types::{Component, QueryId};

/// Heuristic whose result was kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Heuristic {
    /// No conflicts at all: every query is a singleton.
    Trivial,
    /// Minimum relative burden over the pairwise conflict graph.
    WeightedGraph,
    /// Hypergraph build-up by minimum degree.
    HyperMin,
    /// Hypergraph peel-down by maximum degree.
    HyperMax,
    /// The heaviest query alone (plus conflict-free queries) outweighed
    /// the greedy result.
    Heaviest,
}

/// Conflict-free subset of a component's queries.
#[derive(Debug, Clone)]
pub struct IndependentSet {
    /// Selected queries.
    pub members: BTreeSet<QueryId>,
    /// Total weight of the selected queries.
    pub weight: f64,
    /// Heuristic that produced the set.
    pub heuristic: Heuristic,
}

impl IndependentSet {
    /// Whether `query` was selected.
    pub fn contains(&self, query: QueryId) -> bool {
        self.members.contains(&query)
    }

    /// Number of selected queries.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether nothing was selected.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Solve the weighted independent-set problem for one component.
pub fn solve(component: &Component, relations: &RelationSet) -> IndependentSet {
    let weights: Vec<f64> = component.queries().iter().map(|q| q.weight).collect();

    let (members, heuristic) = if relations.conflicts.is_empty() && relations.triple_conflicts.is_empty() {
        (component.query_ids().collect(), Heuristic::Trivial)
    } else if relations.triple_conflicts.is_empty() {
        let members = weighted_graph(component.query_ids(), &weights, &relations.conflicts);
        (members, Heuristic::WeightedGraph)
    } else {
        hypergraph(component.query_ids(), &weights, relations)
    };
    let (members, heuristic) = keep_heaviest(component, relations, members, heuristic);

    let weight = component.weight_of(&members);
    tracing::debug!(
        component = component.id(),
        size = members.len(),
        weight,
        heuristic = ?heuristic,
        "selected independent set"
    );

    IndependentSet {
        members,
        weight,
        heuristic,
    }
}

/// Fall back to the heaviest query plus every query touching no conflict
/// when that outweighs the greedy result, so the selection never weighs
/// less than the heaviest single query.
fn keep_heaviest(
    component: &Component,
    relations: &RelationSet,
    members: BTreeSet<QueryId>,
    heuristic: Heuristic,
) -> (BTreeSet<QueryId>, Heuristic) {
    let Some(heaviest) = component
        .query_ids()
        .reduce(|best, q| if component.query(q).weight > component.query(best).weight { q } else { best })
    else {
        return (members, heuristic);
    };

    let mut touched: BTreeSet<QueryId> = relations.conflicts.iter().flat_map(|&(a, b)| [a, b]).collect();
    touched.extend(relations.triple_conflicts.iter().flat_map(|t| t.members()));

    let mut fallback: BTreeSet<QueryId> = component.query_ids().filter(|q| !touched.contains(q)).collect();
    fallback.insert(heaviest);

    if component.weight_of(&fallback) > component.weight_of(&members) {
        (fallback, Heuristic::Heaviest)
    } else {
        (members, heuristic)
    }
}

/// Minimum relative burden heuristic for pairwise conflicts.
///
/// After each pick, the burden of every vertex adjacent to a removed
/// neighbour is reduced by `neighbour.weight / vertex.weight` in place
/// rather than recomputed.
pub fn weighted_graph(
    vertices: impl IntoIterator<Item = QueryId>,
    weights: &[f64],
    conflicts: &BTreeSet<(QueryId, QueryId)>,
) -> BTreeSet<QueryId> {
    let w = |q: QueryId| weights[q.index()];

    let mut adjacency: BTreeMap<QueryId, BTreeSet<QueryId>> = BTreeMap::new();
    for &(a, b) in conflicts {
        adjacency.entry(a).or_default().insert(b);
        adjacency.entry(b).or_default().insert(a);
    }

    let mut result: BTreeSet<QueryId> = vertices
        .into_iter()
        .filter(|v| !adjacency.contains_key(v))
        .collect();

    let mut burden: BTreeMap<QueryId, f64> = adjacency
        .iter()
        .map(|(&v, ns)| (v, ns.iter().map(|&n| w(n)).sum::<f64>() / w(v)))
        .collect();

    while let Some(chosen) = adjacency
        .keys()
        .copied()
        .min_by(|a, b| burden[a].total_cmp(&burden[b]))
    {
        result.insert(chosen);

        let neighbours = adjacency.get(&chosen).cloned().unwrap_or_default();
        let mut removed = neighbours.clone();
        removed.insert(chosen);

        for &n in &neighbours {
            if let Some(extended) = adjacency.get(&n) {
                for &ext in extended.iter().filter(|x| !removed.contains(x)) {
                    if let Some(score) = burden.get_mut(&ext) {
                        *score -= w(n) / w(ext);
                    }
                }
            }
        }

        for r in &removed {
            burden.remove(r);
            if let Some(ns) = adjacency.remove(r) {
                for x in ns {
                    if let Some(set) = adjacency.get_mut(&x) {
                        set.remove(r);
                    }
                }
            }
        }
    }

    result
}

/// Hyperedges as sorted member lists; a set of them deduplicates equal edges.
type Edges = BTreeSet<Vec<QueryId>>;
type Degrees = BTreeMap<QueryId, usize>;

fn hypergraph(
    vertices: impl IntoIterator<Item = QueryId>,
    weights: &[f64],
    relations: &RelationSet,
) -> (BTreeSet<QueryId>, Heuristic) {
    let mut edges: Edges = relations
        .conflicts
        .iter()
        .map(|&(a, b)| vec![a, b])
        .collect();
    for triple in &relations.triple_conflicts {
        let mut members = triple.members().to_vec();
        members.sort();
        members.dedup();
        edges.insert(members);
    }

    let mut degrees: Degrees = BTreeMap::new();
    for edge in &edges {
        for &v in edge {
            *degrees.entry(v).or_default() += 1;
        }
    }

    let singletons: BTreeSet<QueryId> = vertices
        .into_iter()
        .filter(|v| !degrees.contains_key(v))
        .collect();

    let by_min = hyper_min(edges.clone(), degrees.clone(), weights);
    let by_max = hyper_max(edges, degrees, weights);

    let weight_of = |set: &BTreeSet<QueryId>| set.iter().map(|q| weights[q.index()]).sum::<f64>();
    let (mut best, heuristic) = if weight_of(&by_max) > weight_of(&by_min) {
        (by_max, Heuristic::HyperMax)
    } else {
        (by_min, Heuristic::HyperMin)
    };
    best.extend(singletons);
    (best, heuristic)
}

/// Build-up greedy: repeatedly admit the vertex with the fewest edges
/// (heaviest on ties).
pub(crate) fn hyper_min(mut edges: Edges, mut degrees: Degrees, weights: &[f64]) -> BTreeSet<QueryId> {
    let mut result = BTreeSet::new();

    while let Some(chosen) = degrees
        .iter()
        .min_by(|(a, da), (b, db)| {
            da.cmp(db)
                .then_with(|| weights[b.index()].total_cmp(&weights[a.index()]))
        })
        .map(|(&v, _)| v)
    {
        result.insert(chosen);
        degrees.remove(&chosen);

        let mut forced_out: BTreeSet<QueryId> = BTreeSet::new();
        let incident: Vec<Vec<QueryId>> = edges.iter().filter(|e| e.contains(&chosen)).cloned().collect();
        for edge in incident {
            edges.remove(&edge);
            let others: Vec<QueryId> = edge.into_iter().filter(|&v| v != chosen).collect();
            if others.len() == 1 {
                // completing this edge would include all of it
                forced_out.insert(others[0]);
            } else if edges.contains(&others) {
                for v in &others {
                    decrement(&mut degrees, *v);
                }
            } else {
                edges.insert(others);
            }
        }

        for v in &forced_out {
            degrees.remove(v);
        }
        let touching: Vec<Vec<QueryId>> = edges
            .iter()
            .filter(|e| e.iter().any(|v| forced_out.contains(v)))
            .cloned()
            .collect();
        for edge in touching {
            edges.remove(&edge);
            for v in edge.iter().filter(|v| !forced_out.contains(v)) {
                decrement(&mut degrees, *v);
            }
        }

        let free: Vec<QueryId> = degrees.iter().filter(|(_, &d)| d == 0).map(|(&v, _)| v).collect();
        for v in free {
            degrees.remove(&v);
            result.insert(v);
        }
    }

    result
}

/// Peel-down greedy: repeatedly drop the vertex with the most edges
/// (lightest on ties) until no edge is left.
pub(crate) fn hyper_max(mut edges: Edges, mut degrees: Degrees, weights: &[f64]) -> BTreeSet<QueryId> {
    while !edges.is_empty() {
        let Some(chosen) = degrees
            .iter()
            .min_by(|(a, da), (b, db)| {
                db.cmp(da)
                    .then_with(|| weights[a.index()].total_cmp(&weights[b.index()]))
            })
            .map(|(&v, _)| v)
        else {
            break;
        };
        degrees.remove(&chosen);

        let incident: Vec<Vec<QueryId>> = edges.iter().filter(|e| e.contains(&chosen)).cloned().collect();
        for edge in incident {
            edges.remove(&edge);
            for v in edge.iter().filter(|&&v| v != chosen) {
                decrement(&mut degrees, *v);
            }
        }
    }

    degrees.into_keys().collect()
}

fn decrement(degrees: &mut Degrees, v: QueryId) {
    if let Some(d) = degrees.get_mut(&v) {
        *d = d.saturating_sub(1);
    }
}
