//! # oct-kernel
//!
//! Overlapping category trees: organize a collection of weighted,
//! overlapping sets ("queries") into a hierarchy whose categories cover the
//! queries beneath them within a similarity threshold δ.
//!
//! ## Core Contract
//!
//! 1. Classify every intersecting query pair as CONFLICT, MUST or NEUTRAL
//! 2. Select a weight-maximal conflict-free subset (independent set)
//! 3. Build a tree from MUST relations, repair duplicated elements so each
//!    element lives on a single root-to-leaf chain, and merge overlapping
//!    siblings
//! 4. Score the weight of queries covered by the finished tree
//!
//! ## Architecture
//!
//! ```text
//! Dataset → Components → RelationSet → IndependentSet → CategoryTree
//!                                                           ↓
//!                                  DuplicateResolver → TreeExpander → Coverage
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same dataset + same configuration → identical trees and fingerprints
//! - Ties are always broken by size-major order (larger queries first)
//! - Parallel and sequential runs produce identical results

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod similarity;
pub mod relations;
pub mod independent_set;
pub mod tree;
pub mod coverage;
pub mod dataset;
pub mod policy;
pub mod pipeline;
pub mod canonical;

// Re-exports
pub use types::{
    Category, CategoryId, CategoryTree, Component, ComponentError, Element, ElementSet, Query, QueryId,
    Relation, TripleConflict,
};
pub use similarity::{Exact, Jaccard, PerfectRecall, Similarity, SimilarityFunction, SimilarityKind, F1};
pub use relations::{RelationSet, RelationStats};
pub use independent_set::{Heuristic, IndependentSet};
pub use tree::{
    build_tree, find_duplicates, verify_tree, DuplicateResolver, ExpandStats, InvariantViolation, ResolveStats,
    TreeError, TreeExpander,
};
pub use coverage::{Coverage, CoverageScope, CoverageScorer};
pub use dataset::{Dataset, DatasetError, DatasetStats, RawQuery};
pub use policy::{ConfigError, PipelineConfig};
pub use pipeline::{sweep, sweep_with, ComponentResult, Pipeline, PipelineError, PipelineReport, PipelineRun, SweepReport};
pub use canonical::{canonical_hash, canonical_hash_hex, to_canonical_bytes};

/// Schema version of serialized reports.
/// Increment on breaking changes to any report type.
pub const OCT_SCHEMA_VERSION: &str = "1.0.0";

/// Default configuration version identifier.
pub const DEFAULT_CONFIG_VERSION: &str = "pipeline_config_v1";
