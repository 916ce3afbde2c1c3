//! Per-component pipeline and run orchestration.
//!
//! ```text
//! Component → relations → independent set → raw tree
//!                                              ↓ (Jaccard, F1)
//!                                     resolve duplicates → expand
//!                                              ↓
//!                                           coverage
//! ```
//!
//! Components never share state, so [`Pipeline::run`] dispatches them on the
//! rayon pool when `config.parallel` is set and re-orders results by
//! component id before aggregating.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use std::time::Instant;

use crate::canonical::canonical_hash_hex;
use crate::coverage::{Coverage, CoverageScope, CoverageScorer};
use crate::dataset::{Dataset, DatasetError, DatasetStats};
use crate::independent_set::{self, IndependentSet};
use crate::policy::{ConfigError, PipelineConfig};
use crate::relations::{RelationSet, RelationStats};
use crate::similarity::{Similarity, SimilarityFunction};
use crate::tree::{
    build_tree, verify_tree, DuplicateResolver, ExpandStats, InvariantViolation, ResolveStats, TreeError,
    TreeExpander,
};
use crate::types::{CategoryTree, Component};
use crate::OCT_SCHEMA_VERSION;

/// Error type for pipeline runs.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Dataset could not be loaded.
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// Tree construction or repair failed.
    #[error("Component {component}: {source}")]
    Tree {
        /// Component id.
        component: usize,
        /// Underlying error.
        #[source]
        source: TreeError,
    },

    /// A tree invariant does not hold after a stage.
    #[error("Component {component} after {stage}: {source}")]
    Invariant {
        /// Component id.
        component: usize,
        /// Stage after which the check failed.
        stage: &'static str,
        /// Underlying violation.
        #[source]
        source: InvariantViolation,
    },
}

/// Wall-clock time per stage, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StageTimings {
    /// Relation classification.
    pub relations_ms: f64,
    /// Independent-set solving.
    pub independent_set_ms: f64,
    /// Raw tree construction.
    pub build_ms: f64,
    /// Duplicate resolution.
    pub resolve_ms: f64,
    /// Expansion.
    pub expand_ms: f64,
    /// Coverage scoring.
    pub coverage_ms: f64,
}

impl StageTimings {
    /// Sum of all stages.
    pub fn total_ms(&self) -> f64 {
        self.relations_ms + self.independent_set_ms + self.build_ms + self.resolve_ms + self.expand_ms + self.coverage_ms
    }
}

impl AddAssign for StageTimings {
    fn add_assign(&mut self, rhs: Self) {
        self.relations_ms += rhs.relations_ms;
        self.independent_set_ms += rhs.independent_set_ms;
        self.build_ms += rhs.build_ms;
        self.resolve_ms += rhs.resolve_ms;
        self.expand_ms += rhs.expand_ms;
        self.coverage_ms += rhs.coverage_ms;
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Everything the pipeline produced for one component.
#[derive(Debug, Clone)]
pub struct ComponentResult {
    /// Component id.
    pub component: usize,
    /// Relation counts.
    pub relations: RelationStats,
    /// Selected independent set.
    pub independent_set: IndependentSet,
    /// Finished tree.
    pub tree: CategoryTree,
    /// Depth of the raw tree.
    pub initial_depth: usize,
    /// Duplicate resolution summary, when the variant refines trees.
    pub resolve: Option<ResolveStats>,
    /// Expansion summary, when the variant refines trees.
    pub expand: Option<ExpandStats>,
    /// Covered member weight right before expansion.
    pub member_weight_before_expand: f64,
    /// Final coverage over all queries.
    pub coverage: Coverage,
    /// Stage timings.
    pub timings: StageTimings,
}

/// Independent-set totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndependentSetStats {
    /// Weight of all independent sets.
    pub weight: f64,
    /// Weight of all component queries.
    pub graph_weight: f64,
    /// `weight / graph_weight`.
    pub ratio: f64,
}

/// Tree totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeStats {
    /// Deepest raw tree.
    pub initial_depth: usize,
    /// Deepest finished tree.
    pub depth: usize,
    /// Categories, roots included.
    pub categories: usize,
    /// Distinct elements placed in trees.
    pub elements: usize,
    /// Duplicates detected.
    pub duplicates: usize,
    /// Member weight lost by stripping duplicates.
    pub weight_lost: f64,
    /// Member weight regained by repair.
    pub weight_regained: f64,
    /// Member weight gained by expansion.
    pub expansion_gain: f64,
}

/// Report of one run over a dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Configuration used.
    pub config: PipelineConfig,
    /// Hash of the algorithmic parameters.
    pub params_hash: String,
    /// Preprocessing statistics.
    pub dataset: DatasetStats,
    /// Relation counts.
    pub relations: RelationStats,
    /// Independent-set totals.
    pub independent_set: IndependentSetStats,
    /// Tree totals.
    pub tree: TreeStats,
    /// Covered weight of independent-set members.
    pub member_weight: f64,
    /// Covered weight over all component queries.
    pub covered_weight: f64,
    /// `(covered + trivial) / total`.
    pub final_score: f64,
    /// Summed stage timings.
    pub timings: StageTimings,
    /// Hash over every component's tree fingerprint.
    pub fingerprint: String,
}

/// Result of [`Pipeline::run`].
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// Aggregate report.
    pub report: PipelineReport,
    /// Per-component results, ordered by component id.
    pub components: Vec<ComponentResult>,
}

/// Report of a δ sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    /// Report schema version.
    pub schema_version: String,
    /// When the sweep started.
    pub started_at: DateTime<Utc>,
    /// One report per δ, in request order.
    pub runs: Vec<PipelineReport>,
}

impl SweepReport {
    /// `(δ, final score)` per run.
    pub fn scores(&self) -> Vec<(f64, f64)> {
        self.runs.iter().map(|r| (r.config.delta, r.final_score)).collect()
    }
}

/// Runs the full pipeline for one configuration.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    sim: Similarity,
    expander: TreeExpander,
}

impl Pipeline {
    /// Create a pipeline; fails on an invalid configuration.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let sim = config.similarity_function();
        let expander = TreeExpander::new(config.merge_threshold);
        Ok(Self { config, sim, expander })
    }

    /// Configuration in use.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Similarity function in use.
    pub fn similarity(&self) -> &Similarity {
        &self.sim
    }

    /// Run every stage on one component.
    pub fn run_component(&self, component: &Component) -> Result<ComponentResult, PipelineError> {
        let id = component.id();
        let tree_err = |source| PipelineError::Tree { component: id, source };
        let mut timings = StageTimings::default();

        let start = Instant::now();
        let relations = RelationSet::classify(component, &self.sim);
        timings.relations_ms = elapsed_ms(start);

        let start = Instant::now();
        let independent_set = independent_set::solve(component, &relations);
        timings.independent_set_ms = elapsed_ms(start);

        let start = Instant::now();
        let mut tree = build_tree(component, &relations, &independent_set).map_err(tree_err)?;
        timings.build_ms = elapsed_ms(start);
        let initial_depth = tree.max_depth();

        let scorer = CoverageScorer::new(component, &self.sim);
        let (resolve, expand, member_weight_before_expand) = if self.sim.refines_tree() {
            let start = Instant::now();
            let stats = DuplicateResolver::new(component, &self.sim, &independent_set.members)
                .resolve(&mut tree)
                .map_err(tree_err)?;
            timings.resolve_ms = elapsed_ms(start);
            self.check(id, "duplicate resolution", &tree)?;

            let start = Instant::now();
            let expanded = self.expander.expand(&mut tree);
            timings.expand_ms = elapsed_ms(start);
            self.check(id, "expansion", &tree)?;

            let before_expand = stats.weight_after;
            (Some(stats), Some(expanded), before_expand)
        } else {
            self.check(id, "build", &tree)?;
            let before = scorer.score(&tree, &independent_set, CoverageScope::IndependentSet);
            (None, None, before.member_weight)
        };

        let start = Instant::now();
        let coverage = scorer.score(&tree, &independent_set, CoverageScope::AllQueries);
        timings.coverage_ms = elapsed_ms(start);

        tracing::debug!(
            component = id,
            queries = component.len(),
            independent_set = independent_set.len(),
            categories = tree.len(),
            covered = coverage.covered.len(),
            "component done"
        );

        Ok(ComponentResult {
            component: id,
            relations: relations.stats(),
            independent_set,
            tree,
            initial_depth,
            resolve,
            expand,
            member_weight_before_expand,
            coverage,
            timings,
        })
    }

    fn check(&self, component: usize, stage: &'static str, tree: &CategoryTree) -> Result<(), PipelineError> {
        if !self.config.verify {
            return Ok(());
        }
        verify_tree(tree).map_err(|source| PipelineError::Invariant {
            component,
            stage,
            source,
        })
    }

    /// Run every component of `dataset` and aggregate.
    pub fn run(&self, dataset: &Dataset) -> Result<PipelineRun, PipelineError> {
        tracing::info!(
            similarity = %self.config.similarity,
            delta = self.config.delta,
            components = dataset.components.len(),
            parallel = self.config.parallel,
            "pipeline started"
        );

        let mut components = if self.config.parallel {
            self.run_parallel(&dataset.components)?
        } else {
            self.run_sequential(&dataset.components)?
        };
        components.sort_by_key(|r| r.component);

        let report = self.aggregate(dataset, &components);
        tracing::info!(
            delta = self.config.delta,
            covered_weight = report.covered_weight,
            final_score = report.final_score,
            total_ms = report.timings.total_ms(),
            "pipeline finished"
        );
        Ok(PipelineRun { report, components })
    }

    fn run_parallel(&self, components: &[Component]) -> Result<Vec<ComponentResult>, PipelineError> {
        components.par_iter().map(|c| self.run_component(c)).collect()
    }

    fn run_sequential(&self, components: &[Component]) -> Result<Vec<ComponentResult>, PipelineError> {
        components.iter().map(|c| self.run_component(c)).collect()
    }

    fn aggregate(&self, dataset: &Dataset, results: &[ComponentResult]) -> PipelineReport {
        let mut relations = RelationStats::default();
        let mut timings = StageTimings::default();
        let mut independent = IndependentSetStats::default();
        let mut tree = TreeStats::default();
        let mut member_weight = 0.0;
        let mut covered_weight = 0.0;

        for (result, component) in results.iter().zip(&dataset.components) {
            relations += result.relations;
            timings += result.timings;
            independent.weight += result.independent_set.weight;
            independent.graph_weight += component.weight();

            tree.initial_depth = tree.initial_depth.max(result.initial_depth);
            tree.depth = tree.depth.max(result.tree.max_depth());
            tree.categories += result.tree.len();
            tree.elements += result.tree.get(result.tree.root()).elms.len();
            if let Some(stats) = &result.resolve {
                tree.duplicates += stats.duplicates;
                tree.weight_lost += stats.weight_lost();
                tree.weight_regained += stats.weight_regained();
            }
            tree.expansion_gain += result.coverage.member_weight - result.member_weight_before_expand;

            member_weight += result.coverage.member_weight;
            covered_weight += result.coverage.weight();
        }
        if independent.graph_weight > 0.0 {
            independent.ratio = independent.weight / independent.graph_weight;
        }

        let total = dataset.stats.total_weight;
        let final_score = if total > 0.0 {
            (covered_weight + dataset.stats.trivial_weight()) / total
        } else {
            0.0
        };
        let fingerprints: Vec<String> = results.iter().map(|r| r.tree.fingerprint()).collect();

        PipelineReport {
            config: self.config.clone(),
            params_hash: self.config.params_hash(),
            dataset: dataset.stats.clone(),
            relations,
            independent_set: independent,
            tree,
            member_weight,
            covered_weight,
            final_score,
            timings,
            fingerprint: canonical_hash_hex(&fingerprints),
        }
    }
}

/// Run the pipeline once per δ over the same dataset.
pub fn sweep(dataset: &Dataset, base: &PipelineConfig, deltas: &[f64]) -> Result<SweepReport, PipelineError> {
    sweep_with(dataset, base, deltas, |_| {})
}

/// Like [`sweep`], handing every finished run to `on_run` before its
/// trees are dropped.
pub fn sweep_with(
    dataset: &Dataset,
    base: &PipelineConfig,
    deltas: &[f64],
    mut on_run: impl FnMut(&PipelineRun),
) -> Result<SweepReport, PipelineError> {
    let started_at = Utc::now();
    let mut runs = Vec::with_capacity(deltas.len());
    for &delta in deltas {
        let pipeline = Pipeline::new(base.with_delta(delta))?;
        let run = pipeline.run(dataset)?;
        on_run(&run);
        runs.push(run.report);
    }
    Ok(SweepReport {
        schema_version: OCT_SCHEMA_VERSION.to_string(),
        started_at,
        runs,
    })
}
