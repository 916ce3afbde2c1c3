//! Golden tests for the category kernel.
//!
//! These tests pin down the documented scenarios and the determinism of the
//! full pipeline.

use oct_kernel::independent_set::{self, Heuristic};
use oct_kernel::types::element_set;
use oct_kernel::{
    build_tree, CategoryTree, Dataset, Exact, Jaccard, Pipeline, PipelineConfig, QueryId, RawQuery, Relation,
    RelationSet, SimilarityFunction, SimilarityKind, TreeExpander,
};

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn raw(name: &str, elements: impl IntoIterator<Item = u32>, weight: f64) -> RawQuery {
    RawQuery::new(name, element_set(elements), weight)
}

fn scenario_b_dataset() -> Dataset {
    Dataset::from_records(vec![
        raw("q0", 1..=10, 1.0),
        raw("q1", 10..=19, 1.0),
        raw("q2", [10, 20], 1.0),
    ])
    .unwrap()
}

/// A catalogue-like dataset with nested, overlapping and disjoint queries.
fn catalogue() -> Dataset {
    Dataset::from_records(vec![
        raw("electronics", 1..=40, 5.0),
        raw("computers", 1..=20, 3.0),
        raw("laptops", 1..=12, 4.0),
        raw("gaming laptops", 8..=14, 2.0),
        raw("phones", 21..=34, 3.0),
        raw("smartphones", 21..=30, 4.0),
        raw("refurbished", [5, 6, 25, 26, 35, 36], 1.0),
        raw("accessories", 35..=48, 2.0),
        raw("cables", 41..=46, 1.0),
        raw("audio", 60..=70, 2.0),
        raw("headphones", 62..=68, 3.0),
        raw("gift card", [99], 1.0),
    ])
    .unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenario A: nested pair under Exact similarity
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_scenario_a_exact_nested_pair() {
    let dataset = Dataset::from_records(vec![raw("big", 1..=4, 1.0), raw("small", 1..=3, 1.0)]).unwrap();
    let component = &dataset.components[0];
    let big = component.find("big").unwrap();
    let small = component.find("small").unwrap();

    let exact = Exact::new();
    assert_eq!(
        exact.compute_relation(&component.query(big).elements, &component.query(small).elements),
        Relation::Must
    );

    let relations = RelationSet::classify(component, &exact);
    let is = independent_set::solve(component, &relations);
    assert_eq!(is.members, [big, small].into_iter().collect());

    let tree = build_tree(component, &relations, &is).unwrap();
    let small_cat = tree.category_of(small).unwrap();
    assert_eq!(tree.get(small_cat).parent, tree.category_of(big));

    let run = Pipeline::new(PipelineConfig::new(SimilarityKind::Exact, 1.0, 0.01))
        .unwrap()
        .run(&dataset)
        .unwrap();
    assert_eq!(run.report.covered_weight, 2.0);
    assert_eq!(run.report.final_score, 1.0);
}

#[test]
fn test_scenario_a_exact_overlap_excludes_one() {
    let dataset = Dataset::from_records(vec![raw("a", 1..=4, 1.0), raw("b", 3..=6, 1.0)]).unwrap();
    let component = &dataset.components[0];

    let relations = RelationSet::classify(component, &Exact::new());
    assert_eq!(relations.conflicts.len(), 1);

    let is = independent_set::solve(component, &relations);
    assert_eq!(is.len(), 1);
    // equal burdens: first in size-major order wins
    assert!(is.contains(QueryId::new(0)));

    let run = Pipeline::new(PipelineConfig::new(SimilarityKind::Exact, 1.0, 0.01))
        .unwrap()
        .run(&dataset)
        .unwrap();
    assert_eq!(run.report.covered_weight, 1.0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenario B: a single triple conflict
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_scenario_b_triple_conflict() {
    let dataset = scenario_b_dataset();
    let component = &dataset.components[0];
    let sim = Jaccard::new(0.9);

    let relations = RelationSet::classify(component, &sim);
    assert!(relations.conflicts.is_empty());
    assert_eq!(relations.triple_conflicts.len(), 1);

    let is = independent_set::solve(component, &relations);
    assert_eq!(is.len(), 2);
    assert!(!is.contains(component.find("q2").unwrap()));
    assert_eq!(is.heuristic, Heuristic::HyperMin);
}

#[test]
fn test_scenario_b_pipeline_score() {
    let run = Pipeline::new(PipelineConfig::new(SimilarityKind::Jaccard, 0.9, 0.01))
        .unwrap()
        .run(&scenario_b_dataset())
        .unwrap();

    let report = &run.report;
    assert_eq!(report.relations.triple_conflicts, 1);
    assert_eq!(report.tree.duplicates, 1);
    assert_eq!(report.covered_weight, 2.0);
    assert!((report.final_score - 2.0 / 3.0).abs() < 1e-9);
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenario C: one merge above the threshold
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_scenario_c_single_merge() {
    let mut tree = CategoryTree::new();
    let root = tree.root();
    let children = [
        element_set(1..=10),
        element_set((1..=9).chain([100])),
        element_set([10].into_iter().chain(200..220)),
        element_set([219].into_iter().chain(300..320)),
    ];
    for (i, elms) in children.into_iter().enumerate() {
        let id = tree.add_child(root, format!("c{i}"), None, elms.clone());
        tree.get_mut(id).actual_elms = elms;
    }

    let stats = TreeExpander::new(0.3).expand(&mut tree);

    assert_eq!(stats.merges, 1);
    let names: Vec<_> = tree
        .get(root)
        .children
        .iter()
        .map(|&c| tree.get(c).name.clone())
        .collect();
    assert_eq!(names, vec!["c2", "c3", "c0::c1"]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Determinism
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_repeated_runs_identical() {
    let dataset = catalogue();
    let config = PipelineConfig::new(SimilarityKind::Jaccard, 0.8, 0.01);

    let first = Pipeline::new(config.clone()).unwrap().run(&dataset).unwrap();
    let second = Pipeline::new(config).unwrap().run(&dataset).unwrap();

    assert_eq!(first.report.fingerprint, second.report.fingerprint);
    assert_eq!(first.report.params_hash, second.report.params_hash);
    for (a, b) in first.components.iter().zip(&second.components) {
        assert_eq!(a.tree.to_string(), b.tree.to_string());
    }
}

#[test]
fn test_parallel_and_sequential_identical() {
    let dataset = catalogue();
    for kind in [SimilarityKind::Jaccard, SimilarityKind::F1, SimilarityKind::PerfectRecall] {
        let mut config = PipelineConfig::new(kind, 0.75, 0.01);
        let parallel = Pipeline::new(config.clone()).unwrap().run(&dataset).unwrap();
        config.parallel = false;
        let sequential = Pipeline::new(config).unwrap().run(&dataset).unwrap();

        assert_eq!(parallel.report.fingerprint, sequential.report.fingerprint, "{kind}");
        assert_eq!(parallel.report.covered_weight, sequential.report.covered_weight, "{kind}");
    }
}

#[test]
fn test_params_hash_ignores_switches() {
    let mut config = PipelineConfig::new(SimilarityKind::F1, 0.9, 0.05);
    let hash = config.params_hash();
    config.verify = false;
    config.parallel = false;
    assert_eq!(config.params_hash(), hash);
    assert_ne!(config.with_delta(0.91).params_hash(), hash);
}
