//! End-to-end tests: JSON dataset → preprocessing → pipeline → reports.

use std::io::Write;

use oct_kernel::types::element_set;
use oct_kernel::{
    find_duplicates, sweep, verify_tree, CoverageScope, CoverageScorer, Dataset, DatasetError, Pipeline,
    PipelineConfig, PipelineError, SimilarityKind, OCT_SCHEMA_VERSION,
};

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

const DATASET_JSON: &str = r#"{
    "tv":              [["tv1", "tv2", "tv3", "tv4", "tv5", "tv6", "tv7", "tv8"], 6],
    "smart tv":        [["tv1", "tv2", "tv3", "tv4", "tv5"], 3],
    "4k tv":           [["tv3", "tv4", "tv5", "tv6", "tv9"], 2],
    "oled tv":         [["tv4", "tv5", "tv9"], 1],
    "tv stand":        [["tv8", "st1", "st2", "st3"], 1],
    "laptop":          [["lp1", "lp2", "lp3", "lp4", "lp5", "lp6"], 5],
    "gaming laptop":   [["lp4", "lp5", "lp6", "lp7"], 2],
    "macbook":         [["lp1", "lp2", "lp3"], 4],
    "laptop bag":      [["lp7", "bg1", "bg2"]],
    "speaker":         [["sp1", "sp2", "sp3", "sp4"], 2],
    "bluetooth speaker": [["sp2", "sp3", "sp4", "sp5"], 2],
    "usb cable":       [["cb1", "cb2"], 1],
    "hdmi":            [["hd1"], 3],
    "gift card":       [["gc1"]]
}"#;

fn dataset() -> Dataset {
    Dataset::from_json_str(DATASET_JSON).unwrap()
}

fn config(kind: SimilarityKind, delta: f64) -> PipelineConfig {
    PipelineConfig::new(kind, delta, 0.01)
}

// ─────────────────────────────────────────────────────────────────────────────
// Loading
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_load_preprocessing_stats() {
    let dataset = dataset();
    let stats = &dataset.stats;

    assert_eq!(stats.queries, 14);
    assert_eq!(stats.total_weight, 34.0);
    assert_eq!(stats.short_queries, 2);
    assert_eq!(stats.short_weight, 4.0);
    assert_eq!(stats.isolated_queries, 1);
    assert_eq!(stats.isolated_weight, 1.0);
    assert_eq!(stats.components, 3);
    assert_eq!(stats.largest_component, 5);
    assert_eq!(dataset.query_count(), 11);
}

#[test]
fn test_load_from_file() {
    let path = std::env::temp_dir().join(format!("oct_kernel_dataset_{}.json", std::process::id()));
    {
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(DATASET_JSON.as_bytes()).unwrap();
    }

    let loaded = Dataset::from_path(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(loaded.stats, dataset().stats);
}

#[test]
fn test_load_missing_file() {
    let result = Dataset::from_path("/nonexistent/oct_kernel/dataset.json");
    assert!(matches!(result, Err(DatasetError::Io { .. })));
}

#[test]
fn test_load_rejects_bad_weight() {
    let result = Dataset::from_json_str(r#"{"a": [["x", "y"], -1]}"#);
    assert!(matches!(result, Err(DatasetError::InvalidWeight { .. })));
}

// ─────────────────────────────────────────────────────────────────────────────
// Pipeline runs
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_every_similarity_produces_valid_trees() {
    let dataset = dataset();
    let runs = [
        (SimilarityKind::Jaccard, 0.7),
        (SimilarityKind::F1, 0.8),
        (SimilarityKind::PerfectRecall, 0.8),
        (SimilarityKind::Exact, 1.0),
    ];

    for (kind, delta) in runs {
        let run = Pipeline::new(config(kind, delta)).unwrap().run(&dataset).unwrap();
        assert_eq!(run.components.len(), dataset.components.len(), "{kind}");

        for result in &run.components {
            assert_eq!(verify_tree(&result.tree), Ok(()), "{kind} component {}", result.component);
            assert!(find_duplicates(&result.tree).is_empty());
        }

        let report = &run.report;
        assert!(report.final_score > 0.0 && report.final_score <= 1.0 + 1e-9, "{kind}");
        assert!(report.member_weight <= report.covered_weight + 1e-9);
        assert!(report.independent_set.ratio > 0.0 && report.independent_set.ratio <= 1.0);
        assert_eq!(report.params_hash.len(), 16);
    }
}

#[test]
fn test_trivial_weight_counts_as_covered() {
    let dataset = dataset();
    let run = Pipeline::new(config(SimilarityKind::Jaccard, 0.9)).unwrap().run(&dataset).unwrap();

    let expected = (run.report.covered_weight + dataset.stats.trivial_weight()) / dataset.stats.total_weight;
    assert!((run.report.final_score - expected).abs() < 1e-12);
}

#[test]
fn test_exact_skips_refinement() {
    let run = Pipeline::new(config(SimilarityKind::Exact, 1.0)).unwrap().run(&dataset()).unwrap();

    for result in &run.components {
        assert!(result.resolve.is_none());
        assert!(result.expand.is_none());
    }
    assert_eq!(run.report.tree.duplicates, 0);
    assert_eq!(run.report.tree.expansion_gain, 0.0);
}

#[test]
fn test_component_coverage_matches_scorer() {
    let dataset = dataset();
    let pipeline = Pipeline::new(config(SimilarityKind::F1, 0.8)).unwrap();

    for component in &dataset.components {
        let result = pipeline.run_component(component).unwrap();
        let scorer = CoverageScorer::new(component, pipeline.similarity());

        let members = scorer.score(&result.tree, &result.independent_set, CoverageScope::IndependentSet);
        assert_eq!(members.member_weight, result.coverage.member_weight);
        assert_eq!(members.other_weight, 0.0);
        assert!(result.coverage.weight() <= component.weight() + 1e-9);
    }
}

#[test]
fn test_invalid_config_rejected() {
    let bad = PipelineConfig::new(SimilarityKind::Jaccard, 0.0, 0.01);
    assert!(matches!(Pipeline::new(bad), Err(PipelineError::Config(_))));

    let bad = PipelineConfig::new(SimilarityKind::Jaccard, 0.9, -0.5);
    assert!(matches!(Pipeline::new(bad), Err(PipelineError::Config(_))));
}

#[test]
fn test_report_serializes() {
    let run = Pipeline::new(PipelineConfig::default()).unwrap().run(&dataset()).unwrap();
    let json = serde_json::to_value(&run.report).unwrap();

    assert_eq!(json["config"]["similarity"], "jaccard");
    assert!(json["final_score"].is_number());
    assert!(json["timings"]["relations_ms"].is_number());
}

// ─────────────────────────────────────────────────────────────────────────────
// Sweeps
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_sweep_runs_each_delta_in_order() {
    let deltas = [0.95, 0.6, 0.8];
    let report = sweep(&dataset(), &config(SimilarityKind::Jaccard, 0.9), &deltas).unwrap();

    assert_eq!(report.schema_version, OCT_SCHEMA_VERSION);
    let seen: Vec<f64> = report.scores().into_iter().map(|(d, _)| d).collect();
    assert_eq!(seen, deltas);

    let hashes: std::collections::BTreeSet<_> = report.runs.iter().map(|r| r.params_hash.clone()).collect();
    assert_eq!(hashes.len(), deltas.len());
}

#[test]
fn test_sweep_rejects_bad_delta() {
    let result = sweep(&dataset(), &PipelineConfig::default(), &[0.9, 2.0]);
    assert!(matches!(result, Err(PipelineError::Config(_))));
}

#[test]
fn test_dataset_without_components() {
    let dataset = Dataset::from_records(vec![
        oct_kernel::RawQuery::new("a", element_set([1, 2]), 1.0),
        oct_kernel::RawQuery::new("b", element_set([3]), 1.0),
    ])
    .unwrap();

    let run = Pipeline::new(PipelineConfig::default()).unwrap().run(&dataset).unwrap();
    assert!(run.components.is_empty());
    assert_eq!(run.report.covered_weight, 0.0);
    assert_eq!(run.report.final_score, 1.0);
}
