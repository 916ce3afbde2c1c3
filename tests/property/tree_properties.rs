//! Property tests over random small datasets: independent sets stay
//! conflict-free and refined trees keep their structural invariants.

use proptest::prelude::*;

use oct_kernel::independent_set;
use oct_kernel::types::element_set;
use oct_kernel::{
    build_tree, find_duplicates, verify_tree, Dataset, DuplicateResolver, Pipeline, PipelineConfig, RawQuery,
    RelationSet, Similarity, SimilarityKind, TreeExpander,
};

/// Build a dataset from `(elements, weight)` rows named `q0`, `q1`, ...
fn build_dataset(rows: &[(Vec<u32>, u32)]) -> Dataset {
    let records = rows
        .iter()
        .enumerate()
        .map(|(i, (elms, w))| RawQuery::new(format!("q{i}"), element_set(elms.iter().copied()), f64::from(*w)))
        .collect();
    Dataset::from_records(records).unwrap()
}

// Strategy for random datasets over a small element universe, so that
// queries overlap often.
fn rows_strategy() -> impl Strategy<Value = Vec<(Vec<u32>, u32)>> {
    prop::collection::vec((prop::collection::vec(0_u32..24, 2..9), 1_u32..5), 2..16)
}

fn kind_strategy() -> impl Strategy<Value = SimilarityKind> {
    prop_oneof![Just(SimilarityKind::Jaccard), Just(SimilarityKind::F1)]
}

// Variants whose raw trees are scored without repair.
fn raw_kind_strategy() -> impl Strategy<Value = SimilarityKind> {
    prop_oneof![Just(SimilarityKind::PerfectRecall), Just(SimilarityKind::Exact)]
}

// =============================================================================
// Independent set: no conflict pair and no full triple is selected
// =============================================================================
proptest! {
    #[test]
    fn independent_set_is_conflict_free(
        rows in rows_strategy(),
        kind in kind_strategy(),
        delta in 0.5_f64..0.98
    ) {
        let dataset = build_dataset(&rows);
        let sim = Similarity::new(kind, delta);

        for component in &dataset.components {
            let relations = RelationSet::classify(component, &sim);
            let is = independent_set::solve(component, &relations);

            for &(a, b) in &relations.conflicts {
                prop_assert!(
                    !(is.contains(a) && is.contains(b)),
                    "conflicting pair {:?}/{:?} both selected", a, b
                );
            }
            for triple in &relations.triple_conflicts {
                prop_assert!(
                    !triple.members().iter().all(|&q| is.contains(q)),
                    "triple {:?} fully selected", triple
                );
            }

            let weight: f64 = is.members.iter().map(|&q| component.query(q).weight).sum();
            prop_assert!((weight - is.weight).abs() < 1e-9);

            let heaviest = component.queries().iter().map(|q| q.weight).fold(0.0, f64::max);
            prop_assert!(
                is.weight >= heaviest - 1e-9,
                "selection weight {} below heaviest query {}", is.weight, heaviest
            );
        }
    }
}

// =============================================================================
// Refined trees: containment and single assignment hold after each stage
// =============================================================================
proptest! {
    #[test]
    fn refined_trees_keep_invariants(
        rows in rows_strategy(),
        kind in kind_strategy(),
        delta in 0.5_f64..0.98,
        merge_threshold in 0.0_f64..0.5
    ) {
        let dataset = build_dataset(&rows);
        let sim = Similarity::new(kind, delta);
        let expander = TreeExpander::new(merge_threshold);

        for component in &dataset.components {
            let relations = RelationSet::classify(component, &sim);
            let is = independent_set::solve(component, &relations);
            let built = build_tree(component, &relations, &is);
            prop_assert!(built.is_ok(), "build failed: {:?}", built.as_ref().err());
            let Ok(mut tree) = built else {
                continue;
            };
            let resolver = DuplicateResolver::new(component, &sim, &is.members);
            let resolved = resolver.resolve(&mut tree);
            prop_assert!(resolved.is_ok(), "resolve failed: {:?}", resolved.err());

            prop_assert_eq!(verify_tree(&tree), Ok(()));
            prop_assert!(find_duplicates(&tree).is_empty());

            expander.expand(&mut tree);
            prop_assert_eq!(verify_tree(&tree), Ok(()));
        }
    }
}

// =============================================================================
// Raw trees of non-refining variants already keep both invariants
// =============================================================================
proptest! {
    #[test]
    fn raw_trees_keep_invariants(
        rows in rows_strategy(),
        kind in raw_kind_strategy(),
        delta in 0.5_f64..0.98
    ) {
        let dataset = build_dataset(&rows);
        let sim = Similarity::new(kind, delta);

        for component in &dataset.components {
            let relations = RelationSet::classify(component, &sim);
            let is = independent_set::solve(component, &relations);
            let built = build_tree(component, &relations, &is);
            prop_assert!(built.is_ok(), "build failed: {:?}", built.as_ref().err());
            if let Ok(tree) = built {
                prop_assert_eq!(verify_tree(&tree), Ok(()));
                prop_assert!(find_duplicates(&tree).is_empty());
            }
        }
    }
}

// =============================================================================
// Duplicate resolution is idempotent
// =============================================================================
proptest! {
    #[test]
    fn resolve_is_idempotent(
        rows in rows_strategy(),
        kind in kind_strategy(),
        delta in 0.5_f64..0.98
    ) {
        let dataset = build_dataset(&rows);
        let sim = Similarity::new(kind, delta);

        for component in &dataset.components {
            let relations = RelationSet::classify(component, &sim);
            let is = independent_set::solve(component, &relations);
            let built = build_tree(component, &relations, &is);
            prop_assert!(built.is_ok(), "build failed: {:?}", built.as_ref().err());
            let Ok(mut tree) = built else {
                continue;
            };
            let resolver = DuplicateResolver::new(component, &sim, &is.members);
            let resolved = resolver.resolve(&mut tree);
            prop_assert!(resolved.is_ok(), "resolve failed: {:?}", resolved.err());

            let fingerprint = tree.fingerprint();
            let second = resolver.resolve(&mut tree);
            prop_assert!(second.is_ok());
            if let Ok(second) = second {
                prop_assert_eq!(second.duplicates, 0);
            }
            prop_assert_eq!(tree.fingerprint(), fingerprint);
        }
    }
}

// =============================================================================
// Pipeline: scores stay in bounds and parallelism does not change results
// =============================================================================
proptest! {
    #[test]
    fn pipeline_is_bounded_and_deterministic(
        rows in rows_strategy(),
        kind in kind_strategy(),
        delta in 0.5_f64..0.98
    ) {
        let dataset = build_dataset(&rows);
        let mut config = PipelineConfig::new(kind, delta, 0.01);

        let parallel = Pipeline::new(config.clone()).unwrap().run(&dataset);
        config.parallel = false;
        let sequential = Pipeline::new(config).unwrap().run(&dataset);

        prop_assert!(parallel.is_ok(), "parallel run failed: {:?}", parallel.as_ref().err());
        prop_assert!(sequential.is_ok(), "sequential run failed: {:?}", sequential.as_ref().err());
        if let (Ok(parallel), Ok(sequential)) = (parallel, sequential) {
            let score = parallel.report.final_score;
            prop_assert!((0.0..=1.0 + 1e-9).contains(&score), "score {} out of bounds", score);
            prop_assert_eq!(parallel.report.fingerprint, sequential.report.fingerprint);
            prop_assert_eq!(parallel.report.covered_weight, sequential.report.covered_weight);
        }
    }
}
