//! End-to-end tests: CSV snapshot and YAML config in, results and
//! allocation tables out.

use oso_allocator::{AllocationSummary, ConstrainedAllocator};
use oso_core::error::AllocationError;
use oso_core::traits::{BudgetAllocator, MetricSource};
use oso_core::types::PeriodMetric;
use oso_io::{CsvSnapshot, load_model_config, read_scores, write_allocations, write_results};
use oso_scoring::ScoringEngine;
use oso_tests::helpers::*;

const ALLOCATION: &str = "  budget: 1000\n  min_amount_per_project: 10\n  max_share_per_project: 0.7\n";

#[test]
fn snapshot_to_allocation() {
    let dir = tempfile::tempdir().unwrap();
    write_snapshot(dir.path(), &three_project_scenario());
    let yaml = model_yaml(dir.path(), &[("github_activity", 1.0)], Some(ALLOCATION));
    let model = load_model_config(write_yaml(dir.path(), &yaml)).unwrap();

    let observations = CsvSnapshot::from_config(&model.data_snapshot)
        .load_observations()
        .unwrap();
    assert_eq!(observations.len(), 6);

    let analysis = ScoringEngine::new(model.simulation.clone())
        .run_analysis(&observations)
        .unwrap();
    let results_path = model.data_snapshot.results_path();
    write_results(&results_path, &analysis.final_results).unwrap();

    // Scores read back from disk are the ones the engine produced.
    let scores = read_scores(&results_path).unwrap();
    assert_eq!(scores, analysis.final_results.shares_by_id());

    let p2_score = ((0.25 + 0.390625) / 3.0f64).sqrt();
    let p1_share = 1.0 / (1.0 + p2_score);
    assert!((scores["p1"] - p1_share).abs() < 1e-12);
    assert_eq!(scores["p3"], 0.0);

    let config = model.allocation().unwrap().clone();
    let allocation = ConstrainedAllocator::new(config.clone())
        .unwrap()
        .allocate(&scores)
        .unwrap();
    assert!(allocation.converged);
    assert_eq!(allocation.amounts["p3"], 0.0);
    assert!(allocation.amounts["p1"] <= 700.0);
    assert!((allocation.rounded_total() - 1000.0).abs() < 0.02);

    let alloc_path = model.data_snapshot.allocations_path();
    write_allocations(&alloc_path, &allocation).unwrap();
    let text = std::fs::read_to_string(&alloc_path).unwrap();
    let first_data_row = text.lines().nth(1).unwrap();
    assert!(first_data_row.starts_with("p1,"));

    let summary = AllocationSummary::from_allocation(&allocation, &config);
    assert_eq!(summary.funded, 2);
    assert_eq!(summary.below_min, 1);
}

#[test]
fn shipped_config_scores_and_allocates() {
    let root = concat!(env!("CARGO_MANIFEST_DIR"), "/../..");
    let mut model = load_model_config(format!("{root}/weights/onchain_builders_testing.yaml")).unwrap();
    model.data_snapshot.data_dir = format!("{root}/{}", model.data_snapshot.data_dir);

    let observations = CsvSnapshot::from_config(&model.data_snapshot)
        .load_observations()
        .unwrap();
    let analysis = ScoringEngine::new(model.simulation.clone())
        .run_analysis(&observations)
        .unwrap();
    assert_eq!(analysis.final_results.len(), 5);

    // uniswap: 22 on each of OPTIMISM (x1.5), BASE and MODE.
    let weighted = &analysis.pivoted_raw_metrics_weighted_by_chain;
    let (_, row) = weighted
        .rows()
        .find(|(key, _)| key.project_id == "0x04d")
        .unwrap();
    let column = weighted
        .column_index(&PeriodMetric::new(CURRENT, "gas_fees"))
        .unwrap();
    assert!((row[column] - 77.0).abs() < 1e-9);

    let scores = analysis.final_results.shares_by_id();
    assert!((scores.values().sum::<f64>() - 1.0).abs() < 1e-9);
    let first = scores.values().next().copied().unwrap();
    assert!(scores.values().any(|s| (s - first).abs() > 1e-6));

    let config = model.allocation().unwrap().clone();
    let allocation = ConstrainedAllocator::new(config.clone())
        .unwrap()
        .allocate(&scores)
        .unwrap();
    assert!(allocation.converged);
    assert!((allocation.rounded_total() - config.budget).abs() < 0.05);
    for amount in allocation.amounts.values() {
        assert!(*amount <= config.max_per_project() + 0.01);
        assert!(*amount == 0.0 || *amount >= config.min_amount_per_project - 0.01);
    }
}

#[test]
fn ceiling_binds_on_dominant_project() {
    let dir = tempfile::tempdir().unwrap();
    let mut data = three_project_scenario();
    data.push(obs("p4", "BASE", CURRENT, "github_activity", 40.0));
    data.push(obs("p4", "BASE", PREVIOUS, "github_activity", 35.0));
    write_snapshot(dir.path(), &data);
    let section = "  budget: 100000\n  min_amount_per_project: 0\n  max_share_per_project: 0.4\n";
    let yaml = model_yaml(dir.path(), &[("github_activity", 1.0)], Some(section));
    let model = load_model_config(write_yaml(dir.path(), &yaml)).unwrap();

    let observations = CsvSnapshot::from_config(&model.data_snapshot)
        .load_observations()
        .unwrap();
    let analysis = ScoringEngine::new(model.simulation.clone())
        .run_analysis(&observations)
        .unwrap();
    let scores = analysis.final_results.shares_by_id();
    assert!(scores["p1"] > 0.4);

    let allocation = ConstrainedAllocator::new(model.allocation().unwrap().clone())
        .unwrap()
        .allocate(&scores)
        .unwrap();
    assert_eq!(allocation.amounts["p1"], 40_000.0);
    assert!(allocation.converged);
    assert!(allocation.amounts.values().all(|a| *a <= 40_000.0));
}

#[test]
fn chain_weights_from_yaml() {
    let dir = tempfile::tempdir().unwrap();
    let data = vec![
        obs("a", "BASE", CURRENT, "gas_fees", 10.0),
        obs("b", "OPTIMISM", CURRENT, "gas_fees", 10.0),
    ];
    write_snapshot(dir.path(), &data);
    let yaml = model_yaml(dir.path(), &[("gas_fees", 1.0)], None)
        .replace("  metrics:\n", "  chains:\n    OPTIMISM: 2.0\n  metrics:\n");
    let model = load_model_config(write_yaml(dir.path(), &yaml)).unwrap();

    let observations = CsvSnapshot::from_config(&model.data_snapshot)
        .load_observations()
        .unwrap();
    let analysis = ScoringEngine::new(model.simulation)
        .run_analysis(&observations)
        .unwrap();
    let shares = analysis.final_results.shares_by_id();
    assert!(shares["b"] > shares["a"]);
    assert_eq!(analysis.final_results.rows[0].project.project_id, "b");
}

#[test]
fn scores_that_do_not_sum_to_one_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scores.csv");
    std::fs::write(&path, "project_id,weighted_score\nA,0.5\nB,0.3\n").unwrap();
    let scores = read_scores(&path).unwrap();

    let allocator = ConstrainedAllocator::new(oso_core::config::AllocationConfig::new(1000.0, 0.0, 1.0)).unwrap();
    match allocator.allocate(&scores) {
        Err(AllocationError::ScoresNotNormalized { sum }) => assert!((sum - 0.8).abs() < 1e-12),
        other => panic!("expected ScoresNotNormalized, got {other:?}"),
    }
}

#[test]
fn unknown_project_rows_do_not_score() {
    let dir = tempfile::tempdir().unwrap();
    write_snapshot(dir.path(), &three_project_scenario());
    // Append a row for a project with no metadata.
    let metrics = dir.path().join("onchain_metrics_by_project.csv");
    let mut text = std::fs::read_to_string(&metrics).unwrap();
    text.push_str("ghost,BASE,github_activity,2025-01-01,1000000\n");
    std::fs::write(&metrics, text).unwrap();

    let yaml = model_yaml(dir.path(), &[("github_activity", 1.0)], None);
    let model = load_model_config(write_yaml(dir.path(), &yaml)).unwrap();
    let observations = CsvSnapshot::from_config(&model.data_snapshot)
        .load_observations()
        .unwrap();
    let analysis = ScoringEngine::new(model.simulation)
        .run_analysis(&observations)
        .unwrap();
    assert_eq!(analysis.final_results.len(), 3);
    assert!(!analysis.final_results.shares_by_id().contains_key("ghost"));
}
