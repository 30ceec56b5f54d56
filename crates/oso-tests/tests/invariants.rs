//! Pipeline-wide invariants under generated snapshots and score vectors.

use oso_allocator::ConstrainedAllocator;
use oso_core::config::AllocationConfig;
use oso_core::traits::BudgetAllocator;
use oso_core::types::{MetricObservation, Variant, VariantColumn};
use oso_scoring::ScoringEngine;
use oso_tests::helpers::*;
use proptest::prelude::*;

const METRICS: [&str; 2] = ["transaction_count", "active_addresses"];
const CHAINS: [&str; 2] = ["BASE", "OPTIMISM"];

/// Per project: (current, previous) amount for each metric on each chain.
fn snapshot_strategy() -> impl Strategy<Value = Vec<MetricObservation>> {
    prop::collection::vec(prop::collection::vec((0.0f64..1e5, 0.0f64..1e5), 4), 1..20).prop_map(
        |projects| {
            let mut out = Vec::new();
            for (i, cells) in projects.iter().enumerate() {
                let id = format!("p{i:02}");
                for (j, (cur, prev)) in cells.iter().enumerate() {
                    let chain = CHAINS[j / 2];
                    let metric = METRICS[j % 2];
                    out.push(obs(&id, chain, CURRENT, metric, *cur));
                    out.push(obs(&id, chain, PREVIOUS, metric, *prev));
                }
            }
            out
        },
    )
}

fn engine() -> ScoringEngine {
    ScoringEngine::new(scoring_config(&[(METRICS[0], 0.3), (METRICS[1], 0.7)]))
}

proptest! {
    #[test]
    fn variant_relations_hold(data in snapshot_strategy()) {
        let a = engine().run_analysis(&data).unwrap();
        let t = &a.pivoted_metric_variants;
        for metric in METRICS {
            let adoption = t.column_index(&VariantColumn::new(metric, Variant::Adoption)).unwrap();
            let growth = t.column_index(&VariantColumn::new(metric, Variant::Growth)).unwrap();
            let retention = t.column_index(&VariantColumn::new(metric, Variant::Retention)).unwrap();
            for (_, row) in t.rows() {
                prop_assert!(row[growth] >= 0.0);
                prop_assert!(row[retention] <= row[adoption]);
            }
        }
    }

    #[test]
    fn normalized_values_in_unit_interval(data in snapshot_strategy()) {
        let a = engine().run_analysis(&data).unwrap();
        for (_, row) in a.normalized_metric_variants.rows() {
            for v in row {
                prop_assert!((0.0..=1.0).contains(v));
            }
        }
    }

    #[test]
    fn shares_form_a_distribution(data in snapshot_strategy()) {
        let a = engine().run_analysis(&data).unwrap();
        let shares = a.final_results.shares_by_id();
        let total: f64 = shares.values().sum();
        prop_assert!((total - 1.0).abs() < 1e-9);
        prop_assert!(shares.values().all(|s| s.is_finite() && *s >= 0.0));
        // Sorted by share descending.
        let ordered: Vec<f64> = a.final_results.rows.iter().map(|r| r.weighted_score).collect();
        prop_assert!(ordered.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn scored_snapshot_always_allocates(
        data in snapshot_strategy(),
        max_share in 0.05f64..1.0,
        min in 0.0f64..2_000.0,
    ) {
        let a = engine().run_analysis(&data).unwrap();
        let scores = a.final_results.shares_by_id();
        let budget = 100_000.0;
        let allocator = ConstrainedAllocator::new(AllocationConfig::new(budget, min, max_share)).unwrap();
        let allocation = allocator.allocate(&scores).unwrap();

        prop_assert_eq!(allocation.amounts.len(), scores.len());
        prop_assert!(allocation.total <= budget * (1.0 + 1e-6));
        if allocation.converged {
            prop_assert!((allocation.total - budget).abs() <= budget * 1e-6);
        }
        let cap = max_share * budget;
        for amount in allocation.amounts.values() {
            prop_assert!(*amount <= cap + 0.01);
            prop_assert!(*amount == 0.0 || *amount >= min.min(cap) - 0.01);
        }
    }

    #[test]
    fn allocation_is_deterministic(
        raw in prop::collection::vec(0.01f64..1.0, 2..30),
        max_share in 0.1f64..1.0,
    ) {
        let scores = normalized_scores(&raw);
        let allocator = ConstrainedAllocator::new(AllocationConfig::new(50_000.0, 100.0, max_share)).unwrap();
        let first = allocator.allocate(&scores).unwrap();
        let second = allocator.allocate(&scores).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn higher_score_never_gets_less(
        raw in prop::collection::vec(0.01f64..1.0, 2..30),
        max_share in 0.1f64..1.0,
    ) {
        let scores = normalized_scores(&raw);
        let allocator = ConstrainedAllocator::new(AllocationConfig::new(50_000.0, 0.0, max_share)).unwrap();
        let allocation = allocator.allocate(&scores).unwrap();
        let mut pairs: Vec<(f64, f64)> = scores
            .iter()
            .map(|(id, s)| (*s, allocation.amounts[id]))
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        for w in pairs.windows(2) {
            prop_assert!(w[1].1 >= w[0].1 - 0.01);
        }
    }
}
