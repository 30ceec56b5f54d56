//! Scoring engine: runs every aggregation stage and keeps each intermediate
//! table for inspection.

use std::collections::BTreeMap;

use oso_core::config::ScoringConfig;
use oso_core::error::ScoringError;
use oso_core::table::Table;
use oso_core::types::{ChainRow, MetricObservation, PeriodMetric, ProjectKey, VariantColumn};
use tracing::info;

use crate::aggregate::{aggregate, apply_weights, score_shares};
use crate::normalize::normalize;
use crate::pivot::{pivot_raw, weight_by_chain};
use crate::results::FinalResults;
use crate::variants::compute_variants;

/// Every table produced by one scoring run.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub pivoted_raw_metrics_by_chain: Table<ChainRow, PeriodMetric>,
    pub pivoted_raw_metrics_weighted_by_chain: Table<ProjectKey, PeriodMetric>,
    pub pivoted_metric_variants: Table<ProjectKey, VariantColumn>,
    pub normalized_metric_variants: Table<ProjectKey, VariantColumn>,
    pub weighted_metric_variants: Table<ProjectKey, VariantColumn>,
    pub project_scores: BTreeMap<ProjectKey, f64>,
    pub final_results: FinalResults,
}

/// The metric aggregator.
///
/// Holds only its configuration; [`run_analysis`](Self::run_analysis) is a
/// pure function of the observations it is given.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn run_analysis(&self, observations: &[MetricObservation]) -> Result<Analysis, ScoringError> {
        let cfg = &self.config;

        let by_chain = pivot_raw(observations, cfg.metrics.keys(), cfg.period_labels());
        let weighted_raw = weight_by_chain(&by_chain, &cfg.chains);
        let variants = compute_variants(&weighted_raw, cfg)?;
        let normalized = normalize(&variants);
        let weighted = apply_weights(&normalized, &cfg.metrics, &cfg.metric_variants);
        let scores = aggregate(&weighted, &cfg.aggregation);
        let shares = score_shares(&scores);
        let final_results = FinalResults::build(&weighted_raw, &variants, &weighted, &shares);

        info!(
            observations = observations.len(),
            projects = final_results.len(),
            method = %cfg.aggregation.method,
            "scoring analysis complete"
        );

        Ok(Analysis {
            pivoted_raw_metrics_by_chain: by_chain,
            pivoted_raw_metrics_weighted_by_chain: weighted_raw,
            pivoted_metric_variants: variants,
            normalized_metric_variants: normalized,
            weighted_metric_variants: weighted,
            project_scores: scores,
            final_results,
        })
    }
}
