//! Pivot raw observations into `(period, metric)` columns and collapse the
//! chain dimension.

use std::collections::BTreeMap;

use oso_core::constants::DEFAULT_CHAIN_WEIGHT;
use oso_core::table::Table;
use oso_core::types::{ChainRow, MetricObservation, PeriodMetric, ProjectKey};
use tracing::debug;

/// Filter observations to the configured metrics and periods and pivot them
/// into one row per `(project, chain)` with one column per `(period, metric)`.
///
/// Columns are laid out period-major over every configured pair, whether or
/// not the snapshot has data for it. Cells without observations hold 0:
/// a project with no activity for a metric scores as zero activity, never
/// as unknown. Repeated observations for the same cell are summed, and
/// non-finite amounts are skipped.
pub fn pivot_raw<M, P>(
    observations: &[MetricObservation],
    metrics: M,
    periods: P,
) -> Table<ChainRow, PeriodMetric>
where
    M: IntoIterator,
    M::Item: AsRef<str>,
    P: IntoIterator,
    P::Item: AsRef<str>,
{
    let metrics: Vec<String> = metrics.into_iter().map(|m| m.as_ref().to_string()).collect();
    let periods: Vec<String> = periods.into_iter().map(|p| p.as_ref().to_string()).collect();

    let columns: Vec<PeriodMetric> = periods
        .iter()
        .flat_map(|p| metrics.iter().map(move |m| PeriodMetric::new(p, m)))
        .collect();
    let index: BTreeMap<(&str, &str), usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| ((c.period.as_str(), c.metric.as_str()), i))
        .collect();

    let mut table = Table::new(columns.clone());
    let mut skipped = 0usize;
    for obs in observations {
        let Some(&col) = index.get(&(obs.period_label.as_str(), obs.metric_name.as_str())) else {
            continue;
        };
        if !obs.amount.is_finite() {
            skipped += 1;
            continue;
        }
        let key = ChainRow {
            project: obs.project_key(),
            chain: obs.chain.clone(),
        };
        table.row_or_zero(key)[col] += obs.amount;
    }

    debug!(
        observations = observations.len(),
        rows = table.n_rows(),
        columns = table.n_cols(),
        skipped,
        "pivoted raw metrics by chain"
    );
    table
}

/// Scale every per-chain row by its chain weight and sum rows per project.
///
/// Chains missing from `chain_weights` weigh [`DEFAULT_CHAIN_WEIGHT`]. The
/// result is chain-agnostic: one row per project.
pub fn weight_by_chain(
    table: &Table<ChainRow, PeriodMetric>,
    chain_weights: &BTreeMap<String, f64>,
) -> Table<ProjectKey, PeriodMetric> {
    let mut out = Table::new(table.columns().to_vec());
    for (row, values) in table.rows() {
        let weight = chain_weights
            .get(&row.chain)
            .copied()
            .unwrap_or(DEFAULT_CHAIN_WEIGHT);
        let acc = out.row_or_zero(row.project.clone());
        for (a, v) in acc.iter_mut().zip(values) {
            *a += v * weight;
        }
    }

    debug!(
        chain_rows = table.n_rows(),
        projects = out.n_rows(),
        "summed and weighted raw metrics by chain"
    );
    out
}
