//! Adoption, Growth, and Retention variants from current vs previous period.

use oso_core::config::ScoringConfig;
use oso_core::error::ScoringError;
use oso_core::table::Table;
use oso_core::types::{PeriodMetric, ProjectKey, Variant, VariantColumn};
use tracing::debug;

/// Derive the three variants of every configured metric.
///
/// The current and previous periods are looked up by their configured tag,
/// so the order in which periods are listed never matters. Columns are
/// metric-major in [`Variant::ALL`] order.
pub fn compute_variants(
    table: &Table<ProjectKey, PeriodMetric>,
    config: &ScoringConfig,
) -> Result<Table<ProjectKey, VariantColumn>, ScoringError> {
    let current = config.current_period();
    let previous = config.previous_period();

    let mut sources = Vec::with_capacity(config.metrics.len());
    let mut columns = Vec::with_capacity(config.metrics.len() * Variant::ALL.len());
    for metric in config.metrics.keys() {
        let cur = table
            .column_index(&PeriodMetric::new(current, metric))
            .ok_or_else(|| ScoringError::UnknownPeriod(current.to_string()))?;
        let prev = table
            .column_index(&PeriodMetric::new(previous, metric))
            .ok_or_else(|| ScoringError::UnknownPeriod(previous.to_string()))?;
        sources.push((cur, prev));
        columns.extend(Variant::ALL.map(|v| VariantColumn::new(metric, v)));
    }

    let mut out = Table::new(columns);
    for (project, values) in table.rows() {
        let row = sources
            .iter()
            .flat_map(|&(cur, prev)| Variant::ALL.map(|v| v.derive(values[cur], values[prev])))
            .collect();
        out.insert_row(project.clone(), row);
    }

    debug!(
        projects = out.n_rows(),
        columns = out.n_cols(),
        current,
        previous,
        "calculated metric variants"
    );
    Ok(out)
}
