//! Metric × variant weighting and per-project score aggregation.

use std::collections::BTreeMap;

use oso_core::config::{AggregationConfig, AggregationMethod};
use oso_core::constants::GEOMETRIC_EPSILON;
use oso_core::table::Table;
use oso_core::types::{Variant, VariantColumn};
use tracing::debug;

/// Multiply each `(metric, variant)` column by `metric_weight * variant_weight`.
///
/// Only columns whose metric and variant are both configured are scaled;
/// any other column passes through unchanged.
pub fn apply_weights<R: Ord + Clone>(
    table: &Table<R, VariantColumn>,
    metric_weights: &BTreeMap<String, f64>,
    variant_weights: &BTreeMap<Variant, f64>,
) -> Table<R, VariantColumn> {
    let mut out = table.clone();
    let factors: Vec<Option<f64>> = out
        .columns()
        .iter()
        .map(|c| {
            let m = metric_weights.get(&c.metric)?;
            let v = variant_weights.get(&c.variant)?;
            Some(m * v)
        })
        .collect();
    for (idx, factor) in factors.into_iter().enumerate() {
        if let Some(f) = factor {
            out.map_column(idx, |x| x * f);
        }
    }
    debug!(columns = out.n_cols(), "applied metric and variant weights");
    out
}

/// Power mean `(Σ xᵢᵖ / n)^(1/p)` of one row.
///
/// `p = 0` is the geometric mean `exp(mean(ln(xᵢ + ε)))`. It is not
/// recommended: a single zero column drags the score towards ε, and a row
/// of zeros scores ε rather than 0.
pub fn power_mean(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    if p == 0.0 {
        let mean_log = values.iter().map(|x| (x + GEOMETRIC_EPSILON).ln()).sum::<f64>() / n;
        return mean_log.exp();
    }
    (values.iter().map(|x| x.powf(p)).sum::<f64>() / n).powf(1.0 / p)
}

/// Combine every weighted column of a row into one project score.
pub fn aggregate<R: Ord + Clone>(
    table: &Table<R, VariantColumn>,
    aggregation: &AggregationConfig,
) -> BTreeMap<R, f64> {
    let scores: BTreeMap<R, f64> = table
        .rows()
        .map(|(key, values)| {
            let score = match aggregation.method {
                AggregationMethod::PowerMean => power_mean(values, aggregation.p),
                AggregationMethod::Sum => values.iter().sum(),
            };
            (key.clone(), score)
        })
        .collect();
    debug!(
        projects = scores.len(),
        method = %aggregation.method,
        p = aggregation.p,
        "aggregated project scores"
    );
    scores
}

/// Each score divided by the total, so the shares sum to 1.
///
/// When every score is zero the shares fall back to a uniform `1/n`.
pub fn score_shares<R: Ord + Clone>(scores: &BTreeMap<R, f64>) -> BTreeMap<R, f64> {
    let total: f64 = scores.values().sum();
    if !(total > 0.0 && total.is_finite()) {
        let uniform = 1.0 / scores.len() as f64;
        return scores.keys().map(|k| (k.clone(), uniform)).collect();
    }
    scores.iter().map(|(k, v)| (k.clone(), v / total)).collect()
}
