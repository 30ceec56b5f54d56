//! Wide, flattened per-project results table for audit and export.

use std::collections::BTreeMap;

use oso_core::constants::WEIGHTED_SCORE_COLUMN;
use oso_core::table::Table;
use oso_core::types::{PeriodMetric, ProjectKey, VariantColumn};

/// One project's flattened row.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub project: ProjectKey,
    /// Values in [`FinalResults::columns`] order, excluding the score share.
    pub values: Vec<f64>,
    pub weighted_score: f64,
}

/// Chain-weighted raw metrics, variant values, weighted variant values, and
/// the final score share, one row per project sorted by share descending.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FinalResults {
    pub columns: Vec<String>,
    pub rows: Vec<ResultRow>,
}

/// `"{metric} [{period}]"`
pub fn raw_column_name(c: &PeriodMetric) -> String {
    format!("{} [{}]", c.metric, c.period)
}

/// `"{metric} - {variant}_variant"` with the variant lowercased.
pub fn variant_column_name(c: &VariantColumn) -> String {
    format!("{} - {}_variant", c.metric, c.variant.as_str().to_lowercase())
}

/// Variant column name with a `" - weighted"` suffix.
pub fn weighted_column_name(c: &VariantColumn) -> String {
    format!("{} - weighted", variant_column_name(c))
}

impl FinalResults {
    pub fn build(
        weighted_raw: &Table<ProjectKey, PeriodMetric>,
        variants: &Table<ProjectKey, VariantColumn>,
        weighted_variants: &Table<ProjectKey, VariantColumn>,
        shares: &BTreeMap<ProjectKey, f64>,
    ) -> Self {
        let columns: Vec<String> = weighted_raw
            .columns()
            .iter()
            .map(raw_column_name)
            .chain(variants.columns().iter().map(variant_column_name))
            .chain(weighted_variants.columns().iter().map(weighted_column_name))
            .collect();

        let mut rows: Vec<ResultRow> = weighted_raw
            .keys()
            .map(|project| {
                let mut values = Vec::with_capacity(columns.len());
                extend_row(&mut values, weighted_raw.row(project), weighted_raw.n_cols());
                extend_row(&mut values, variants.row(project), variants.n_cols());
                extend_row(
                    &mut values,
                    weighted_variants.row(project),
                    weighted_variants.n_cols(),
                );
                ResultRow {
                    project: project.clone(),
                    values,
                    weighted_score: shares.get(project).copied().unwrap_or(0.0),
                }
            })
            .collect();

        rows.sort_by(|a, b| {
            b.weighted_score
                .total_cmp(&a.weighted_score)
                .then_with(|| a.project.cmp(&b.project))
        });

        Self { columns, rows }
    }

    /// Column header including the trailing score-share column.
    pub fn header(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(WEIGHTED_SCORE_COLUMN))
            .collect()
    }

    /// Score share per project id.
    pub fn shares_by_id(&self) -> BTreeMap<String, f64> {
        self.rows
            .iter()
            .map(|r| (r.project.project_id.clone(), r.weighted_score))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn extend_row(values: &mut Vec<f64>, row: Option<&[f64]>, width: usize) {
    match row {
        Some(r) => values.extend_from_slice(r),
        None => values.extend(std::iter::repeat_n(0.0, width)),
    }
}
