//! Min-max normalization of variant columns.

use oso_core::constants::CENTER_VALUE;
use oso_core::table::Table;
use tracing::debug;

/// Scale `values` into `[0, 1]`.
///
/// A column with no range (all values equal, or a single value) maps to
/// [`CENTER_VALUE`] everywhere instead of dividing by zero.
pub fn minmax_scale(values: &[f64]) -> Vec<f64> {
    let (vmin, vmax) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if vmax == vmin || !(vmax - vmin).is_finite() {
        return vec![CENTER_VALUE; values.len()];
    }
    let range = vmax - vmin;
    values.iter().map(|v| (v - vmin) / range).collect()
}

/// Normalize every column of `table` independently.
pub fn normalize<R: Ord + Clone, C: PartialEq + Clone>(table: &Table<R, C>) -> Table<R, C> {
    let mut out = table.clone();
    let mut degenerate = 0usize;
    for idx in 0..out.n_cols() {
        let scaled = minmax_scale(&out.column_values(idx));
        if scaled.iter().all(|v| *v == CENTER_VALUE) && out.n_rows() > 1 {
            degenerate += 1;
        }
        out.set_column(idx, &scaled);
    }
    debug!(columns = out.n_cols(), degenerate, "normalized metric variants");
    out
}
