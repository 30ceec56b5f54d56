//! Dense numeric table keyed by ordered rows and positional columns.
//!
//! Every row holds exactly one value per column. Rows iterate in key
//! order, which keeps every pipeline stage deterministic.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Table<R, C> {
    columns: Vec<C>,
    rows: BTreeMap<R, Vec<f64>>,
}

impl<R: Ord, C: PartialEq> Table<R, C> {
    /// Create an empty table with the given column layout.
    pub fn new(columns: Vec<C>) -> Self {
        Self {
            columns,
            rows: BTreeMap::new(),
        }
    }

    pub fn columns(&self) -> &[C] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column, if present.
    pub fn column_index(&self, column: &C) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Mutable access to a row, inserting an all-zero row when absent.
    pub fn row_or_zero(&mut self, key: R) -> &mut [f64] {
        let width = self.columns.len();
        self.rows.entry(key).or_insert_with(|| vec![0.0; width])
    }

    /// Insert or replace a row. Short rows are zero-padded and long rows
    /// truncated to the column count.
    pub fn insert_row(&mut self, key: R, mut values: Vec<f64>) {
        values.resize(self.columns.len(), 0.0);
        self.rows.insert(key, values);
    }

    pub fn row(&self, key: &R) -> Option<&[f64]> {
        self.rows.get(key).map(Vec::as_slice)
    }

    /// Value at `(row, column)`, if both exist.
    pub fn get(&self, key: &R, column: &C) -> Option<f64> {
        let idx = self.column_index(column)?;
        self.rows.get(key).map(|r| r[idx])
    }

    pub fn rows(&self) -> impl Iterator<Item = (&R, &[f64])> {
        self.rows.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &R> {
        self.rows.keys()
    }

    /// One column's values in row order.
    pub fn column_values(&self, idx: usize) -> Vec<f64> {
        self.rows.values().map(|r| r[idx]).collect()
    }

    /// Overwrite one column with values given in row order.
    pub fn set_column(&mut self, idx: usize, values: &[f64]) {
        for (row, v) in self.rows.values_mut().zip(values) {
            row[idx] = *v;
        }
    }

    /// Apply `f` to every cell of one column.
    pub fn map_column(&mut self, idx: usize, mut f: impl FnMut(f64) -> f64) {
        for row in self.rows.values_mut() {
            row[idx] = f(row[idx]);
        }
    }
}
