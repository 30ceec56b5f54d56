//! Core data types: raw observations, table row/column keys, and the
//! allocation result.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{PERIOD_CURRENT, PERIOD_PREVIOUS};
use crate::error::ConfigError;

/// Identity of a project as carried through every table.
///
/// Ordering is by `project_id` first, so tables iterate in id order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectKey {
    pub project_id: String,
    pub project_name: String,
    pub display_name: String,
}

impl ProjectKey {
    pub fn new(
        project_id: impl Into<String>,
        project_name: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            project_name: project_name.into(),
            display_name: display_name.into(),
        }
    }
}

/// One raw metric fact produced by the data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricObservation {
    pub project_id: String,
    pub project_name: String,
    pub display_name: String,
    pub chain: String,
    pub period_label: String,
    pub metric_name: String,
    pub amount: f64,
}

impl MetricObservation {
    /// The project identity this observation belongs to.
    pub fn project_key(&self) -> ProjectKey {
        ProjectKey::new(&self.project_id, &self.project_name, &self.display_name)
    }
}

/// Row key of the per-chain pivot table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChainRow {
    pub project: ProjectKey,
    pub chain: String,
}

/// Column key of the pivot tables: one `(period, metric)` pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeriodMetric {
    pub period: String,
    pub metric: String,
}

impl PeriodMetric {
    pub fn new(period: impl Into<String>, metric: impl Into<String>) -> Self {
        Self {
            period: period.into(),
            metric: metric.into(),
        }
    }
}

/// Role of a configured period label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PeriodTag {
    Current,
    Previous,
}

impl PeriodTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Current => PERIOD_CURRENT,
            Self::Previous => PERIOD_PREVIOUS,
        }
    }
}

impl fmt::Display for PeriodTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            PERIOD_CURRENT => Ok(Self::Current),
            PERIOD_PREVIOUS => Ok(Self::Previous),
            other => Err(other.to_string()),
        }
    }
}

/// A lens on a raw metric derived from the current-vs-previous comparison.
///
/// Declaration order is the column order of variant tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Variant {
    /// Current-period value.
    Adoption,
    /// `max(current - previous, 0)`.
    Growth,
    /// `min(current, previous)`.
    Retention,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::Adoption, Variant::Growth, Variant::Retention];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Adoption => "Adoption",
            Self::Growth => "Growth",
            Self::Retention => "Retention",
        }
    }

    /// Derive the variant value from a current and previous observation.
    pub fn derive(&self, current: f64, previous: f64) -> f64 {
        match self {
            Self::Adoption => current,
            Self::Growth => (current - previous).max(0.0),
            Self::Retention => current.min(previous),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variant::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownVariant(s.to_string()))
    }
}

/// Column key of the variant tables: one `(metric, variant)` pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariantColumn {
    pub metric: String,
    pub variant: Variant,
}

impl VariantColumn {
    pub fn new(metric: impl Into<String>, variant: Variant) -> Self {
        Self {
            metric: metric.into(),
            variant,
        }
    }
}

/// Final per-project dollar allocation.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Allocation {
    /// Rounded amount per `project_id`.
    pub amounts: BTreeMap<String, f64>,
    /// Sum of the unrounded amounts.
    pub total: f64,
    /// Budget renormalization passes performed.
    pub norm_iterations: usize,
    /// Whether the unrounded total landed within tolerance of the budget.
    pub converged: bool,
}

impl Allocation {
    /// Sum of the rounded amounts.
    pub fn rounded_total(&self) -> f64 {
        self.amounts.values().sum()
    }

    /// Amounts sorted descending, ties broken by project id.
    pub fn ranked(&self) -> Vec<(&str, f64)> {
        let mut out: Vec<(&str, f64)> = self
            .amounts
            .iter()
            .map(|(id, amount)| (id.as_str(), *amount))
            .collect();
        out.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        out
    }
}
