//! Typed model configuration.
//!
//! Configuration arrives as loosely-typed file sections (`*File` structs,
//! deserialized with serde) and is converted into validated records before
//! any pipeline stage runs, so a bad key or value fails at load time.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CHAIN_WEIGHT, DEFAULT_MAX_ITERATIONS, DEFAULT_POWER_MEAN_P, DEFAULT_ROUNDING,
    MAX_ROUNDING,
};
use crate::error::{ConfigError, ScoringError};
use crate::types::{PeriodTag, Variant};

/// Location of the raw input files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSnapshot {
    pub data_dir: String,
    pub projects_file: String,
    pub metrics_file: String,
}

impl Default for DataSnapshot {
    fn default() -> Self {
        Self {
            data_dir: "data/onchain_testing".to_string(),
            projects_file: "projects_v1.csv".to_string(),
            metrics_file: "onchain_metrics_by_project.csv".to_string(),
        }
    }
}

impl DataSnapshot {
    pub fn projects_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.data_dir).join(&self.projects_file)
    }

    pub fn metrics_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.data_dir).join(&self.metrics_file)
    }

    /// Default location of the wide scoring results.
    pub fn results_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.data_dir).join("onchain_builders_testing_results.csv")
    }

    /// Default location of the allocation table.
    pub fn allocations_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.data_dir).join("onchain_builders_allocations.csv")
    }
}

/// How weighted variant columns collapse into one project score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationMethod {
    /// `(Σ xᵢᵖ / n)^(1/p)`; `p = 0` falls back to the geometric mean.
    PowerMean,
    /// Plain column sum.
    Sum,
}

impl AggregationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PowerMean => "power_mean",
            Self::Sum => "sum",
        }
    }
}

impl fmt::Display for AggregationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationMethod {
    type Err = ScoringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "power_mean" => Ok(Self::PowerMean),
            "sum" => Ok(Self::Sum),
            other => Err(ScoringError::InvalidAggregationMethod(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregationConfig {
    pub method: AggregationMethod,
    pub p: f64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            method: AggregationMethod::PowerMean,
            p: DEFAULT_POWER_MEAN_P,
        }
    }
}

/// `simulation` section as written in the file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringConfigFile {
    pub periods: Option<BTreeMap<String, String>>,
    pub chains: Option<BTreeMap<String, f64>>,
    pub metrics: Option<BTreeMap<String, f64>>,
    pub metric_variants: Option<BTreeMap<String, f64>>,
    pub aggregation: Option<AggregationFile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AggregationFile {
    pub method: Option<String>,
    pub p: Option<f64>,
}

/// Validated weights and period layout for the scoring pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    pub periods: BTreeMap<String, PeriodTag>,
    pub chains: BTreeMap<String, f64>,
    pub metrics: BTreeMap<String, f64>,
    pub metric_variants: BTreeMap<Variant, f64>,
    pub aggregation: AggregationConfig,
    current_period: String,
    previous_period: String,
}

impl ScoringConfig {
    /// Build and validate a scoring configuration.
    pub fn new(
        periods: BTreeMap<String, PeriodTag>,
        chains: BTreeMap<String, f64>,
        metrics: BTreeMap<String, f64>,
        metric_variants: BTreeMap<Variant, f64>,
        aggregation: AggregationConfig,
    ) -> Result<Self, ConfigError> {
        let current_period = labeled(&periods, PeriodTag::Current)?;
        let previous_period = labeled(&periods, PeriodTag::Previous)?;

        if metrics.is_empty() {
            return Err(ConfigError::Empty("simulation.metrics".into()));
        }
        if metric_variants.is_empty() {
            return Err(ConfigError::Empty("simulation.metric_variants".into()));
        }
        check_weights("simulation.chains", chains.iter().map(|(k, v)| (k.as_str(), *v)))?;
        check_weights("simulation.metrics", metrics.iter().map(|(k, v)| (k.as_str(), *v)))?;
        check_weights(
            "simulation.metric_variants",
            metric_variants.iter().map(|(k, v)| (k.as_str(), *v)),
        )?;
        if !aggregation.p.is_finite() {
            return Err(ConfigError::InvalidValue {
                key: "simulation.aggregation.p".into(),
                value: aggregation.p.to_string(),
            });
        }

        Ok(Self {
            periods,
            chains,
            metrics,
            metric_variants,
            aggregation,
            current_period,
            previous_period,
        })
    }

    /// Label of the period tagged `current`.
    pub fn current_period(&self) -> &str {
        &self.current_period
    }

    /// Label of the period tagged `previous`.
    pub fn previous_period(&self) -> &str {
        &self.previous_period
    }

    /// Configured weight of a chain; unlisted chains weigh [`DEFAULT_CHAIN_WEIGHT`].
    pub fn chain_weight(&self, chain: &str) -> f64 {
        self.chains.get(chain).copied().unwrap_or(DEFAULT_CHAIN_WEIGHT)
    }

    /// Period labels in the order they appear in pivot columns.
    pub fn period_labels(&self) -> impl Iterator<Item = &str> {
        self.periods.keys().map(String::as_str)
    }
}

impl TryFrom<ScoringConfigFile> for ScoringConfig {
    type Error = ConfigError;

    fn try_from(file: ScoringConfigFile) -> Result<Self, Self::Error> {
        let raw_periods = file
            .periods
            .ok_or_else(|| ConfigError::MissingSection("simulation.periods".into()))?;
        let metrics = file
            .metrics
            .ok_or_else(|| ConfigError::MissingSection("simulation.metrics".into()))?;
        let raw_variants = file
            .metric_variants
            .ok_or_else(|| ConfigError::MissingSection("simulation.metric_variants".into()))?;

        let mut periods = BTreeMap::new();
        for (period, tag) in raw_periods {
            let parsed = tag
                .parse::<PeriodTag>()
                .map_err(|tag| ConfigError::UnknownPeriodTag { period: period.clone(), tag })?;
            periods.insert(period, parsed);
        }

        let mut metric_variants = BTreeMap::new();
        for (name, weight) in raw_variants {
            metric_variants.insert(name.parse::<Variant>()?, weight);
        }

        let aggregation = match file.aggregation {
            None => AggregationConfig::default(),
            Some(agg) => {
                let method = match agg.method {
                    None => AggregationMethod::PowerMean,
                    Some(name) => name.parse::<AggregationMethod>().map_err(|_| ConfigError::InvalidValue {
                        key: "simulation.aggregation.method".into(),
                        value: name,
                    })?,
                };
                AggregationConfig {
                    method,
                    p: agg.p.unwrap_or(DEFAULT_POWER_MEAN_P),
                }
            }
        };

        ScoringConfig::new(
            periods,
            file.chains.unwrap_or_default(),
            metrics,
            metric_variants,
            aggregation,
        )
    }
}

/// Budget and constraint parameters for the allocator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationConfig {
    pub budget: f64,
    pub min_amount_per_project: f64,
    pub max_share_per_project: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_rounding")]
    pub rounding: u32,
    /// Fail instead of returning a best-effort result when the budget
    /// cannot be matched within tolerance.
    #[serde(default)]
    pub strict: bool,
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

fn default_rounding() -> u32 {
    DEFAULT_ROUNDING
}

impl AllocationConfig {
    pub fn new(budget: f64, min_amount_per_project: f64, max_share_per_project: f64) -> Self {
        Self {
            budget,
            min_amount_per_project,
            max_share_per_project,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            rounding: DEFAULT_ROUNDING,
            strict: false,
        }
    }

    /// Largest amount any single project may receive.
    pub fn max_per_project(&self) -> f64 {
        self.max_share_per_project * self.budget
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, value: String| ConfigError::InvalidValue {
            key: format!("allocation.{key}"),
            value,
        };
        if !(self.budget.is_finite() && self.budget > 0.0) {
            return Err(invalid("budget", self.budget.to_string()));
        }
        if !(self.min_amount_per_project.is_finite() && self.min_amount_per_project >= 0.0) {
            return Err(invalid(
                "min_amount_per_project",
                self.min_amount_per_project.to_string(),
            ));
        }
        if !(self.max_share_per_project > 0.0 && self.max_share_per_project <= 1.0) {
            return Err(invalid(
                "max_share_per_project",
                self.max_share_per_project.to_string(),
            ));
        }
        if self.min_amount_per_project > self.max_per_project() {
            return Err(invalid(
                "min_amount_per_project",
                format!(
                    "{} exceeds max_share_per_project * budget = {}",
                    self.min_amount_per_project,
                    self.max_per_project()
                ),
            ));
        }
        if self.max_iterations == 0 {
            return Err(invalid("max_iterations", "0".into()));
        }
        if self.rounding > MAX_ROUNDING {
            return Err(invalid("rounding", self.rounding.to_string()));
        }
        Ok(())
    }
}

/// Whole configuration document as written in the file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelConfigFile {
    #[serde(default)]
    pub data_snapshot: DataSnapshot,
    pub simulation: Option<ScoringConfigFile>,
    pub allocation: Option<AllocationConfig>,
}

/// Validated configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub data_snapshot: DataSnapshot,
    pub simulation: ScoringConfig,
    pub allocation: Option<AllocationConfig>,
}

impl TryFrom<ModelConfigFile> for ModelConfig {
    type Error = ConfigError;

    fn try_from(file: ModelConfigFile) -> Result<Self, Self::Error> {
        let simulation = file
            .simulation
            .ok_or_else(|| ConfigError::MissingSection("simulation".into()))?
            .try_into()?;
        if let Some(allocation) = &file.allocation {
            allocation.validate()?;
        }
        Ok(Self {
            data_snapshot: file.data_snapshot,
            simulation,
            allocation: file.allocation,
        })
    }
}

impl ModelConfig {
    /// The allocation section, required by commands that allocate.
    pub fn allocation(&self) -> Result<&AllocationConfig, ConfigError> {
        self.allocation
            .as_ref()
            .ok_or_else(|| ConfigError::MissingSection("allocation".into()))
    }
}

fn labeled(periods: &BTreeMap<String, PeriodTag>, tag: PeriodTag) -> Result<String, ConfigError> {
    let mut found = periods.iter().filter(|(_, t)| **t == tag).map(|(label, _)| label);
    let first = found
        .next()
        .ok_or_else(|| ConfigError::MissingPeriod(tag.to_string()))?;
    if let Some(second) = found.next() {
        return Err(ConfigError::DuplicatePeriodTag {
            tag: tag.to_string(),
            first: first.clone(),
            second: second.clone(),
        });
    }
    Ok(first.clone())
}

fn check_weights<'a>(
    section: &str,
    weights: impl Iterator<Item = (&'a str, f64)>,
) -> Result<(), ConfigError> {
    for (name, weight) in weights {
        if !(weight.is_finite() && weight >= 0.0) {
            return Err(ConfigError::InvalidValue {
                key: format!("{section}.{name}"),
                value: weight.to_string(),
            });
        }
    }
    Ok(())
}
