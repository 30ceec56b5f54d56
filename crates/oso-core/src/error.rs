//! Error types for the scoring and allocation pipeline.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("missing required section: {0}")] MissingSection(String),
    #[error("section {0} must not be empty")] Empty(String),
    #[error("no period tagged {0}")] MissingPeriod(String),
    #[error("more than one period tagged {tag}: {first}, {second}")] DuplicatePeriodTag { tag: String, first: String, second: String },
    #[error("unknown period tag {tag} for period {period}")] UnknownPeriodTag { period: String, tag: String },
    #[error("unknown metric variant: {0}")] UnknownVariant(String),
    #[error("invalid value for {key}: {value}")] InvalidValue { key: String, value: String },
    #[error("config file not found at: {0}")] NotFound(String),
    #[error("load: {0}")] Load(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("invalid aggregation method: {0}")] InvalidAggregationMethod(String),
    #[error("period {0} is not configured")] UnknownPeriod(String),
    #[error(transparent)] Config(#[from] ConfigError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AllocationError {
    #[error("project scores must be normalized to sum to 1.0 (got {sum})")] ScoresNotNormalized { sum: f64 },
    #[error("no projects to allocate")] NoProjects,
    #[error("invalid score for project {project}: {score}")] InvalidScore { project: String, score: f64 },
    #[error("infeasible constraints: allocated {total} of {budget} after {iterations} iterations")] Infeasible { total: f64, budget: f64, iterations: usize },
    #[error(transparent)] Config(#[from] ConfigError),
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("io error on {path}: {source}")] Io { path: String, source: std::io::Error },
    #[error("csv error in {path}: {message}")] Csv { path: String, message: String },
    #[error("invalid date {value:?} in {path} row {row}")] InvalidDate { path: String, row: usize, value: String },
    #[error("invalid amount {value:?} in {path} row {row}")] InvalidAmount { path: String, row: usize, value: String },
}

#[derive(Error, Debug)]
pub enum OsoError {
    #[error(transparent)] Config(#[from] ConfigError),
    #[error(transparent)] Scoring(#[from] ScoringError),
    #[error(transparent)] Allocation(#[from] AllocationError),
    #[error(transparent)] Source(#[from] SourceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_names_the_key() {
        let e = ConfigError::InvalidValue { key: "allocation.budget".into(), value: "-1".into() };
        assert_eq!(e.to_string(), "invalid value for allocation.budget: -1");
    }

    #[test]
    fn scoring_error_names_the_method() {
        let e = ScoringError::InvalidAggregationMethod("median".into());
        assert_eq!(e.to_string(), "invalid aggregation method: median");
    }

    #[test]
    fn umbrella_is_transparent() {
        let e: OsoError = AllocationError::NoProjects.into();
        assert_eq!(e.to_string(), "no projects to allocate");
    }
}
