//! Pipeline constants. Tolerances are expressed as plain `f64` ratios.

/// Value assigned to every cell of a normalized column whose inputs all tie.
pub const CENTER_VALUE: f64 = 0.5;

/// Offset added before taking logarithms in the geometric-mean aggregation.
///
/// Keeps `ln(0)` finite when a project has a zero column.
pub const GEOMETRIC_EPSILON: f64 = 1e-9;

/// Weight applied to chains that do not appear in the chain-weight map.
pub const DEFAULT_CHAIN_WEIGHT: f64 = 1.0;

/// Default power-mean exponent.
pub const DEFAULT_POWER_MEAN_P: f64 = 2.0;

/// Maximum deviation of `Σ score` from 1.0 accepted by the allocator.
pub const SCORE_SUM_TOLERANCE: f64 = 1e-6;

/// Relative tolerance between the allocated total and the budget.
pub const BUDGET_TOLERANCE: f64 = 1e-6;

/// Upper bound on budget renormalization passes.
pub const MAX_NORM_ITERATIONS: usize = 100;

/// Default upper bound on cap and floor redistribution passes.
pub const DEFAULT_MAX_ITERATIONS: usize = 50;

/// Default decimal precision of reported allocations.
pub const DEFAULT_ROUNDING: u32 = 2;

/// Largest accepted rounding precision. `10^d` must stay exact in an `f64`.
pub const MAX_ROUNDING: u32 = 15;

/// Period tag marking the current measurement window.
pub const PERIOD_CURRENT: &str = "current";

/// Period tag marking the previous measurement window.
pub const PERIOD_PREVIOUS: &str = "previous";

/// Name of the score-share column in the wide results table.
pub const WEIGHTED_SCORE_COLUMN: &str = "weighted_score";

/// `chrono` format used to derive a period label from a sample date.
pub const PERIOD_LABEL_FORMAT: &str = "%b %Y";
