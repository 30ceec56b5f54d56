//! # oso-scoring — Metric aggregation and normalization.
//!
//! Turns a flat snapshot of raw metric observations into one weighted
//! score per project:
//! - **Pivot**: filter to configured metrics and periods, one column per
//!   `(period, metric)`; missing combinations count as zero activity.
//! - **Chain weighting**: scale each chain's row by its weight and sum
//!   the chain dimension away.
//! - **Variants**: Adoption, Growth, and Retention per metric from the
//!   current and previous periods.
//! - **Normalization**: independent min-max scaling per column, with a
//!   constant 0.5 for columns that do not vary.
//! - **Aggregation**: metric × variant weights, then a power mean or sum.
//!
//! Every stage is a pure function of its inputs and the configuration.

pub mod aggregate;
pub mod engine;
pub mod normalize;
pub mod pivot;
pub mod results;
pub mod variants;

pub use aggregate::{aggregate, apply_weights, score_shares};
pub use engine::{Analysis, ScoringEngine};
pub use normalize::{minmax_scale, normalize};
pub use pivot::{pivot_raw, weight_by_chain};
pub use results::{FinalResults, ResultRow};
pub use variants::compute_variants;
