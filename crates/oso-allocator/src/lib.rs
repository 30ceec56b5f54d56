//! # oso-allocator — Constrained budget allocation.
//!
//! Converts a normalized score distribution into per-project amounts:
//! - **Ceiling**: no project receives more than `max_share * budget`;
//!   excess flows to uncapped projects in proportion to their scores.
//! - **Floor**: a project that cannot clear `min_amount_per_project`
//!   receives nothing and its amount is redistributed.
//! - **Renormalization**: a bounded fixed-point loop rescales the result
//!   until the total matches the budget within tolerance.

pub mod allocator;
pub mod report;

pub use allocator::{round_to, ConstrainedAllocator};
pub use report::AllocationSummary;
