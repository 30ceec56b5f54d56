//! Cross-crate test suite for the scoring and allocation pipeline.
//!
//! Integration tests drive the whole flow from CSV snapshot and YAML
//! config through to the allocation table, and check pipeline-wide
//! invariants under generated inputs.

pub mod helpers;
