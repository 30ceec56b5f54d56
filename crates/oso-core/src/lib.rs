//! # oso-core
//! Foundation types, configuration records, and traits shared by the
//! scoring and allocation crates.

pub mod config;
pub mod constants;
pub mod error;
pub mod table;
pub mod traits;
pub mod types;
