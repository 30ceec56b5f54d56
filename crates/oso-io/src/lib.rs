//! # oso-io
//! Everything that touches the filesystem: the YAML model configuration,
//! the CSV metric snapshot, and the CSV result tables.

pub mod config;
pub mod output;
pub mod snapshot;

pub use config::load_model_config;
pub use output::{read_scores, write_allocations, write_results};
pub use snapshot::CsvSnapshot;
