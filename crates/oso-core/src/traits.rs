//! Trait interfaces between the pipeline crates:
//! - [`MetricSource`]: raw observation snapshot (oso-io implements)
//! - [`BudgetAllocator`]: score-to-dollars allocation (oso-allocator implements)

use std::collections::BTreeMap;

use crate::error::{AllocationError, SourceError};
use crate::types::{Allocation, MetricObservation};

/// Producer of raw metric observations for one pipeline run.
///
/// Fetched once up front; the scoring pipeline never calls back into the
/// source.
pub trait MetricSource {
    fn load_observations(&self) -> Result<Vec<MetricObservation>, SourceError>;
}

impl MetricSource for [MetricObservation] {
    fn load_observations(&self) -> Result<Vec<MetricObservation>, SourceError> {
        Ok(self.to_vec())
    }
}

impl MetricSource for Vec<MetricObservation> {
    fn load_observations(&self) -> Result<Vec<MetricObservation>, SourceError> {
        Ok(self.clone())
    }
}

/// Pure conversion of a normalized score distribution into amounts.
pub trait BudgetAllocator: Send + Sync {
    /// Allocate the budget across `scores` (keyed by project id, summing to 1.0).
    fn allocate(&self, scores: &BTreeMap<String, f64>) -> Result<Allocation, AllocationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_is_a_source() {
        let obs = vec![MetricObservation {
            project_id: "p1".into(),
            project_name: "one".into(),
            display_name: "One".into(),
            chain: "BASE".into(),
            period_label: "Jan 2025".into(),
            metric_name: "gas_fees".into(),
            amount: 1.0,
        }];
        assert_eq!(obs.load_observations().unwrap(), obs);
        assert_eq!(obs.as_slice().load_observations().unwrap().len(), 1);
    }
}
