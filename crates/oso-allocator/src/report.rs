//! Post-allocation summary for operators.

use oso_core::config::AllocationConfig;
use oso_core::types::Allocation;
use serde::Serialize;
use tracing::info;

const TOP_N: usize = 20;
const BOTTOM_N: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedAmount {
    pub project_id: String,
    pub amount: f64,
}

/// Headline numbers of one allocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationSummary {
    /// Largest allocations, descending.
    pub top: Vec<RankedAmount>,
    /// Smallest non-zero allocations, ascending.
    pub bottom_nonzero: Vec<RankedAmount>,
    /// Projects whose rounded amount is below the configured minimum, zeros included.
    pub below_min: usize,
    pub funded: usize,
    pub projects: usize,
    pub total: f64,
    pub budget: f64,
    pub converged: bool,
}

fn ranked<'a>(pairs: impl Iterator<Item = (&'a str, f64)>) -> Vec<RankedAmount> {
    pairs
        .map(|(id, amount)| RankedAmount {
            project_id: id.to_string(),
            amount,
        })
        .collect()
}

impl AllocationSummary {
    pub fn from_allocation(allocation: &Allocation, config: &AllocationConfig) -> Self {
        let ordered = allocation.ranked();
        let nonzero: Vec<(&str, f64)> = ordered.iter().copied().filter(|(_, a)| *a > 0.0).collect();
        Self {
            top: ranked(ordered.iter().copied().take(TOP_N)),
            bottom_nonzero: ranked(nonzero.iter().rev().copied().take(BOTTOM_N)),
            below_min: ordered
                .iter()
                .filter(|(_, a)| *a < config.min_amount_per_project)
                .count(),
            funded: nonzero.len(),
            projects: ordered.len(),
            total: allocation.rounded_total(),
            budget: config.budget,
            converged: allocation.converged,
        }
    }

    /// Emit the summary as structured log events.
    pub fn log(&self) {
        info!(
            projects = self.projects,
            funded = self.funded,
            below_min = self.below_min,
            total = self.total,
            budget = self.budget,
            converged = self.converged,
            "allocation summary"
        );
        for (rank, r) in self.top.iter().enumerate() {
            info!(rank = rank + 1, project = %r.project_id, amount = r.amount, "top allocation");
        }
        for r in &self.bottom_nonzero {
            info!(project = %r.project_id, amount = r.amount, "smallest funded allocation");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn allocation(n: usize) -> Allocation {
        let amounts: BTreeMap<String, f64> = (0..n)
            .map(|i| (format!("p{i:02}"), if i % 5 == 0 { 0.0 } else { i as f64 * 10.0 }))
            .collect();
        Allocation {
            total: amounts.values().sum(),
            amounts,
            norm_iterations: 0,
            converged: true,
        }
    }

    #[test]
    fn truncates_top_and_bottom() {
        let alloc = allocation(40);
        let s = AllocationSummary::from_allocation(&alloc, &AllocationConfig::new(20_000.0, 100.0, 1.0));
        assert_eq!(s.top.len(), TOP_N);
        assert_eq!(s.top[0].project_id, "p39");
        assert_eq!(s.bottom_nonzero.len(), BOTTOM_N);
        assert_eq!(s.bottom_nonzero[0].project_id, "p01");
        assert!(s.bottom_nonzero.iter().all(|r| r.amount > 0.0));
        assert_eq!(s.projects, 40);
        assert_eq!(s.funded, 32);
    }

    #[test]
    fn counts_below_min_including_zeros() {
        let alloc = allocation(10);
        // zeros: p00, p05. nonzero below 50: p01..p04.
        let s = AllocationSummary::from_allocation(&alloc, &AllocationConfig::new(1000.0, 50.0, 1.0));
        assert_eq!(s.below_min, 6);
    }

    #[test]
    fn serializes_to_json() {
        let s = AllocationSummary::from_allocation(&allocation(3), &AllocationConfig::new(30.0, 0.0, 1.0));
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["projects"], 3);
        assert_eq!(json["top"][0]["project_id"], "p02");
    }
}
