//! Budget allocator implementing the [`BudgetAllocator`] trait.
//!
//! Floor and ceiling constraints interact, so the allocation is reached by
//! bounded fixed-point iteration rather than a closed form:
//! 1. initial pass: `amount = score * budget`
//! 2. cap pass: clamp to the ceiling and hand the excess to uncapped
//!    projects by score, until nothing exceeds the ceiling
//! 3. floor pass: zero out projects below the minimum and hand their
//!    amount to the remaining projects, clipped to each one's headroom
//! 4. one more cap pass
//! 5. renormalize towards the budget, re-clipping at the ceiling
//! 6. round for presentation
//!
//! Invariants are enforced on unrounded values.

use std::collections::BTreeMap;

use oso_core::config::AllocationConfig;
use oso_core::constants::{
    BUDGET_TOLERANCE, MAX_NORM_ITERATIONS, MAX_ROUNDING, SCORE_SUM_TOLERANCE,
};
use oso_core::error::AllocationError;
use oso_core::traits::BudgetAllocator;
use oso_core::types::Allocation;
use tracing::{debug, warn};

/// The production allocator.
#[derive(Debug, Clone)]
pub struct ConstrainedAllocator {
    config: AllocationConfig,
}

impl ConstrainedAllocator {
    /// Create an allocator after validating its configuration.
    pub fn new(config: AllocationConfig) -> Result<Self, AllocationError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }
}

/// Round half to even at `decimals` places, capped at `MAX_ROUNDING`.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals.min(MAX_ROUNDING) as i32);
    (value * scale).round_ties_even() / scale
}

/// Check the score map and return it as parallel vectors.
fn validate_scores(
    scores: &BTreeMap<String, f64>,
) -> Result<(Vec<&str>, Vec<f64>), AllocationError> {
    if scores.is_empty() {
        return Err(AllocationError::NoProjects);
    }
    for (project, score) in scores {
        if !(score.is_finite() && *score >= 0.0) {
            return Err(AllocationError::InvalidScore {
                project: project.clone(),
                score: *score,
            });
        }
    }
    let sum: f64 = scores.values().sum();
    if (sum - 1.0).abs() > SCORE_SUM_TOLERANCE {
        return Err(AllocationError::ScoresNotNormalized { sum });
    }
    Ok(scores.iter().map(|(k, v)| (k.as_str(), *v)).unzip())
}

/// Spread `excess` over `targets` in proportion to their scores.
///
/// With `ceiling` set, no target is pushed past it. Targets whose scores
/// sum to zero receive nothing. Returns the amount actually placed.
fn redistribute(
    amounts: &mut [f64],
    scores: &[f64],
    targets: &[usize],
    excess: f64,
    ceiling: Option<f64>,
) -> f64 {
    let weight: f64 = targets.iter().map(|&i| scores[i]).sum();
    if targets.is_empty() || weight <= 0.0 || excess <= 0.0 {
        return 0.0;
    }
    let mut placed = 0.0;
    for &i in targets {
        let mut add = scores[i] / weight * excess;
        if let Some(max) = ceiling {
            add = add.min((max - amounts[i]).max(0.0));
        }
        amounts[i] += add;
        placed += add;
    }
    placed
}

/// Clamp every amount above `max` and return the total clipped off.
fn clamp_to_ceiling(amounts: &mut [f64], max: f64) -> f64 {
    let mut excess = 0.0;
    for a in amounts.iter_mut().filter(|a| **a > max) {
        excess += *a - max;
        *a = max;
    }
    excess
}

fn indices(amounts: &[f64], pred: impl Fn(f64) -> bool) -> Vec<usize> {
    amounts
        .iter()
        .enumerate()
        .filter(|(_, a)| pred(**a))
        .map(|(i, _)| i)
        .collect()
}

impl ConstrainedAllocator {
    fn cap_pass(&self, amounts: &mut [f64], scores: &[f64], max: f64) -> usize {
        for round in 0..self.config.max_iterations {
            let excess = clamp_to_ceiling(amounts, max);
            if excess <= 0.0 {
                return round;
            }
            let under = indices(amounts, |a| a < max);
            redistribute(amounts, scores, &under, excess, None);
        }
        self.config.max_iterations
    }

    fn floor_pass(&self, amounts: &mut [f64], scores: &[f64], max: f64) -> usize {
        let min = self.config.min_amount_per_project;
        // Each round zeroes at least one project.
        for round in 0..=amounts.len() {
            let below = indices(amounts, |a| a > 0.0 && a < min);
            if below.is_empty() {
                return round;
            }
            let excess: f64 = below.iter().map(|&i| amounts[i]).sum();
            for &i in &below {
                amounts[i] = 0.0;
            }
            let active = indices(amounts, |a| a > 0.0);
            let headroom: f64 = active.iter().map(|&i| max - amounts[i]).sum();
            if headroom > 0.0 {
                redistribute(amounts, scores, &active, excess, Some(max));
            }
        }
        amounts.len() + 1
    }

    fn final_cap_pass(&self, amounts: &mut [f64], scores: &[f64], max: f64) {
        let excess = clamp_to_ceiling(amounts, max);
        if excess > 0.0 {
            let under = indices(amounts, |a| a > 0.0 && a < max);
            redistribute(amounts, scores, &under, excess, Some(max));
        }
    }

    /// Rescale towards the budget until within tolerance or out of passes.
    fn renormalize(&self, amounts: &mut [f64], max: f64) -> usize {
        let budget = self.config.budget;
        let tolerance = BUDGET_TOLERANCE * budget;
        let mut iterations = 0;
        loop {
            let total: f64 = amounts.iter().sum();
            if (total - budget).abs() <= tolerance || iterations >= MAX_NORM_ITERATIONS {
                return iterations;
            }
            if total > 0.0 {
                let factor = budget / total;
                for a in amounts.iter_mut() {
                    *a = (*a * factor).min(max);
                }
            }
            iterations += 1;
        }
    }
}

impl BudgetAllocator for ConstrainedAllocator {
    fn allocate(&self, scores: &BTreeMap<String, f64>) -> Result<Allocation, AllocationError> {
        let (ids, scores) = validate_scores(scores)?;
        let budget = self.config.budget;
        let max = self.config.max_per_project();

        let mut amounts: Vec<f64> = scores.iter().map(|s| s * budget).collect();
        let cap_rounds = self.cap_pass(&mut amounts, &scores, max);
        let floor_rounds = self.floor_pass(&mut amounts, &scores, max);
        self.final_cap_pass(&mut amounts, &scores, max);
        let norm_iterations = self.renormalize(&mut amounts, max);

        let total: f64 = amounts.iter().sum();
        let converged = (total - budget).abs() <= BUDGET_TOLERANCE * budget;
        debug!(
            projects = ids.len(),
            cap_rounds,
            floor_rounds,
            norm_iterations,
            total,
            budget,
            "allocation passes complete"
        );

        if !converged {
            if self.config.strict {
                return Err(AllocationError::Infeasible {
                    total,
                    budget,
                    iterations: norm_iterations,
                });
            }
            warn!(
                total,
                budget,
                norm_iterations,
                "allocation did not reach the budget within tolerance; returning best effort"
            );
        }

        let amounts = ids
            .into_iter()
            .zip(amounts)
            .map(|(id, a)| (id.to_string(), round_to(a, self.config.rounding)))
            .collect();

        Ok(Allocation {
            amounts,
            total,
            norm_iterations,
            converged,
        })
    }
}
