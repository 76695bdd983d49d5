//! Selection
//!
//! Picking the best candidate, the Pareto front of the objective and the
//! violation, and the weights of a convex combination of candidates.
use crate::errors::FairnessError;
use crate::grid_search::config::SelectionRule;
use crate::utils::first_argmin;

/// Amount by which `gamma` exceeds `bound`, zero when within the bound.
pub fn violation(gamma: &[f64], bound: &[f64]) -> f64 {
    gamma
        .iter()
        .zip(bound)
        .map(|(g, b)| if g.is_nan() { f64::INFINITY } else { g - b })
        .fold(0.0, f64::max)
}

/// Index of the best candidate under `rule`, `None` when there are no candidates.
///
/// * `objectives` - Objective value of every candidate.
/// * `gammas` - Constraint value of every candidate.
/// * `violations` - Bound excess of every candidate, see [`violation`].
pub fn select_best(
    objectives: &[f64],
    gammas: &[Vec<f64>],
    violations: &[f64],
    rule: &SelectionRule,
) -> Option<usize> {
    match rule {
        SelectionRule::BoundedObjective => {
            let feasible: Vec<f64> = objectives
                .iter()
                .zip(violations)
                .map(|(o, v)| if *v <= 0.0 && !o.is_nan() { *o } else { f64::INFINITY })
                .collect();
            if violations.iter().zip(objectives).any(|(v, o)| *v <= 0.0 && !o.is_nan()) {
                return first_argmin(&feasible);
            }
            let mut best: Option<usize> = None;
            for i in 0..objectives.len() {
                best = match best {
                    None => Some(i),
                    Some(b) if is_better(violations[i], objectives[i], violations[b], objectives[b]) => Some(i),
                    keep => keep,
                };
            }
            best
        }
        SelectionRule::TradeoffOptimization { constraint_weight } => {
            let losses: Vec<f64> = objectives
                .iter()
                .zip(gammas)
                .map(|(o, g)| {
                    let max_gamma = g.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                    let max_gamma = if max_gamma.is_finite() { max_gamma } else { 0.0 };
                    (1.0 - constraint_weight) * o + constraint_weight * max_gamma
                })
                .collect();
            first_argmin(&losses)
        }
    }
}

// Lower violation wins, then lower objective. Ties keep the earlier candidate.
fn is_better(violation: f64, objective: f64, best_violation: f64, best_objective: f64) -> bool {
    match violation.total_cmp(&best_violation) {
        std::cmp::Ordering::Less => true,
        std::cmp::Ordering::Greater => false,
        std::cmp::Ordering::Equal => objective < best_objective || (best_objective.is_nan() && !objective.is_nan()),
    }
}

/// Candidates not dominated on (objective, violation), in grid order.
pub fn pareto_front(objectives: &[f64], violations: &[f64]) -> Vec<usize> {
    let n = objectives.len();
    (0..n)
        .filter(|&i| {
            !(0..n).any(|j| {
                j != i
                    && objectives[j] <= objectives[i]
                    && violations[j] <= violations[i]
                    && (objectives[j] < objectives[i] || violations[j] < violations[i])
            })
        })
        .collect()
}

/// Check weights of a convex combination of `n` candidates.
pub fn validate_mixture_weights(weights: &[f64], n: usize) -> Result<(), FairnessError> {
    if weights.len() != n {
        return Err(FairnessError::InvalidParameter(
            "weights".to_string(),
            format!("{} values, one per candidate", n),
            weights.len().to_string(),
        ));
    }
    if let Some(bad) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
        return Err(FairnessError::InvalidParameter(
            "weights".to_string(),
            "non-negative finite values".to_string(),
            bad.to_string(),
        ));
    }
    let total: f64 = weights.iter().sum();
    if (total - 1.0).abs() > 1e-6 {
        return Err(FairnessError::InvalidParameter(
            "weights".to_string(),
            "values summing to 1".to_string(),
            total.to_string(),
        ));
    }
    Ok(())
}
