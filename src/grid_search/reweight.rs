use crate::errors::FairnessError;
use crate::moments::Moment;

/// Turn one multiplier vector into the targets and sample weights of a plain
/// weighted fit.
///
/// The Lagrangian of the constrained problem at `lambda_vec` is linear in the
/// predictions, so it is minimised by a weighted fit where every row carries
/// its signed weight. For classification the sign picks the label and the
/// magnitude is the weight; for regression the targets are kept as they are.
///
/// * `constraints` - Constraint moment, with data loaded.
/// * `objective` - Objective moment, with data loaded.
/// * `lambda_vec` - Multipliers in the constraint's index space.
/// * `y` - Original targets.
/// * `objective_in_span` - The multipliers already account for the objective.
/// * `is_classification` - Relabel rows by the sign of their weight.
pub fn reweight(
    constraints: &dyn Moment,
    objective: &dyn Moment,
    lambda_vec: &[f64],
    y: &[f64],
    objective_in_span: bool,
    is_classification: bool,
) -> Result<(Vec<f64>, Vec<f64>), FairnessError> {
    let mut weights = constraints.signed_weights(lambda_vec)?;
    if !objective_in_span {
        let objective_weights = objective.signed_weights(&[1.0])?;
        for (w, o) in weights.iter_mut().zip(objective_weights) {
            *w += o;
        }
    }
    if is_classification {
        let labels = weights.iter().map(|w| if *w > 0.0 { 1.0 } else { 0.0 }).collect();
        let weights = weights.into_iter().map(f64::abs).collect();
        Ok((labels, weights))
    } else {
        Ok((y.to_vec(), weights))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Matrix;
    use crate::moments::{DemographicParity, GroupLossMoment, Loss};

    #[test]
    fn test_zero_multipliers_keep_labels() {
        let x = vec![0.0; 4];
        let y = vec![0.0, 1.0, 1.0, 0.0];
        let a: Vec<String> = ["a", "a", "b", "b"].iter().map(|s| s.to_string()).collect();
        let mut dp = DemographicParity::new();
        dp.load_data(&Matrix::new(&x, 4, 1), &y, &a).unwrap();
        let mut objective = dp.default_objective();
        objective.load_data(&Matrix::new(&x, 4, 1), &y, &a).unwrap();

        let (labels, weights) = reweight(&dp, objective.as_ref(), &[0.0; 4], &y, false, true).unwrap();
        assert_eq!(labels, y);
        assert_eq!(weights, vec![1.0; 4]);
    }

    #[test]
    fn test_large_multiplier_flips_labels() {
        let x = vec![0.0; 4];
        let y = vec![0.0, 1.0, 1.0, 0.0];
        let a: Vec<String> = ["a", "a", "b", "b"].iter().map(|s| s.to_string()).collect();
        let mut dp = DemographicParity::new();
        dp.load_data(&Matrix::new(&x, 4, 1), &y, &a).unwrap();
        let mut objective = dp.default_objective();
        objective.load_data(&Matrix::new(&x, 4, 1), &y, &a).unwrap();

        // lambda(+, a) = 2: adjust(a) = 2 - 4 = -2, adjust(b) = 2.
        let (labels, weights) = reweight(&dp, objective.as_ref(), &[2.0, 0.0, 0.0, 0.0], &y, false, true).unwrap();
        assert_eq!(labels, vec![0.0, 0.0, 1.0, 1.0]);
        assert_eq!(weights, vec![3.0, 1.0, 3.0, 1.0]);
    }

    #[test]
    fn test_regression_keeps_targets() {
        let x = vec![0.0; 4];
        let y = vec![0.5, 1.5, 2.0, 0.0];
        let a: Vec<String> = ["a", "a", "b", "b"].iter().map(|s| s.to_string()).collect();
        let mut bgl = GroupLossMoment::new(Loss::square(0.0, 2.0));
        bgl.load_data(&Matrix::new(&x, 4, 1), &y, &a).unwrap();
        let objective = bgl.default_objective();

        let (targets, weights) = reweight(&bgl, objective.as_ref(), &[0.0, 1.0], &y, true, false).unwrap();
        assert_eq!(targets, y);
        assert_eq!(weights, vec![0.0, 0.0, 2.0, 2.0]);
    }
}
