//! Bounded Group Loss
//!
//! Constrains the average loss of every group to stay below an upper bound.
//! Unlike the parity constraints this works for regression as well, the
//! estimator only ever sees positive per-group sample weights.
use crate::constants::ALL_EVENT;
use crate::data::Matrix;
use crate::errors::FairnessError;
use crate::estimator::Predictor;
use crate::moments::{loaded, Basis, IndexLabel, Loss, Moment, MomentData, ReductionLoss};
use crate::utils::validate_positive_float_parameter;

#[derive(Debug, Clone)]
struct GroupState {
    data: MomentData,
    prob_group: Vec<f64>,
    index: Vec<IndexLabel>,
}

impl GroupState {
    fn losses(&self, loss: &Loss, predictor: &dyn Predictor) -> Result<Vec<f64>, FairnessError> {
        let pred = self.data.predict(predictor)?;
        Ok(loss.eval(&self.data.y, &pred))
    }
}

/// Mean loss per group, bounded above by `upper_bound`.
#[derive(Debug, Clone)]
pub struct GroupLossMoment {
    loss: Loss,
    upper_bound: Option<f64>,
    state: Option<GroupState>,
}

impl GroupLossMoment {
    /// A group loss moment without a bound: `bound` is infinite.
    pub fn new(loss: Loss) -> Self {
        GroupLossMoment {
            loss,
            upper_bound: None,
            state: None,
        }
    }

    /// * `upper_bound` - Largest mean loss tolerated in any group.
    pub fn with_upper_bound(loss: Loss, upper_bound: f64) -> Result<Self, FairnessError> {
        validate_positive_float_parameter(upper_bound, "upper_bound")?;
        Ok(GroupLossMoment {
            loss,
            upper_bound: Some(upper_bound),
            state: None,
        })
    }

    pub fn loss(&self) -> &Loss {
        &self.loss
    }

    pub fn upper_bound(&self) -> Option<f64> {
        self.upper_bound
    }

    fn state(&self) -> Result<&GroupState, FairnessError> {
        loaded(&self.state, "GroupLossMoment")
    }
}

impl Moment for GroupLossMoment {
    fn name(&self) -> &'static str {
        "GroupLossMoment"
    }

    fn load_data(&mut self, x: &Matrix<f64>, y: &[f64], sensitive_features: &[String]) -> Result<(), FairnessError> {
        let data = MomentData::new(x, y, sensitive_features)?;
        let prob_group = data.group_probabilities();
        let index = data.groups.iter().map(|g| IndexLabel::group(g)).collect();
        self.state = Some(GroupState {
            data,
            prob_group,
            index,
        });
        Ok(())
    }

    fn index(&self) -> Result<&[IndexLabel], FairnessError> {
        Ok(&self.state()?.index)
    }

    /// One non-negative direction per group.
    fn basis(&self) -> Result<Basis, FairnessError> {
        let n = self.state()?.index.len();
        let unit = |k: usize| (0..n).map(|i| if i == k { 1.0 } else { 0.0 }).collect::<Vec<_>>();
        Ok(Basis {
            index_len: n,
            pos: (0..n).map(unit).collect(),
            neg: vec![vec![0.0; n]; n],
            neg_allowed: vec![false; n],
        })
    }

    fn signed_weights(&self, lambda_vec: &[f64]) -> Result<Vec<f64>, FairnessError> {
        let state = self.state()?;
        if lambda_vec.len() != state.index.len() {
            return Err(FairnessError::InvalidInput(format!(
                "Expected {} multipliers, got {}.",
                state.index.len(),
                lambda_vec.len()
            )));
        }
        let adjust: Vec<f64> = lambda_vec.iter().zip(&state.prob_group).map(|(l, p)| l / p).collect();
        Ok(state.data.group_ids.iter().map(|g| adjust[*g]).collect())
    }

    fn gamma(&self, predictor: &dyn Predictor) -> Result<Vec<f64>, FairnessError> {
        let state = self.state()?;
        let losses = state.losses(&self.loss, predictor)?;
        let n_groups = state.data.groups.len();
        let mut sums = vec![0.0; n_groups];
        let mut counts = vec![0.0; n_groups];
        for (g, l) in state.data.group_ids.iter().zip(&losses) {
            sums[*g] += l;
            counts[*g] += 1.0;
        }
        Ok(sums.iter().zip(&counts).map(|(s, c)| s / c).collect())
    }

    fn bound(&self) -> Result<Vec<f64>, FairnessError> {
        let n = self.state()?.index.len();
        Ok(vec![self.upper_bound.unwrap_or(f64::INFINITY); n])
    }

    fn default_objective(&self) -> Box<dyn Moment> {
        Box::new(AverageLossMoment::new(self.loss.clone()))
    }

    /// The average loss is the group losses weighted by group size.
    fn default_objective_lambda_vec(&self) -> Result<Option<Vec<f64>>, FairnessError> {
        Ok(Some(self.state()?.prob_group.clone()))
    }

    fn is_classification(&self) -> bool {
        false
    }
}

/// Mean loss over all rows. Objective of [`GroupLossMoment`].
#[derive(Debug, Clone)]
pub struct AverageLossMoment {
    loss: Loss,
    state: Option<GroupState>,
}

impl AverageLossMoment {
    pub fn new(loss: Loss) -> Self {
        AverageLossMoment { loss, state: None }
    }

    fn state(&self) -> Result<&GroupState, FairnessError> {
        loaded(&self.state, "AverageLossMoment")
    }
}

impl Moment for AverageLossMoment {
    fn name(&self) -> &'static str {
        "AverageLossMoment"
    }

    fn load_data(&mut self, x: &Matrix<f64>, y: &[f64], sensitive_features: &[String]) -> Result<(), FairnessError> {
        let data = MomentData::new(x, y, sensitive_features)?;
        self.state = Some(GroupState {
            data,
            prob_group: vec![1.0],
            index: vec![IndexLabel::group(ALL_EVENT)],
        });
        Ok(())
    }

    fn index(&self) -> Result<&[IndexLabel], FairnessError> {
        Ok(&self.state()?.index)
    }

    fn basis(&self) -> Result<Basis, FairnessError> {
        self.state()?;
        Ok(Basis {
            index_len: 1,
            pos: vec![vec![1.0]],
            neg: vec![vec![0.0]],
            neg_allowed: vec![false],
        })
    }

    fn signed_weights(&self, lambda_vec: &[f64]) -> Result<Vec<f64>, FairnessError> {
        let state = self.state()?;
        let lambda = lambda_vec.first().copied().unwrap_or(1.0);
        Ok(vec![lambda; state.data.n_rows()])
    }

    fn gamma(&self, predictor: &dyn Predictor) -> Result<Vec<f64>, FairnessError> {
        let state = self.state()?;
        let losses = state.losses(&self.loss, predictor)?;
        Ok(vec![losses.iter().sum::<f64>() / losses.len() as f64])
    }

    fn bound(&self) -> Result<Vec<f64>, FairnessError> {
        self.state()?;
        Ok(vec![f64::INFINITY])
    }

    fn default_objective(&self) -> Box<dyn Moment> {
        Box::new(AverageLossMoment::new(self.loss.clone()))
    }

    fn is_classification(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::{Estimator, LinearModel};

    fn quick_data() -> (Vec<f64>, Vec<f64>, Vec<String>) {
        let x0 = [0., 1., 2., 3., 4., 5., 6., 7., 8., 9.];
        let x1 = [1., 0., 1., 1., 0., 0., 1., 0., 1., 0.];
        let y = vec![0., 0., 1., 1., 0., 1., 1., 1., 0., 1.];
        let a = (0..10).map(|i| if i % 2 == 0 { "p" } else { "q" }.to_string()).collect();
        let mut x = x0.to_vec();
        x.extend_from_slice(&x1);
        (x, y, a)
    }

    #[test]
    fn test_eps() {
        let (x, y, a) = quick_data();
        let x = Matrix::new(&x, 10, 2);
        let eps = 0.01;
        let mut moment = GroupLossMoment::with_upper_bound(Loss::ZeroOne, eps).unwrap();
        moment.load_data(&x, &y, &a).unwrap();

        let mut estimator = LinearModel::linear();
        estimator.fit(&x, &y, None).unwrap();

        let bound = moment.bound().unwrap();
        let loss = moment.gamma(&estimator).unwrap();
        let loss_eps: Vec<f64> = loss.iter().zip(&bound).map(|(l, b)| l - b).collect();
        assert!(loss.iter().any(|l| *l != 0.0));
        assert_eq!(bound.len(), loss.len());
        for (l, le) in loss.iter().zip(&loss_eps) {
            assert!((l - le - eps).abs() < 1e-12);
        }
    }

    #[test]
    fn test_unbounded_and_basis() {
        let (x, y, a) = quick_data();
        let x = Matrix::new(&x, 10, 2);
        let mut moment = GroupLossMoment::new(Loss::square(0.0, 1.0));
        assert!(moment.bound().is_err());
        moment.load_data(&x, &y, &a).unwrap();
        assert_eq!(moment.bound().unwrap(), vec![f64::INFINITY; 2]);

        let basis = moment.basis().unwrap();
        assert_eq!(basis.dim(), 2);
        assert_eq!(basis.neg_allowed, vec![false, false]);
        assert_eq!(basis.pos[1], vec![0.0, 1.0]);
        assert_eq!(moment.default_objective_lambda_vec().unwrap(), Some(vec![0.5, 0.5]));
        assert!(!moment.is_classification());
        assert!(GroupLossMoment::with_upper_bound(Loss::ZeroOne, -1.0).is_err());
    }

    #[test]
    fn test_signed_weights_follow_groups() {
        let (x, y, a) = quick_data();
        let x = Matrix::new(&x, 10, 2);
        let mut moment = GroupLossMoment::new(Loss::ZeroOne);
        moment.load_data(&x, &y, &a).unwrap();
        let w = moment.signed_weights(&[0.5, 1.0]).unwrap();
        assert_eq!(w[0], 1.0);
        assert_eq!(w[1], 2.0);
        assert!(moment.signed_weights(&[1.0]).is_err());
    }

    #[test]
    fn test_objective_in_span() {
        let (x, y, a) = quick_data();
        let x = Matrix::new(&x, 10, 2);
        let mut moment = GroupLossMoment::new(Loss::ZeroOne);
        moment.load_data(&x, &y, &a).unwrap();
        let mut objective = moment.default_objective();
        objective.load_data(&x, &y, &a).unwrap();

        let mut estimator = LinearModel::linear();
        estimator.fit(&x, &y, None).unwrap();
        let group_loss = moment.gamma(&estimator).unwrap();
        let average = objective.gamma(&estimator).unwrap()[0];
        let lambda = moment.default_objective_lambda_vec().unwrap().unwrap();
        let combined: f64 = group_loss.iter().zip(&lambda).map(|(g, l)| g * l).sum();
        assert!((combined - average).abs() < 1e-12);
    }
}
