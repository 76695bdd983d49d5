//! Moments
//!
//! A moment encodes a fairness constraint (or an objective) as a linear
//! functional over group conditioned statistics of a predictor. The grid search
//! only talks to moments through the [`Moment`] trait: it asks for the basis of
//! directions to search over, turns multipliers into sample weights, and scores
//! fitted predictors with `gamma`.
pub mod bounded_group_loss;
pub mod error_rate;
pub mod loss;
pub mod utility_parity;

pub use bounded_group_loss::{AverageLossMoment, GroupLossMoment};
pub use error_rate::ErrorRate;
pub use loss::{Loss, ReductionLoss};
pub use utility_parity::{
    DemographicParity, EqualizedOdds, FalsePositiveRateParity, ParityKind, TruePositiveRateParity, UtilityParity,
};

use crate::data::{Matrix, OwnedMatrix};
use crate::errors::FairnessError;
use crate::estimator::Predictor;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

pub trait Moment: Send + Sync {
    /// Name used in error messages.
    fn name(&self) -> &'static str;

    /// Bind the sample set. Must be called before every other method.
    ///
    /// * `x` - Feature matrix the predictors are evaluated on.
    /// * `y` - Targets.
    /// * `sensitive_features` - One group key per row.
    fn load_data(&mut self, x: &Matrix<f64>, y: &[f64], sensitive_features: &[String]) -> Result<(), FairnessError>;

    /// Labels of the entries of `gamma` and `bound`.
    fn index(&self) -> Result<&[IndexLabel], FairnessError>;

    /// Directions the grid is laid out over.
    fn basis(&self) -> Result<Basis, FairnessError>;

    /// Per-sample signed weights for a multiplier vector in index space.
    fn signed_weights(&self, lambda_vec: &[f64]) -> Result<Vec<f64>, FairnessError>;

    /// Evaluate a predictor on the bound data.
    fn gamma(&self, predictor: &dyn Predictor) -> Result<Vec<f64>, FairnessError>;

    /// Largest tolerated value for each entry of `gamma`.
    fn bound(&self) -> Result<Vec<f64>, FairnessError>;

    /// The moment measuring the loss this constraint is paired with.
    fn default_objective(&self) -> Box<dyn Moment>;

    /// Multipliers reproducing the default objective, when the objective
    /// lies in the span of the constraint.
    fn default_objective_lambda_vec(&self) -> Result<Option<Vec<f64>>, FairnessError> {
        Ok(None)
    }

    /// Whether targets must be binary {0, 1} labels.
    fn is_classification(&self) -> bool;
}

impl<M: Moment + ?Sized> Moment for Box<M> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn load_data(&mut self, x: &Matrix<f64>, y: &[f64], sensitive_features: &[String]) -> Result<(), FairnessError> {
        (**self).load_data(x, y, sensitive_features)
    }

    fn index(&self) -> Result<&[IndexLabel], FairnessError> {
        (**self).index()
    }

    fn basis(&self) -> Result<Basis, FairnessError> {
        (**self).basis()
    }

    fn signed_weights(&self, lambda_vec: &[f64]) -> Result<Vec<f64>, FairnessError> {
        (**self).signed_weights(lambda_vec)
    }

    fn gamma(&self, predictor: &dyn Predictor) -> Result<Vec<f64>, FairnessError> {
        (**self).gamma(predictor)
    }

    fn bound(&self) -> Result<Vec<f64>, FairnessError> {
        (**self).bound()
    }

    fn default_objective(&self) -> Box<dyn Moment> {
        (**self).default_objective()
    }

    fn default_objective_lambda_vec(&self) -> Result<Option<Vec<f64>>, FairnessError> {
        (**self).default_objective_lambda_vec()
    }

    fn is_classification(&self) -> bool {
        (**self).is_classification()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sign {
    Pos,
    Neg,
}

/// Label of a single entry of a moment's `gamma`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexLabel {
    pub sign: Option<Sign>,
    pub event: Option<String>,
    pub group: String,
}

impl IndexLabel {
    pub fn group(group: &str) -> Self {
        IndexLabel {
            sign: None,
            event: None,
            group: group.to_string(),
        }
    }
}

impl fmt::Display for IndexLabel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.sign {
            Some(Sign::Pos) => write!(f, "+,")?,
            Some(Sign::Neg) => write!(f, "-,")?,
            None => {}
        }
        if let Some(event) = &self.event {
            write!(f, "{},", event)?;
        }
        write!(f, "{}", self.group)
    }
}

/// Search directions of a moment.
///
/// `pos[k]` and `neg[k]` are vectors in index space. A grid coordinate `p`
/// along direction `k` contributes `pos[k] * max(p, 0) + neg[k] * max(-p, 0)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Basis {
    /// Length of the moment index.
    pub index_len: usize,
    pub pos: Vec<Vec<f64>>,
    pub neg: Vec<Vec<f64>>,
    pub neg_allowed: Vec<bool>,
}

impl Basis {
    /// Number of directions.
    pub fn dim(&self) -> usize {
        self.pos.len()
    }

    /// Map a grid point into index space.
    pub fn lambda_vec(&self, point: &[f64]) -> Vec<f64> {
        let mut lambda = vec![0.0; self.index_len];
        for ((p, pos), neg) in point.iter().zip(&self.pos).zip(&self.neg) {
            let (up, down) = (p.max(0.0), (-p).max(0.0));
            for ((l, a), b) in lambda.iter_mut().zip(pos).zip(neg) {
                *l += a * up + b * down;
            }
        }
        lambda
    }
}

/// Sample set bound to a moment.
#[derive(Debug, Clone)]
pub(crate) struct MomentData {
    pub x: OwnedMatrix,
    pub y: Vec<f64>,
    /// Group keys in order of first appearance.
    pub groups: Vec<String>,
    /// Position in `groups` of every row.
    pub group_ids: Vec<usize>,
}

impl MomentData {
    pub fn new(x: &Matrix<f64>, y: &[f64], sensitive_features: &[String]) -> Result<Self, FairnessError> {
        if y.len() != x.rows || sensitive_features.len() != x.rows {
            return Err(FairnessError::InconsistentSamples(vec![
                x.rows,
                y.len(),
                sensitive_features.len(),
            ]));
        }
        if x.rows == 0 {
            return Err(FairnessError::NoSamples(x.cols));
        }
        let mut lookup: HashMap<&str, usize> = HashMap::new();
        let mut groups = Vec::new();
        let mut group_ids = Vec::with_capacity(sensitive_features.len());
        for key in sensitive_features {
            let id = *lookup.entry(key.as_str()).or_insert_with(|| {
                groups.push(key.clone());
                groups.len() - 1
            });
            group_ids.push(id);
        }
        Ok(MomentData {
            x: OwnedMatrix::new(x.data.to_vec(), x.rows, x.cols),
            y: y.to_vec(),
            groups,
            group_ids,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.y.len()
    }

    /// Fraction of rows in each group.
    pub fn group_probabilities(&self) -> Vec<f64> {
        let mut counts = vec![0.0; self.groups.len()];
        for g in &self.group_ids {
            counts[*g] += 1.0;
        }
        let n = self.n_rows() as f64;
        counts.into_iter().map(|c| c / n).collect()
    }

    pub fn predict(&self, predictor: &dyn Predictor) -> Result<Vec<f64>, FairnessError> {
        let pred = predictor.predict(&self.x.view())?;
        if pred.len() != self.n_rows() {
            return Err(FairnessError::InconsistentSamples(vec![self.n_rows(), pred.len()]));
        }
        Ok(pred)
    }
}

/// Borrow loaded data or fail with the moment's name.
pub(crate) fn loaded<'a, T>(state: &'a Option<T>, name: &str) -> Result<&'a T, FairnessError> {
    state
        .as_ref()
        .ok_or_else(|| FairnessError::DataNotLoaded(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moment_data_groups_by_first_appearance() {
        let x = vec![0.0; 5];
        let a: Vec<String> = ["b", "a", "b", "c", "a"].iter().map(|s| s.to_string()).collect();
        let data = MomentData::new(&Matrix::new(&x, 5, 1), &[0.0; 5], &a).unwrap();
        assert_eq!(data.groups, vec!["b", "a", "c"]);
        assert_eq!(data.group_ids, vec![0, 1, 0, 2, 1]);
        assert_eq!(data.group_probabilities(), vec![0.4, 0.4, 0.2]);
    }

    #[test]
    fn test_moment_data_length_mismatch() {
        let x = vec![0.0; 3];
        let a = vec!["a".to_string(); 2];
        let err = MomentData::new(&Matrix::new(&x, 3, 1), &[0.0; 3], &a).unwrap_err();
        assert!(matches!(err, FairnessError::InconsistentSamples(_)));
    }

    #[test]
    fn test_basis_lambda_vec() {
        let basis = Basis {
            index_len: 4,
            pos: vec![vec![1.0, 0.0, 0.0, 0.0], vec![0.0, 1.0, 0.0, 0.0]],
            neg: vec![vec![0.0, 0.0, 1.0, 0.0], vec![0.0, 0.0, 0.0, 1.0]],
            neg_allowed: vec![true, true],
        };
        assert_eq!(basis.dim(), 2);
        assert_eq!(basis.lambda_vec(&[0.5, -2.0]), vec![0.5, 0.0, 0.0, 2.0]);
        assert_eq!(basis.lambda_vec(&[0.0, 0.0]), vec![0.0; 4]);
    }

    #[test]
    fn test_index_label_display() {
        let label = IndexLabel {
            sign: Some(Sign::Neg),
            event: Some("label=1".to_string()),
            group: "a".to_string(),
        };
        assert_eq!(label.to_string(), "-,label=1,a");
        assert_eq!(IndexLabel::group("b").to_string(), "b");
    }
}
