//! Estimator
//!
//! The capability contract a learner must satisfy to be wrapped by a reduction.
//! Any weighted learner can take part by implementing [`Estimator`]; probability
//! output is an optional capability discovered through [`Estimator::as_proba`].
//!
//! A reduction needs one independent, unfitted learner per grid point. It gets
//! them by cloning the unfitted template it was built with, so implementations
//! must make `clone` of an unfitted value produce an unfitted value.
use crate::data::Matrix;
use crate::errors::FairnessError;

pub mod linear;

pub use linear::LinearModel;

/// Anything that maps a feature matrix to one prediction per row.
pub trait Predictor {
    fn predict(&self, x: &Matrix<f64>) -> Result<Vec<f64>, FairnessError>;
}

/// Optional probability output, the probability of the positive class per row.
pub trait PredictProba {
    fn predict_proba(&self, x: &Matrix<f64>) -> Result<Vec<f64>, FairnessError>;
}

/// A learner that can be fitted on weighted samples.
pub trait Estimator: Predictor + Send + Sync {
    /// Fit on `x` and `y`, every row weighted by `sample_weight` (uniform when `None`).
    ///
    /// Rows with zero weight must be tolerated, they simply do not contribute.
    fn fit(&mut self, x: &Matrix<f64>, y: &[f64], sample_weight: Option<&[f64]>) -> Result<(), FairnessError>;

    /// The probability interface, if this estimator has one.
    fn as_proba(&self) -> Option<&dyn PredictProba> {
        None
    }
}

/// Wrap a closure so it can be scored by a moment.
pub struct FnPredictor<F>(pub F);

impl<F> Predictor for FnPredictor<F>
where
    F: Fn(&Matrix<f64>) -> Vec<f64>,
{
    fn predict(&self, x: &Matrix<f64>) -> Result<Vec<f64>, FairnessError> {
        Ok((self.0)(x))
    }
}
