use crate::constants::ALL_EVENT;
use crate::data::Matrix;
use crate::errors::FairnessError;
use crate::estimator::Predictor;
use crate::moments::{loaded, Basis, IndexLabel, Moment, MomentData};

/// Misclassification rate, `E[|h(X) - Y|]`.
///
/// The objective paired with every parity constraint.
#[derive(Debug, Clone, Default)]
pub struct ErrorRate {
    state: Option<(MomentData, Vec<IndexLabel>)>,
}

impl ErrorRate {
    pub fn new() -> Self {
        ErrorRate { state: None }
    }

    fn data(&self) -> Result<&(MomentData, Vec<IndexLabel>), FairnessError> {
        loaded(&self.state, self.name())
    }
}

impl Moment for ErrorRate {
    fn name(&self) -> &'static str {
        "ErrorRate"
    }

    fn load_data(&mut self, x: &Matrix<f64>, y: &[f64], sensitive_features: &[String]) -> Result<(), FairnessError> {
        let data = MomentData::new(x, y, sensitive_features)?;
        self.state = Some((data, vec![IndexLabel::group(ALL_EVENT)]));
        Ok(())
    }

    fn index(&self) -> Result<&[IndexLabel], FairnessError> {
        Ok(&self.data()?.1)
    }

    fn basis(&self) -> Result<Basis, FairnessError> {
        self.data()?;
        Ok(Basis {
            index_len: 1,
            pos: vec![vec![1.0]],
            neg: vec![vec![0.0]],
            neg_allowed: vec![false],
        })
    }

    /// `lambda * (2y - 1)`: positive rows push the prediction up.
    fn signed_weights(&self, lambda_vec: &[f64]) -> Result<Vec<f64>, FairnessError> {
        let (data, _) = self.data()?;
        let lambda = lambda_vec.first().copied().unwrap_or(1.0);
        Ok(data.y.iter().map(|y| lambda * (2.0 * y - 1.0)).collect())
    }

    fn gamma(&self, predictor: &dyn Predictor) -> Result<Vec<f64>, FairnessError> {
        let (data, _) = self.data()?;
        let pred = data.predict(predictor)?;
        let error: f64 = pred.iter().zip(&data.y).map(|(p, y)| (p - y).abs()).sum();
        Ok(vec![error / data.n_rows() as f64])
    }

    fn bound(&self) -> Result<Vec<f64>, FairnessError> {
        self.data()?;
        Ok(vec![f64::INFINITY])
    }

    fn default_objective(&self) -> Box<dyn Moment> {
        Box::new(ErrorRate::new())
    }

    fn is_classification(&self) -> bool {
        true
    }
}
