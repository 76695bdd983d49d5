//! Negative Logloss function
//!
//! Operates on log-odds predictions.
use crate::constants::PROBABILITY_EPS;
use crate::objective_functions::ObjectiveFunction;
use crate::utils::sigmoid;
use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Deserialize, Serialize, Clone)]
pub struct LogLoss {}

impl ObjectiveFunction for LogLoss {
    #[inline]
    fn gradient(&self, y: &[f64], yhat: &[f64], sample_weight: Option<&[f64]>) -> (Vec<f64>, Vec<f64>) {
        match sample_weight {
            Some(sample_weight) => y
                .iter()
                .zip(yhat)
                .zip(sample_weight)
                .map(|((y_, yhat_), w_)| {
                    let p = sigmoid(*yhat_);
                    ((p - *y_) * *w_, p * (1.0 - p) * *w_)
                })
                .unzip(),
            None => y
                .iter()
                .zip(yhat)
                .map(|(y_, yhat_)| {
                    let p = sigmoid(*yhat_);
                    (p - *y_, p * (1.0 - p))
                })
                .unzip(),
        }
    }

    #[inline]
    fn initial_value(&self, y: &[f64], sample_weight: Option<&[f64]>) -> f64 {
        let (ytot, ntot) = match sample_weight {
            Some(sample_weight) => y
                .iter()
                .zip(sample_weight)
                .fold((0.0, 0.0), |(yt, nt), (y_, w_)| (yt + y_ * w_, nt + w_)),
            None => (y.iter().sum::<f64>(), y.len() as f64),
        };
        if ntot <= 0.0 {
            return 0.0;
        }
        let p = (ytot / ntot).clamp(PROBABILITY_EPS, 1.0 - PROBABILITY_EPS);
        f64::ln(p / (1.0 - p))
    }
}
