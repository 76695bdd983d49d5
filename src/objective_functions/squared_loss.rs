//! Squared Loss function for regression.
use crate::objective_functions::objective::ObjectiveFunction;
use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Deserialize, Serialize, Clone)]
/// Squared Error loss, minimizes `(y - ŷ)²`.
pub struct SquaredLoss {}

impl ObjectiveFunction for SquaredLoss {
    #[inline]
    fn gradient(&self, y: &[f64], yhat: &[f64], sample_weight: Option<&[f64]>) -> (Vec<f64>, Vec<f64>) {
        let len = y.len();
        let mut g = Vec::with_capacity(len);
        let mut h = Vec::with_capacity(len);
        for i in 0..len {
            let w = sample_weight.map_or(1.0, |w| w[i]);
            g.push((yhat[i] - y[i]) * w);
            h.push(w);
        }
        (g, h)
    }

    #[inline]
    fn initial_value(&self, y: &[f64], sample_weight: Option<&[f64]>) -> f64 {
        match sample_weight {
            Some(sample_weight) => {
                let mut ytot: f64 = 0.;
                let mut ntot: f64 = 0.;
                for i in 0..y.len() {
                    ytot += sample_weight[i] * y[i];
                    ntot += sample_weight[i];
                }
                if ntot > 0.0 {
                    ytot / ntot
                } else {
                    0.0
                }
            }
            None => y.iter().sum::<f64>() / y.len().max(1) as f64,
        }
    }
}
