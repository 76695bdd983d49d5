//! Reduction Losses
//!
//! Per-sample losses used by the bounded group loss moments. Both the targets
//! and the predictions are clipped to the loss range before evaluation.
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub trait ReductionLoss: Send + Sync {
    /// Per-sample loss of `y_pred` against `y_true`.
    fn eval(&self, y_true: &[f64], y_pred: &[f64]) -> Vec<f64>;
}

#[derive(Serialize, Deserialize, Clone)]
pub enum Loss {
    /// `(clip(y) - clip(yhat))^2` on `[min_val, max_val]`.
    Square { min_val: f64, max_val: f64 },
    /// `|clip(y) - clip(yhat)|` on `[min_val, max_val]`.
    Absolute { min_val: f64, max_val: f64 },
    /// Absolute loss on `[0, 1]`.
    ZeroOne,
    #[serde(skip)]
    Custom(Arc<dyn ReductionLoss>),
}

impl Loss {
    pub fn square(min_val: f64, max_val: f64) -> Self {
        Loss::Square { min_val, max_val }
    }

    pub fn absolute(min_val: f64, max_val: f64) -> Self {
        Loss::Absolute { min_val, max_val }
    }

    pub fn new_custom<T>(loss: T) -> Self
    where
        T: ReductionLoss + 'static,
    {
        Loss::Custom(Arc::new(loss))
    }
}

impl std::fmt::Debug for Loss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Loss::Square { min_val, max_val } => write!(f, "Square({}, {})", min_val, max_val),
            Loss::Absolute { min_val, max_val } => write!(f, "Absolute({}, {})", min_val, max_val),
            Loss::ZeroOne => write!(f, "ZeroOne"),
            Loss::Custom(_) => write!(f, "Custom"),
        }
    }
}

#[inline]
fn clip(v: f64, min_val: f64, max_val: f64) -> f64 {
    v.max(min_val).min(max_val)
}

fn clipped_loss<F>(y_true: &[f64], y_pred: &[f64], min_val: f64, max_val: f64, f: F) -> Vec<f64>
where
    F: Fn(f64) -> f64,
{
    y_true
        .iter()
        .zip(y_pred)
        .map(|(y, p)| f(clip(*y, min_val, max_val) - clip(*p, min_val, max_val)))
        .collect()
}

impl ReductionLoss for Loss {
    fn eval(&self, y_true: &[f64], y_pred: &[f64]) -> Vec<f64> {
        match self {
            Loss::Square { min_val, max_val } => clipped_loss(y_true, y_pred, *min_val, *max_val, |d| d * d),
            Loss::Absolute { min_val, max_val } => clipped_loss(y_true, y_pred, *min_val, *max_val, f64::abs),
            Loss::ZeroOne => clipped_loss(y_true, y_pred, 0.0, 1.0, f64::abs),
            Loss::Custom(arc) => arc.eval(y_true, y_pred),
        }
    }
}
