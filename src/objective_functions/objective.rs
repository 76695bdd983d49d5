use crate::objective_functions::{LogLoss, SquaredLoss};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub trait ObjectiveFunction: Send + Sync {
    /// Per-sample gradient and hessian of the loss with respect to `yhat`.
    fn gradient(&self, y: &[f64], yhat: &[f64], sample_weight: Option<&[f64]>) -> (Vec<f64>, Vec<f64>);
    /// Best constant raw prediction.
    fn initial_value(&self, y: &[f64], sample_weight: Option<&[f64]>) -> f64;
}

#[derive(Serialize, Deserialize, Clone)]
pub enum Objective {
    LogLoss,
    SquaredLoss,
    #[serde(skip)]
    Custom(Arc<dyn ObjectiveFunction>),
}

impl Objective {
    pub fn new_custom<T>(objective: T) -> Self
    where
        T: ObjectiveFunction + 'static,
    {
        Objective::Custom(Arc::new(objective))
    }
}

impl std::fmt::Debug for Objective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Objective::LogLoss => write!(f, "LogLoss"),
            Objective::SquaredLoss => write!(f, "SquaredLoss"),
            Objective::Custom(_) => write!(f, "Custom"),
        }
    }
}

impl ObjectiveFunction for Objective {
    fn gradient(&self, y: &[f64], yhat: &[f64], sample_weight: Option<&[f64]>) -> (Vec<f64>, Vec<f64>) {
        match self {
            Objective::LogLoss => LogLoss::default().gradient(y, yhat, sample_weight),
            Objective::SquaredLoss => SquaredLoss::default().gradient(y, yhat, sample_weight),
            Objective::Custom(arc) => arc.gradient(y, yhat, sample_weight),
        }
    }

    fn initial_value(&self, y: &[f64], sample_weight: Option<&[f64]>) -> f64 {
        match self {
            Objective::LogLoss => LogLoss::default().initial_value(y, sample_weight),
            Objective::SquaredLoss => SquaredLoss::default().initial_value(y, sample_weight),
            Objective::Custom(arc) => arc.initial_value(y, sample_weight),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    // Common data used across tests
    static Y: &[f64] = &[0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
    static YHAT1: &[f64] = &[-1.0, -1.0, -1.0, 1.0, 1.0, 1.0];
    static YHAT2: &[f64] = &[0.0, 0.0, -1.0, 1.0, 0.0, 1.0];

    fn sum_grad(obj: &Objective, yhat: &[f64]) -> f64 {
        let (g, _) = obj.gradient(Y, yhat, None);
        g.iter().sum()
    }

    #[test]
    fn test_logloss_grad() {
        let objective_function = Objective::LogLoss;
        assert!(sum_grad(&objective_function, YHAT1) < sum_grad(&objective_function, YHAT2));
    }

    #[test]
    fn test_logloss_init() {
        let objective_function = Objective::LogLoss;
        assert_eq!(objective_function.initial_value(Y, None), 0.0);

        // Degenerate targets are clamped instead of diverging.
        let all_ones = vec![1.0; 6];
        let init = Objective::LogLoss.initial_value(&all_ones, None);
        assert!(init.is_finite() && init > 0.0);

        let mixed = &[0.0, 0.0, 0.0, 0.0, 1.0, 1.0];
        let expected = f64::ln(2.0 / 4.0);
        assert!((Objective::LogLoss.initial_value(mixed, None) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_mse_init() {
        let objective_function = Objective::SquaredLoss;
        assert_eq!(objective_function.initial_value(Y, None), 0.5);

        let mixed = &[-1.0, -1.0, -1.0, 1.0, 1.0, 1.0];
        assert_eq!(Objective::SquaredLoss.initial_value(mixed, None), 0.0);

        let weights = &[0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        assert_eq!(Objective::SquaredLoss.initial_value(mixed, Some(weights)), 1.0);
    }

    #[test]
    fn test_custom_objective_dispatch() {
        let custom = Objective::new_custom(SquaredLoss::default());
        assert_eq!(sum_grad(&custom, YHAT1), sum_grad(&Objective::SquaredLoss, YHAT1));
        assert_eq!(format!("{:?}", custom), "Custom");
    }
}
