//! Linear Model
//!
//! A weighted linear predictor fitted with Newton iterations over an
//! [`Objective`]. `LogLoss` gives logistic regression (with probability
//! output), `SquaredLoss` gives ordinary least squares.
use crate::constants::{NEWTON_MAX_ITER, NEWTON_TOL, RIDGE_JITTER};
use crate::data::Matrix;
use crate::errors::FairnessError;
use crate::estimator::{Estimator, PredictProba, Predictor};
use crate::objective_functions::{Objective, ObjectiveFunction};
use crate::utils::{sigmoid, solve_linear_system, validate_positive_float_parameter};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    /// Loss minimised during fitting.
    pub objective: Objective,
    /// L2 penalty strength. As in liblinear, the intercept is penalised too.
    pub alpha: f64,
    pub fit_intercept: bool,
    pub max_iter: usize,
    /// Convergence tolerance on the largest coefficient update.
    pub tol: f64,
    /// Fitted feature coefficients, empty until `fit` succeeds.
    pub coef: Vec<f64>,
    pub intercept: f64,
}

impl Default for LinearModel {
    fn default() -> Self {
        LinearModel::logistic()
    }
}

impl LinearModel {
    /// Logistic regression with unit L2 penalty.
    pub fn logistic() -> Self {
        LinearModel {
            objective: Objective::LogLoss,
            alpha: 1.0,
            fit_intercept: true,
            max_iter: NEWTON_MAX_ITER,
            tol: NEWTON_TOL,
            coef: Vec::new(),
            intercept: 0.0,
        }
    }

    /// Unpenalised least squares regression.
    pub fn linear() -> Self {
        LinearModel {
            objective: Objective::SquaredLoss,
            alpha: 0.0,
            ..LinearModel::logistic()
        }
    }

    pub fn set_objective(mut self, objective: Objective) -> Self {
        self.objective = objective;
        self
    }

    pub fn set_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn set_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    pub fn set_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn set_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn is_fitted(&self) -> bool {
        !self.coef.is_empty()
    }

    /// Raw, link-scale predictions.
    pub fn decision_function(&self, x: &Matrix<f64>) -> Result<Vec<f64>, FairnessError> {
        if !self.is_fitted() {
            return Err(FairnessError::NotFitted);
        }
        if x.cols != self.coef.len() {
            return Err(FairnessError::InvalidInput(format!(
                "X has {} features, but LinearModel is expecting {} features as input.",
                x.cols,
                self.coef.len()
            )));
        }
        let mut raw = vec![self.intercept; x.rows];
        for (j, c) in self.coef.iter().enumerate() {
            for (r, v) in raw.iter_mut().zip(x.get_col(j)) {
                *r += c * v;
            }
        }
        Ok(raw)
    }

    fn validate_fit_input(
        &self,
        x: &Matrix<f64>,
        y: &[f64],
        sample_weight: Option<&[f64]>,
    ) -> Result<(), FairnessError> {
        validate_positive_float_parameter(self.alpha, "alpha")?;
        if y.len() != x.rows {
            return Err(FairnessError::InconsistentSamples(vec![x.rows, y.len()]));
        }
        if let Some(w) = sample_weight {
            if w.len() != x.rows {
                return Err(FairnessError::InconsistentSamples(vec![x.rows, w.len()]));
            }
            if let Some(bad) = w.iter().find(|v| !v.is_finite() || **v < 0.0) {
                return Err(FairnessError::InvalidParameter(
                    "sample_weight".to_string(),
                    "non-negative finite values".to_string(),
                    bad.to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl Predictor for LinearModel {
    fn predict(&self, x: &Matrix<f64>) -> Result<Vec<f64>, FairnessError> {
        let raw = self.decision_function(x)?;
        Ok(match self.objective {
            Objective::LogLoss => raw.into_iter().map(|r| if r > 0.0 { 1.0 } else { 0.0 }).collect(),
            _ => raw,
        })
    }
}

impl PredictProba for LinearModel {
    fn predict_proba(&self, x: &Matrix<f64>) -> Result<Vec<f64>, FairnessError> {
        Ok(self.decision_function(x)?.into_iter().map(sigmoid).collect())
    }
}

impl Estimator for LinearModel {
    fn fit(&mut self, x: &Matrix<f64>, y: &[f64], sample_weight: Option<&[f64]>) -> Result<(), FairnessError> {
        self.validate_fit_input(x, y, sample_weight)?;

        let n_features = x.cols;
        let p = n_features + usize::from(self.fit_intercept);
        let mut beta = vec![0.0; p];
        if self.fit_intercept {
            beta[n_features] = self.objective.initial_value(y, sample_weight);
        }

        let mut z = vec![0.0; p];
        let mut raw = vec![0.0; x.rows];
        for iteration in 0..self.max_iter {
            for (i, r) in raw.iter_mut().enumerate() {
                *r = if self.fit_intercept { beta[n_features] } else { 0.0 };
                for j in 0..n_features {
                    *r += beta[j] * x.get(i, j);
                }
            }
            let (grad, hess) = self.objective.gradient(y, &raw, sample_weight);

            // Penalised Newton system: (Z' H Z + alpha I) delta = Z' g + alpha beta
            let mut h_mat = vec![0.0; p * p];
            let mut g_vec = vec![0.0; p];
            for i in 0..x.rows {
                for (j, zj) in z.iter_mut().enumerate().take(n_features) {
                    *zj = *x.get(i, j);
                }
                if self.fit_intercept {
                    z[n_features] = 1.0;
                }
                let (g_i, h_i) = (grad[i], hess[i]);
                if g_i == 0.0 && h_i == 0.0 {
                    continue;
                }
                for a in 0..p {
                    g_vec[a] += g_i * z[a];
                    let hz = h_i * z[a];
                    for b in 0..p {
                        h_mat[a * p + b] += hz * z[b];
                    }
                }
            }
            for a in 0..p {
                g_vec[a] += self.alpha * beta[a];
                h_mat[a * p + a] += self.alpha + RIDGE_JITTER;
            }

            let delta = solve_linear_system(&mut h_mat, &mut g_vec, p)
                .ok_or_else(|| FairnessError::estimator("LinearModel: singular Newton system"))?;
            let mut max_step: f64 = 0.0;
            for (b, d) in beta.iter_mut().zip(&delta) {
                *b -= d;
                max_step = max_step.max(d.abs());
            }
            if !max_step.is_finite() {
                return Err(FairnessError::estimator("LinearModel: Newton iterations diverged"));
            }
            if max_step < self.tol {
                debug!("LinearModel converged after {} iterations.", iteration + 1);
                break;
            }
        }

        self.intercept = if self.fit_intercept { beta[n_features] } else { 0.0 };
        beta.truncate(n_features);
        self.coef = beta;
        Ok(())
    }

    fn as_proba(&self) -> Option<&dyn PredictProba> {
        match self.objective {
            Objective::LogLoss => Some(self),
            _ => None,
        }
    }
}
