//! Grid Search
//!
//! Reduces a fairness constrained learning problem to a sequence of weighted,
//! unconstrained fits. Every point of a grid of Lagrange multipliers becomes
//! one re-weighted fit of a fresh clone of the estimator; the fitted
//! candidates are scored on the objective and the constraint and the best one
//! is kept for prediction.
pub mod config;
pub mod grid;
pub mod reweight;
pub mod selection;
pub mod setters;


pub use config::{ConfigIO, GridSearchConfig, SelectionRule};
pub use grid::{Diagnostic, Grid, GridGenerator, GridStrategy, GridStrategyKind};
pub use reweight::reweight;

use crate::data::{ArrayLike, Matrix, OwnedMatrix};
use crate::errors::FairnessError;
use crate::estimator::Estimator;
use crate::moments::Moment;
use crate::utils::fmt_vec_output;
use crate::validation::{validate_and_reformat_input, validate_features};
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// One fitted grid point.
#[derive(Debug, Clone)]
pub struct Candidate<E> {
    /// Multipliers in the constraint's index space.
    pub lambda_vec: Vec<f64>,
    pub predictor: E,
    /// Objective value on the training data.
    pub objective: f64,
    /// Constraint values on the training data.
    pub gamma: Vec<f64>,
    /// Largest excess of `gamma` over the bound, zero when within it.
    pub violation: f64,
    pub fit_seconds: f64,
}

/// Everything a successful fit produces.
#[derive(Debug, Clone)]
pub struct FittedGridSearch<E> {
    pub candidates: Vec<Candidate<E>>,
    pub best_idx: usize,
    pub diagnostics: Vec<Diagnostic>,
    /// Labels of the constraint's gamma entries.
    pub index: Vec<String>,
    pub bound: Vec<f64>,
    pub n_features: usize,
}

/// Serializable summary of a fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSearchReport {
    pub config: GridSearchConfig,
    pub index: Vec<String>,
    /// `None` for entries without a bound.
    pub bound: Vec<Option<f64>>,
    pub best_idx: usize,
    pub diagnostics: Vec<Diagnostic>,
    pub candidates: Vec<CandidateReport>,
}

/// Scores of one candidate. Non-finite values are `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateReport {
    pub lambda_vec: Vec<f64>,
    pub objective: Option<f64>,
    pub gamma: Vec<Option<f64>>,
    pub violation: Option<f64>,
    pub fit_seconds: f64,
}

impl ConfigIO for GridSearchReport {}

// JSON has no NaN or infinity.
fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

/// Fairness constrained estimator built from a base estimator and a constraint.
pub struct GridSearch<E, M> {
    /// Unfitted template, cloned for every grid point.
    pub estimator: E,
    pub constraints: M,
    pub cfg: GridSearchConfig,
    fitted: Option<FittedGridSearch<E>>,
}

impl<E, M> GridSearch<E, M>
where
    E: Estimator + Clone,
    M: Moment,
{
    pub fn new(estimator: E, constraints: M) -> Self {
        GridSearch {
            estimator,
            constraints,
            cfg: GridSearchConfig::default(),
            fitted: None,
        }
    }

    /// Create a grid search from an existing configuration.
    pub fn with_config(estimator: E, constraints: M, cfg: GridSearchConfig) -> Result<Self, FairnessError> {
        cfg.validate()?;
        Ok(GridSearch {
            estimator,
            constraints,
            cfg,
            fitted: None,
        })
    }

    /// Fit one estimator per grid point and select the best.
    ///
    /// * `x` - Features, 2-D.
    /// * `y` - Targets, 1-D or a single column. Binary {0, 1} for classification constraints.
    /// * `sensitive_features` - Group membership, 1-D or 2-D, numeric or categorical.
    ///
    /// On failure the search is left unfitted.
    pub fn fit(
        &mut self,
        x: Option<&ArrayLike>,
        y: Option<&ArrayLike>,
        sensitive_features: Option<&ArrayLike>,
    ) -> Result<(), FairnessError> {
        self.fitted = None;
        self.cfg.validate()?;
        let start = Instant::now();

        let is_classification = self.constraints.is_classification();
        let input = validate_and_reformat_input(x, y, sensitive_features, true, is_classification)?;
        let y = input.y.ok_or(FairnessError::YNone)?;
        let sensitive_features = input.sensitive_features.ok_or(FairnessError::SensitiveFeaturesNone)?;
        let x = input.x;
        let x_view = x.view();

        self.constraints.load_data(&x_view, &y, &sensitive_features)?;
        let mut objective = self.constraints.default_objective();
        objective.load_data(&x_view, &y, &sensitive_features)?;
        let objective_in_span = self.constraints.default_objective_lambda_vec()?.is_some();

        let index: Vec<String> = self.constraints.index()?.iter().map(|l| l.to_string()).collect();
        let (lambda_vecs, diagnostics) = self.build_grid(index.len(), objective_in_span)?;
        for d in &diagnostics {
            warn!("{}", d);
        }
        let bound = self.constraints.bound()?;

        let log_iterations = self.cfg.log_iterations;
        let n_points = lambda_vecs.len();
        let estimator = &self.estimator;
        let constraints = &self.constraints;
        let objective = objective.as_ref();
        let fit_point = |(i, lambda_vec): (usize, &Vec<f64>)| -> Result<Candidate<E>, FairnessError> {
            let point_start = Instant::now();
            let (y_fit, weights) =
                reweight(constraints, objective, lambda_vec, &y, objective_in_span, is_classification)?;
            let mut predictor = estimator.clone();
            predictor.fit(&x_view, &y_fit, Some(weights.as_slice()))?;
            let fit_seconds = point_start.elapsed().as_secs_f64();

            let objective_value = objective.gamma(&predictor)?.first().copied().unwrap_or(f64::NAN);
            let gamma = constraints.gamma(&predictor)?;
            let violation = selection::violation(&gamma, &bound);
            debug!(
                "grid point {}, lambda: [{}], objective: {:.4}, violation: {:.4}",
                i,
                fmt_vec_output(lambda_vec),
                objective_value,
                violation
            );
            if log_iterations > 0 && (i + 1) % log_iterations == 0 {
                info!("Fitted {} of {} grid points.", i + 1, n_points);
            }
            Ok(Candidate {
                lambda_vec: lambda_vec.clone(),
                predictor,
                objective: objective_value,
                gamma,
                violation,
                fit_seconds,
            })
        };

        let candidates: Vec<Candidate<E>> = if self.cfg.parallel {
            let num_threads = match self.cfg.num_threads {
                Some(num_threads) => num_threads,
                None => std::thread::available_parallelism().map_or(1, |n| n.get()),
            };
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build()
                .map_err(|e| {
                    FairnessError::InvalidParameter(
                        "num_threads".to_string(),
                        "a size the thread pool can be built with".to_string(),
                        e.to_string(),
                    )
                })?;
            pool.install(|| lambda_vecs.par_iter().enumerate().map(fit_point).collect::<Result<Vec<_>, _>>())?
        } else {
            lambda_vecs
                .iter()
                .enumerate()
                .map(fit_point)
                .collect::<Result<Vec<_>, _>>()?
        };

        let objectives: Vec<f64> = candidates.iter().map(|c| c.objective).collect();
        let gammas: Vec<Vec<f64>> = candidates.iter().map(|c| c.gamma.clone()).collect();
        let violations: Vec<f64> = candidates.iter().map(|c| c.violation).collect();
        let best_idx = selection::select_best(&objectives, &gammas, &violations, &self.cfg.selection_rule)
            .ok_or_else(|| FairnessError::InvalidInput("The grid is empty.".to_string()))?;

        if log_iterations > 0 {
            info!(
                "Finished fitting {} grid points in {} seconds, best candidate {} with objective {:.4}.",
                candidates.len(),
                start.elapsed().as_secs(),
                best_idx,
                candidates[best_idx].objective
            );
        }

        self.fitted = Some(FittedGridSearch {
            candidates,
            best_idx,
            diagnostics,
            index,
            bound,
            n_features: x.cols,
        });
        Ok(())
    }

    /// Multiplier vectors to fit, with the diagnostics of their generation.
    fn build_grid(
        &self,
        index_len: usize,
        objective_in_span: bool,
    ) -> Result<(Vec<Vec<f64>>, Vec<Diagnostic>), FairnessError> {
        match &self.cfg.grid {
            Some(grid) => {
                if let Some(bad) = grid.iter().find(|l| l.len() != index_len) {
                    return Err(FairnessError::InvalidParameter(
                        "grid".to_string(),
                        format!("{} multipliers per grid point", index_len),
                        bad.len().to_string(),
                    ));
                }
                Ok((grid.clone(), Vec::new()))
            }
            None => {
                let basis = self.constraints.basis()?;
                let grid = self.cfg.generator().generate(&basis, objective_in_span)?;
                Ok((grid.lambda_vecs, grid.diagnostics))
            }
        }
    }

    fn fitted(&self) -> Result<&FittedGridSearch<E>, FairnessError> {
        self.fitted.as_ref().ok_or(FairnessError::NotFitted)
    }

    fn features(&self, x: &ArrayLike, n_features: usize) -> Result<OwnedMatrix, FairnessError> {
        let x = validate_features(x)?;
        if x.cols != n_features {
            return Err(FairnessError::InvalidInput(format!(
                "X has {} features, but GridSearch is expecting {} features as input.",
                x.cols, n_features
            )));
        }
        Ok(x)
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Predict with the best candidate.
    pub fn predict(&self, x: &ArrayLike) -> Result<Vec<f64>, FairnessError> {
        let fitted = self.fitted()?;
        let x = self.features(x, fitted.n_features)?;
        fitted.candidates[fitted.best_idx].predictor.predict(&x.view())
    }

    /// Probability of the positive class from the best candidate.
    pub fn predict_proba(&self, x: &ArrayLike) -> Result<Vec<f64>, FairnessError> {
        let fitted = self.fitted()?;
        let proba = fitted.candidates[fitted.best_idx]
            .predictor
            .as_proba()
            .ok_or(FairnessError::ProbabilityNotSupported)?;
        let x = self.features(x, fitted.n_features)?;
        proba.predict_proba(&x.view())
    }

    /// Convex combination of the predictions of all candidates.
    ///
    /// * `weights` - One non-negative weight per candidate, summing to 1.
    pub fn predict_mixture(&self, x: &ArrayLike, weights: &[f64]) -> Result<Vec<f64>, FairnessError> {
        let fitted = self.fitted()?;
        selection::validate_mixture_weights(weights, fitted.candidates.len())?;
        let x = self.features(x, fitted.n_features)?;
        let view: Matrix<f64> = x.view();
        let mut out = vec![0.0; x.rows];
        for (c, w) in fitted.candidates.iter().zip(weights) {
            if *w == 0.0 {
                continue;
            }
            for (o, p) in out.iter_mut().zip(c.predictor.predict(&view)?) {
                *o += w * p;
            }
        }
        Ok(out)
    }

    /// All fitted candidates in grid order.
    pub fn candidates(&self) -> Result<&[Candidate<E>], FairnessError> {
        Ok(&self.fitted()?.candidates)
    }

    pub fn best_idx(&self) -> Result<usize, FairnessError> {
        Ok(self.fitted()?.best_idx)
    }

    /// Advisory findings of the last fit.
    pub fn diagnostics(&self) -> Result<&[Diagnostic], FairnessError> {
        Ok(&self.fitted()?.diagnostics)
    }

    /// Indices of candidates not dominated on objective and violation.
    pub fn pareto_front(&self) -> Result<Vec<usize>, FairnessError> {
        let fitted = self.fitted()?;
        let objectives: Vec<f64> = fitted.candidates.iter().map(|c| c.objective).collect();
        let violations: Vec<f64> = fitted.candidates.iter().map(|c| c.violation).collect();
        Ok(selection::pareto_front(&objectives, &violations))
    }

    pub fn report(&self) -> Result<GridSearchReport, FairnessError> {
        let fitted = self.fitted()?;
        Ok(GridSearchReport {
            config: self.cfg.clone(),
            index: fitted.index.clone(),
            bound: fitted.bound.iter().copied().map(finite).collect(),
            best_idx: fitted.best_idx,
            diagnostics: fitted.diagnostics.clone(),
            candidates: fitted
                .candidates
                .iter()
                .map(|c| CandidateReport {
                    lambda_vec: c.lambda_vec.clone(),
                    objective: finite(c.objective),
                    gamma: c.gamma.iter().copied().map(finite).collect(),
                    violation: finite(c.violation),
                    fit_seconds: c.fit_seconds,
                })
                .collect(),
        })
    }
}
