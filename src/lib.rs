// Modules
pub mod constants;
pub mod data;
pub mod errors;
pub mod estimator;
pub mod grid_search;
pub mod moments;
pub mod objective_functions;
pub mod utils;
pub mod validation;

// Individual classes, and functions
pub use data::{ArrayLike, ColumnarMatrix, Matrix};
pub use errors::FairnessError;
pub use estimator::{Estimator, LinearModel, PredictProba, Predictor};
pub use grid_search::{GridSearch, GridSearchConfig, SelectionRule};
pub use moments::{
    AverageLossMoment, DemographicParity, EqualizedOdds, ErrorRate, FalsePositiveRateParity, GroupLossMoment, Loss,
    Moment, TruePositiveRateParity, UtilityParity,
};
