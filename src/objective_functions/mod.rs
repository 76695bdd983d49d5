//! Objective Functions
//!
//! Losses that the reference estimators minimise. Each provides the per-sample
//! gradient and hessian with respect to the raw (link-scale) prediction.
mod log_loss;
mod squared_loss;

// make loss functions public
pub use log_loss::LogLoss;
pub use squared_loss::SquaredLoss;

pub mod objective;

pub use objective::Objective;
pub use objective::ObjectiveFunction;
