//! Errors
//!
//! Custom error types used throughout the `fairgrid` crate.
use crate::constants::{
    EXPECTED_2D_ARRAY_MESSAGE, INPUT_NOT_FINITE_MESSAGE, LABELS_NOT_0_1_ERROR_MESSAGE, MESSAGE_Y_NONE,
    NO_PREDICT_BEFORE_FIT, SENSITIVE_FEATURES_NONE_MESSAGE,
};
use thiserror::Error;

/// Errors that can occur while fitting or using a fairness reduction.
#[derive(Debug, Error)]
pub enum FairnessError {
    /// `X` was not supplied.
    #[error("{}", EXPECTED_2D_ARRAY_MESSAGE)]
    XNone,
    /// `y` was not supplied.
    #[error("{}", MESSAGE_Y_NONE)]
    YNone,
    /// Sensitive features were not supplied.
    #[error("{}", SENSITIVE_FEATURES_NONE_MESSAGE)]
    SensitiveFeaturesNone,
    /// A classification criterion received labels outside of {0, 1}.
    #[error("{}", LABELS_NOT_0_1_ERROR_MESSAGE)]
    LabelsNotBinary,
    /// Target with more than one column, first value is rows, second is columns.
    #[error("bad input shape ({0}, {1})")]
    BadInputShape(usize, usize),
    /// Inputs disagree on the number of rows.
    #[error("Found input variables with inconsistent numbers of samples: {0:?}")]
    InconsistentSamples(Vec<usize>),
    /// An input has no rows, the value is the number of columns.
    #[error("Found array with 0 sample(s) (shape=(0, {0})) while a minimum of 1 is required.")]
    NoSamples(usize),
    /// Missing or non-finite value found in numeric input.
    #[error("{}", INPUT_NOT_FINITE_MESSAGE)]
    NotFinite,
    /// Any other malformed input, the value describes the problem.
    #[error("{0}")]
    InvalidInput(String),
    /// A moment was queried before `load_data`.
    #[error("Data has not been loaded into the {0} moment.")]
    DataNotLoaded(String),
    /// Prediction requested before a successful fit.
    #[error("{}", NO_PREDICT_BEFORE_FIT)]
    NotFitted,
    /// The estimator has no probability output.
    #[error("The underlying estimator does not support predict_proba.")]
    ProbabilityNotSupported,
    /// Failure raised by the wrapped estimator, passed on unchanged.
    #[error("{0}")]
    Estimator(Box<dyn std::error::Error + Send + Sync>),
    /// Invalid value parsing.
    #[error("Invalid value {0} passed for {1}, expected one of {2}.")]
    ParseString(String, String, String),
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("Invalid parameter value passed for {0}, expected {1} but {2} provided.")]
    InvalidParameter(String, String, String),
    /// Unable to write to file.
    #[error("Unable to write to file: {0}")]
    UnableToWrite(String),
    /// Unable to read from file.
    #[error("Unable to read from a file {0}")]
    UnableToRead(String),
}

impl FairnessError {
    /// Wrap an error raised inside an estimator.
    pub fn estimator<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        FairnessError::Estimator(err.into())
    }
}
