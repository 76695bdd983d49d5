pub const GRID_DIMENSION_WARN_THRESHOLD: usize = 4;
pub const DEFAULT_GRID_SIZE: usize = 10;
pub const DEFAULT_GRID_LIMIT: f64 = 2.0;
pub const DEFAULT_CONSTRAINT_WEIGHT: f64 = 0.5;

pub const NO_PREDICT_BEFORE_FIT: &str = "Must call fit before attempting to make predictions";
pub const MESSAGE_Y_NONE: &str = "Must supply y";
pub const SENSITIVE_FEATURES_NONE_MESSAGE: &str = "Must specify sensitive_features";
pub const LABELS_NOT_0_1_ERROR_MESSAGE: &str = "Supplied y labels are not 0 or 1";
pub const EXPECTED_2D_ARRAY_MESSAGE: &str = "Expected 2D array, got scalar array instead:\narray=None.\n\
Reshape your data either using array.reshape(-1, 1) if your data has a single feature \
or array.reshape(1, -1) if it contains a single sample.";
pub const INPUT_NOT_FINITE_MESSAGE: &str = "Input contains NaN, infinity or a value too large for dtype('float64').";

pub const ALL_EVENT: &str = "all";
pub const LABEL_EVENT_PREFIX: &str = "label=";

pub const NEWTON_MAX_ITER: usize = 100;
pub const NEWTON_TOL: f64 = 1e-8;
pub const RIDGE_JITTER: f64 = 1e-10;
pub const PROBABILITY_EPS: f64 = 1e-12;
