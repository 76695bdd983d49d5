//! Grid Search Configuration
//!
//! Settings of a grid search, how the grid is laid out and how the best
//! candidate is picked, together with their JSON persistence.
use crate::constants::{DEFAULT_CONSTRAINT_WEIGHT, DEFAULT_GRID_LIMIT, DEFAULT_GRID_SIZE};
use crate::errors::FairnessError;
use crate::grid_search::grid::{GridGenerator, GridStrategyKind};
use crate::utils::{items_to_strings, validate_float_parameter};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// How the best candidate is chosen among the fitted grid points.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug, Default)]
pub enum SelectionRule {
    /// Lowest objective among candidates within the bound. When none is,
    /// lowest violation, then lowest objective, then first in grid order.
    #[default]
    BoundedObjective,
    /// Lowest `(1 - constraint_weight) * objective + constraint_weight * max(gamma)`.
    TradeoffOptimization { constraint_weight: f64 },
}

impl SelectionRule {
    pub fn validate(&self) -> Result<(), FairnessError> {
        match self {
            SelectionRule::BoundedObjective => Ok(()),
            SelectionRule::TradeoffOptimization { constraint_weight } => {
                validate_float_parameter(*constraint_weight, 0.0, 1.0, "constraint_weight")
            }
        }
    }
}

impl FromStr for SelectionRule {
    type Err = FairnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BoundedObjective" => Ok(SelectionRule::BoundedObjective),
            "TradeoffOptimization" => Ok(SelectionRule::TradeoffOptimization {
                constraint_weight: DEFAULT_CONSTRAINT_WEIGHT,
            }),
            _ => Err(FairnessError::ParseString(
                s.to_string(),
                "SelectionRule".to_string(),
                items_to_strings(vec!["BoundedObjective", "TradeoffOptimization"]),
            )),
        }
    }
}

impl FromStr for GridStrategyKind {
    type Err = FairnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "L1Ball" => Ok(GridStrategyKind::L1Ball),
            "Cartesian" => Ok(GridStrategyKind::Cartesian { seed: 0 }),
            _ => Err(FairnessError::ParseString(
                s.to_string(),
                "GridStrategy".to_string(),
                items_to_strings(vec!["L1Ball", "Cartesian"]),
            )),
        }
    }
}

fn default_grid_size() -> usize {
    DEFAULT_GRID_SIZE
}
fn default_grid_limit() -> f64 {
    DEFAULT_GRID_LIMIT
}
fn default_log_iterations() -> usize {
    0
}

/// Configuration for the `GridSearch`.
#[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
pub struct GridSearchConfig {
    /// Number of grid points to fit.
    #[serde(default = "default_grid_size")]
    pub grid_size: usize,
    /// Largest absolute multiplier along any basis direction.
    #[serde(default = "default_grid_limit")]
    pub grid_limit: f64,
    /// Shift applied to every generated point, one value per basis direction.
    #[serde(default)]
    pub grid_offset: Option<Vec<f64>>,
    /// Explicit multiplier vectors in moment index space. Replaces generation.
    #[serde(default)]
    pub grid: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    pub grid_strategy: GridStrategyKind,
    #[serde(default)]
    pub selection_rule: SelectionRule,
    /// Fit grid points on a thread pool.
    #[serde(default)]
    pub parallel: bool,
    /// Number of threads for parallel fitting, all available when `None`.
    #[serde(default)]
    pub num_threads: Option<usize>,
    /// Logging frequency (every N grid points), 0 disables.
    #[serde(default = "default_log_iterations")]
    pub log_iterations: usize,
}

impl Default for GridSearchConfig {
    fn default() -> Self {
        GridSearchConfig {
            grid_size: DEFAULT_GRID_SIZE,
            grid_limit: DEFAULT_GRID_LIMIT,
            grid_offset: None,
            grid: None,
            grid_strategy: GridStrategyKind::L1Ball,
            selection_rule: SelectionRule::BoundedObjective,
            parallel: false,
            num_threads: None,
            log_iterations: 0,
        }
    }
}

impl GridSearchConfig {
    /// Generator for the configured grid settings.
    pub fn generator(&self) -> GridGenerator {
        GridGenerator::new(self.grid_size, self.grid_limit)
            .set_grid_offset(self.grid_offset.clone())
            .set_strategy(self.grid_strategy)
    }

    pub fn validate(&self) -> Result<(), FairnessError> {
        if self.grid.is_none() {
            self.generator().validate()?;
        }
        if let Some(grid) = &self.grid {
            if grid.is_empty() {
                return Err(FairnessError::InvalidParameter(
                    "grid".to_string(),
                    "at least one multiplier vector".to_string(),
                    "an empty grid".to_string(),
                ));
            }
        }
        if self.num_threads == Some(0) {
            return Err(FairnessError::InvalidParameter(
                "num_threads".to_string(),
                "positive integer".to_string(),
                "0".to_string(),
            ));
        }
        self.selection_rule.validate()
    }
}

/// IO
pub trait ConfigIO: Serialize + DeserializeOwned + Sized {
    /// Save as a json object to a file.
    ///
    /// * `path` - Path to save to.
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), FairnessError> {
        fs::write(path, self.json_dump()?).map_err(|e| FairnessError::UnableToWrite(e.to_string()))
    }

    /// Dump as a json object.
    fn json_dump(&self) -> Result<String, FairnessError> {
        serde_json::to_string(self).map_err(|e| FairnessError::UnableToWrite(e.to_string()))
    }

    /// Load from a json string.
    fn from_json(json_str: &str) -> Result<Self, FairnessError> {
        serde_json::from_str::<Self>(json_str).map_err(|e| FairnessError::UnableToRead(e.to_string()))
    }

    /// Load from a path to a json object.
    ///
    /// * `path` - Path to load from.
    fn load<P: AsRef<Path>>(path: P) -> Result<Self, FairnessError> {
        let json_str = fs::read_to_string(path).map_err(|e| FairnessError::UnableToRead(e.to_string()))?;
        Self::from_json(&json_str)
    }
}

impl ConfigIO for GridSearchConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_default() {
        let config = GridSearchConfig::default();
        assert_eq!(config.grid_size, 10);
        assert_eq!(config.grid_limit, 2.0);
        assert_eq!(config.selection_rule, SelectionRule::BoundedObjective);
        assert_eq!(config.grid_strategy, GridStrategyKind::L1Ball);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_io_json() {
        let config = GridSearchConfig {
            grid_size: 7,
            grid_offset: Some(vec![0.1, -0.1]),
            grid_strategy: GridStrategyKind::Cartesian { seed: 11 },
            selection_rule: SelectionRule::TradeoffOptimization { constraint_weight: 0.3 },
            ..Default::default()
        };
        let json = config.json_dump().unwrap();
        let config2 = GridSearchConfig::from_json(&json).unwrap();
        assert_eq!(config, config2);
    }

    #[test]
    fn test_config_io_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("grid_search.json");
        let config = GridSearchConfig {
            parallel: true,
            num_threads: Some(2),
            ..Default::default()
        };
        config.save(&file_path).unwrap();
        let config2 = GridSearchConfig::load(&file_path).unwrap();
        assert_eq!(config, config2);
        assert!(GridSearchConfig::load(dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = GridSearchConfig::from_json(r#"{"grid_size": 3}"#).unwrap();
        assert_eq!(config.grid_size, 3);
        assert_eq!(config.grid_limit, 2.0);
        assert!(!config.parallel);
    }

    #[test]
    fn test_parse_strings() {
        assert_eq!(
            SelectionRule::from_str("TradeoffOptimization").unwrap(),
            SelectionRule::TradeoffOptimization { constraint_weight: 0.5 }
        );
        let err = SelectionRule::from_str("Best").unwrap_err();
        assert!(matches!(err, FairnessError::ParseString(..)));
        assert_eq!(GridStrategyKind::from_str("Cartesian").unwrap(), GridStrategyKind::Cartesian { seed: 0 });
        assert!(GridStrategyKind::from_str("Sobol").is_err());
    }

    #[test]
    fn test_invalid_config() {
        let config = GridSearchConfig {
            selection_rule: SelectionRule::TradeoffOptimization { constraint_weight: 1.5 },
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = GridSearchConfig {
            grid: Some(Vec::new()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = GridSearchConfig {
            grid_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
