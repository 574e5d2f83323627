//! Configuration system for HybridForge.
//!
//! Load elimination and smoothing settings from TOML or YAML so that the
//! marginalization mode, parallelism and pruning budget can change without
//! code changes.
//!
//! # Examples
//!
//! ```
//! use hybridforge_config::HybridConfig;
//! use hybridforge_core::EliminationMode;
//!
//! let config = HybridConfig::from_toml_str(r#"
//!     [elimination]
//!     mode = "sum_product"
//!     parallel_threshold = 16
//!
//!     [smoother]
//!     max_leaves = 3
//! "#).unwrap();
//!
//! assert_eq!(config.elimination.mode, EliminationMode::SumProduct);
//! assert_eq!(config.smoother.max_leaves, Some(3));
//! ```
//!
//! Use default config when file is missing:
//!
//! ```
//! use hybridforge_config::HybridConfig;
//!
//! let config = HybridConfig::load("hybrid.toml").unwrap_or_default();
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use hybridforge_core::EliminationMode;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HybridConfig {
    /// Elimination settings.
    #[serde(default)]
    pub elimination: EliminationConfig,

    /// Incremental smoother settings.
    #[serde(default)]
    pub smoother: SmootherConfig,
}

impl HybridConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if file doesn't exist, contains invalid TOML or fails
    /// [`validate`](Self::validate).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_file(path)
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parses configuration from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the discrete marginalization mode.
    pub fn with_mode(mut self, mode: EliminationMode) -> Self {
        self.elimination.mode = mode;
        self
    }

    /// Enables or disables parallel per-branch elimination.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.elimination.parallel = parallel;
        self
    }

    /// Sets the default number of leaves kept after each smoother update.
    pub fn with_max_leaves(mut self, max_leaves: usize) -> Self {
        self.smoother.max_leaves = Some(max_leaves);
        self
    }

    /// Sets the probability floor applied after each smoother update.
    pub fn with_prune_floor(mut self, floor: f64) -> Self {
        self.smoother.prune_floor = Some(floor);
        self
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.elimination.validate()?;
        self.smoother.validate()
    }
}

/// Elimination settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct EliminationConfig {
    /// How discrete variables are folded out.
    #[serde(default)]
    pub mode: EliminationMode,

    /// Run per-branch Gaussian eliminations on the rayon pool.
    #[serde(default = "default_parallel")]
    pub parallel: bool,

    /// Minimum number of branches before going parallel.
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,

    /// Diagonal entries of `R` at or below this magnitude are rank failures.
    #[serde(default = "default_rank_tolerance")]
    pub rank_tolerance: f64,
}

fn default_parallel() -> bool {
    true
}

fn default_parallel_threshold() -> usize {
    8
}

fn default_rank_tolerance() -> f64 {
    1e-9
}

impl Default for EliminationConfig {
    fn default() -> Self {
        EliminationConfig {
            mode: EliminationMode::default(),
            parallel: default_parallel(),
            parallel_threshold: default_parallel_threshold(),
            rank_tolerance: default_rank_tolerance(),
        }
    }
}

impl EliminationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.rank_tolerance > 0.0 && self.rank_tolerance.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "rank_tolerance must be positive, got {}",
                self.rank_tolerance
            )));
        }
        Ok(())
    }
}

/// Incremental smoother settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SmootherConfig {
    /// Leaves kept in the discrete joint after each update, unless the
    /// caller passes its own budget.
    #[serde(default)]
    pub max_leaves: Option<usize>,

    /// Assignments below this normalized probability are dropped after each
    /// update.
    #[serde(default)]
    pub prune_floor: Option<f64>,
}

impl SmootherConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_leaves == Some(0) {
            return Err(ConfigError::Invalid(
                "max_leaves must be at least 1".to_string(),
            ));
        }
        if let Some(floor) = self.prune_floor {
            if !(floor > 0.0 && floor < 1.0) {
                return Err(ConfigError::Invalid(format!(
                    "prune_floor must lie in (0, 1), got {}",
                    floor
                )));
            }
        }
        Ok(())
    }
}
