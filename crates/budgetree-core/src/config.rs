//! Analysis configuration
//!
//! Thresholds for the optimizer, the search depth limit, and optional
//! per-category allocation rules.
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a three-layer resolution:
//! 1. An explicit path (e.g., `--config`), which must exist
//! 2. An override in the data dir (~/.local/share/budgetree/config/analysis.toml)
//! 3. Embedded defaults (compiled into binary)

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::AllocationRules;
use crate::optimizer::OptimizerConfig;
use crate::search::DEFAULT_MAX_DEPTH;

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/analysis.toml");

/// Settings for criteria search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Deepest nested clause expanded (top level = 0)
    pub max_depth: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Full analysis configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub optimizer: OptimizerConfig,
    pub search: SearchConfig,
    #[serde(default, skip_serializing_if = "AllocationRules::is_empty")]
    pub allocation: AllocationRules,
}

/// Where a loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Embedded,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Embedded => write!(f, "built-in defaults"),
        }
    }
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    optimizer: Option<RawOptimizer>,
    search: Option<RawSearch>,
    allocation: Option<AllocationRules>,
}

#[derive(Debug, Deserialize)]
struct RawOptimizer {
    over_budget_threshold: Option<f64>,
    under_utilized_threshold: Option<f64>,
    max_depth: Option<usize>,
    optimization_factor: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawSearch {
    max_depth: Option<usize>,
}

impl AnalysisConfig {
    /// Load configuration, returning only the config
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        Self::resolve(override_path).map(|(config, _)| config)
    }

    /// Load configuration and report which layer supplied it
    pub fn resolve(override_path: Option<&Path>) -> Result<(Self, ConfigSource)> {
        if let Some(path) = override_path {
            if !path.exists() {
                return Err(Error::NotFound(format!(
                    "Config file {}",
                    path.display()
                )));
            }
            let content = fs::read_to_string(path)?;
            return Ok((
                Self::from_toml_str(&content)?,
                ConfigSource::File(path.to_path_buf()),
            ));
        }

        if let Some(default_path) = default_config_path() {
            if default_path.exists() {
                tracing::debug!(path = %default_path.display(), "Using config override");
                let content = fs::read_to_string(&default_path)?;
                return Ok((
                    Self::from_toml_str(&content)?,
                    ConfigSource::File(default_path),
                ));
            }
        }

        Ok((Self::from_toml_str(DEFAULT_CONFIG)?, ConfigSource::Embedded))
    }

    /// Parse config from TOML content; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)?;

        let mut config = AnalysisConfig::default();

        if let Some(optimizer) = raw.optimizer {
            if let Some(value) = optimizer.over_budget_threshold {
                config.optimizer.over_budget_threshold = value;
            }
            if let Some(value) = optimizer.under_utilized_threshold {
                config.optimizer.under_utilized_threshold = value;
            }
            if let Some(value) = optimizer.max_depth {
                config.optimizer.max_depth = value;
            }
            if let Some(value) = optimizer.optimization_factor {
                config.optimizer.optimization_factor = value;
            }
        }

        if let Some(search) = raw.search {
            if let Some(value) = search.max_depth {
                config.search.max_depth = value;
            }
        }

        if let Some(allocation) = raw.allocation {
            config.allocation = allocation;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let optimizer = &self.optimizer;

        for (name, value) in [
            ("over_budget_threshold", optimizer.over_budget_threshold),
            ("under_utilized_threshold", optimizer.under_utilized_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidData(format!(
                    "optimizer.{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        if optimizer.under_utilized_threshold > optimizer.over_budget_threshold {
            return Err(Error::InvalidData(format!(
                "optimizer.under_utilized_threshold ({}) exceeds over_budget_threshold ({})",
                optimizer.under_utilized_threshold, optimizer.over_budget_threshold
            )));
        }

        if !(0.0..=1.0).contains(&optimizer.optimization_factor) {
            return Err(Error::InvalidData(format!(
                "optimizer.optimization_factor must be between 0 and 1, got {}",
                optimizer.optimization_factor
            )));
        }

        for (category, rule) in &self.allocation {
            if !(0.0..=1.0).contains(&rule.percentage) {
                return Err(Error::InvalidData(format!(
                    "allocation.{} percentage must be between 0 and 1, got {}",
                    category, rule.percentage
                )));
            }
        }

        let requested: f64 = self.allocation.values().map(|r| r.percentage).sum();
        if requested > 1.0 + 1e-9 {
            tracing::warn!(
                requested,
                "Allocation rules request more than the total budget; lower priorities will be cut"
            );
        }

        Ok(())
    }

    /// Allocation rules, or `None` when none are configured
    pub fn allocation_rules(&self) -> Option<&AllocationRules> {
        if self.allocation.is_empty() {
            None
        } else {
            Some(&self.allocation)
        }
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("budgetree").join("config").join("analysis.toml"))
}
