//! Run configuration, read from a flat TOML file.
//!
//! Keys are upper-case (`CHARS_PER_TOKEN = 4`), so a classic `KEY=VALUE`
//! `.conf` file written for shell tooling parses unchanged.

use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};

use crate::category::{self, Category, CategorySpec};
use crate::classify::Thresholds;
use crate::provider::{ProviderProfile, ProviderTable};

/// Default config file name, looked up in the scan root.
pub const CONFIG_FILE: &str = "context-health.toml";

/// Errors that abort a run before anything is classified.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("invalid pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    pub chars_per_token: NonZeroU64,
    pub info_threshold_percent: u64,
    pub warn_threshold_percent: u64,
    #[serde(default = "default_iqr_multiplier")]
    pub outlier_iqr_multiplier: f64,
    /// Character budget per category id.
    #[serde(default)]
    pub category_budgets: BTreeMap<String, u64>,
    #[serde(default = "default_fallback_provider")]
    pub fallback_provider: String,
    /// Replaces the built-in provider table when non-empty.
    #[serde(default)]
    pub providers: Vec<ProviderProfile>,
    /// Replaces the built-in category list when non-empty.
    #[serde(default)]
    pub categories: Vec<CategorySpec>,
}

fn default_iqr_multiplier() -> f64 {
    1.5
}

fn default_fallback_provider() -> String {
    "default".to_string()
}

impl Config {
    /// Load and validate the config at `path`. A missing file is an error.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Config::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Config, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.info_threshold_percent > self.warn_threshold_percent {
            return Err(ConfigError::Invalid(format!(
                "INFO_THRESHOLD_PERCENT ({}) must not exceed WARN_THRESHOLD_PERCENT ({})",
                self.info_threshold_percent, self.warn_threshold_percent
            )));
        }
        if self.warn_threshold_percent > 100 {
            return Err(ConfigError::Invalid(format!(
                "WARN_THRESHOLD_PERCENT ({}) must be at most 100",
                self.warn_threshold_percent
            )));
        }
        validate_multiplier(self.outlier_iqr_multiplier)?;
        // Budgets must point at a known category, or a typo silently disables them.
        let specs = self.category_specs();
        for id in self.category_budgets.keys() {
            if !specs.iter().any(|spec| &spec.id == id) {
                return Err(ConfigError::Invalid(format!(
                    "CATEGORY_BUDGETS references unknown category `{id}`"
                )));
            }
        }
        Ok(())
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            info_pct: self.info_threshold_percent,
            warn_pct: self.warn_threshold_percent,
        }
    }

    pub fn provider_table(&self) -> Result<ProviderTable, ConfigError> {
        if self.providers.is_empty() {
            ProviderTable::builtin()
        } else {
            ProviderTable::new(self.providers.clone(), &self.fallback_provider)
        }
    }

    fn category_specs(&self) -> Vec<CategorySpec> {
        if self.categories.is_empty() {
            CategorySpec::builtin()
        } else {
            self.categories.clone()
        }
    }

    pub fn categories(&self) -> Result<Vec<Category>, ConfigError> {
        let specs = self.category_specs();
        let mut seen = HashSet::new();
        for spec in &specs {
            if !seen.insert(spec.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate category id `{}`",
                    spec.id
                )));
            }
        }
        specs.into_iter().map(category::Category::new).collect()
    }

    pub fn budget_for(&self, category_id: &str) -> Option<u64> {
        self.category_budgets.get(category_id).copied()
    }
}

/// An IQR multiplier must be a finite, positive number.
pub fn validate_multiplier(multiplier: f64) -> Result<f64, ConfigError> {
    if multiplier.is_finite() && multiplier > 0.0 {
        Ok(multiplier)
    } else {
        Err(ConfigError::Invalid(format!(
            "OUTLIER_IQR_MULTIPLIER must be a positive number, got {multiplier}"
        )))
    }
}

/// Resolve the config path: an explicit path wins, else `<root>/context-health.toml`.
pub fn config_path(root: &Path, explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(p) => p.to_path_buf(),
        None => root.join(CONFIG_FILE),
    }
}
