//! Engine configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) reproduces the
//! dashboard's behaviour:
//!
//! ```toml
//! [forecast]
//! horizon = 14
//! window = 7
//! trend_weight = 0.6
//! average_weight = 0.3
//! momentum_weight = 0.1
//!
//! [labels]
//! locale = "ru"
//!
//! # Optional: replaces the built-in catalog entirely.
//! [[metrics]]
//! id = "orders"
//! ...
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{builtin_catalog, MetricSpec};
use crate::forecast::ForecastConfig;
use crate::labels::LabelLocale;

/// Longest forecast zone a config may ask for, one leap year of days.
pub const MAX_FORECAST_HORIZON: usize = 366;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub locale: LabelLocale,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub forecast: ForecastConfig,
    pub labels: LabelConfig,
    /// Empty means the built-in catalog.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<MetricSpec>,
}

impl EngineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let forecast = &self.forecast;
        if forecast.horizon == 0 {
            return Err(ConfigError::Invalid("forecast.horizon must be at least 1".into()));
        }
        if forecast.horizon > MAX_FORECAST_HORIZON {
            return Err(ConfigError::Invalid(format!(
                "forecast.horizon must be at most {MAX_FORECAST_HORIZON}, got {}",
                forecast.horizon
            )));
        }
        if forecast.window == 0 {
            return Err(ConfigError::Invalid("forecast.window must be at least 1".into()));
        }
        for (name, weight) in [
            ("trend_weight", forecast.trend_weight),
            ("average_weight", forecast.average_weight),
            ("momentum_weight", forecast.momentum_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "forecast.{name} must be a finite non-negative number, got {weight}"
                )));
            }
        }

        let mut seen = HashSet::new();
        for metric in &self.metrics {
            if metric.id.is_empty() {
                return Err(ConfigError::Invalid("metric id must not be empty".into()));
            }
            if !seen.insert(metric.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate metric id '{}'", metric.id)));
            }
            if metric.sources.is_empty() {
                return Err(ConfigError::Invalid(format!("metric '{}' has no sources", metric.id)));
            }
        }
        Ok(())
    }

    /// The configured metrics, or the built-in list when none are configured.
    pub fn catalog(&self) -> Vec<MetricSpec> {
        if self.metrics.is_empty() {
            builtin_catalog()
        } else {
            self.metrics.clone()
        }
    }
}
