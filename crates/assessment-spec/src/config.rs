//! Engine configuration.
//!
//! Hosts pass a JSON object; every field is optional and falls back to the
//! defaults the editor has always used.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub defaults: QuestionDefaults,
    #[serde(default)]
    pub store: StoreConfig,
}

impl EngineConfig {
    /// Parses the JSON form; a blank string yields the defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_json::from_str(raw).map_err(ConfigError::Parse)?;
        config.check()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    fn check(&self) -> Result<(), ConfigError> {
        let defaults = &self.defaults;
        if defaults.numeric_min > defaults.numeric_max {
            return Err(ConfigError::Invalid(
                "defaults.numeric_min cannot exceed defaults.numeric_max".into(),
            ));
        }
        if defaults.choice_option_count == 0 {
            return Err(ConfigError::Invalid(
                "defaults.choice_option_count must be at least 1".into(),
            ));
        }
        if defaults.file_max_size_mb.is_nan() || defaults.file_max_size_mb <= 0.0 {
            return Err(ConfigError::Invalid(
                "defaults.file_max_size_mb must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Values populated into freshly added questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDefaults {
    #[serde(default = "default_short_text_max_length")]
    pub short_text_max_length: usize,
    #[serde(default = "default_long_text_max_length")]
    pub long_text_max_length: usize,
    #[serde(default)]
    pub numeric_min: f64,
    #[serde(default = "default_numeric_max")]
    pub numeric_max: f64,
    #[serde(default = "default_file_max_size_mb")]
    pub file_max_size_mb: f64,
    #[serde(default = "default_choice_option_count")]
    pub choice_option_count: usize,
}

impl Default for QuestionDefaults {
    fn default() -> Self {
        Self {
            short_text_max_length: default_short_text_max_length(),
            long_text_max_length: default_long_text_max_length(),
            numeric_min: 0.0,
            numeric_max: default_numeric_max(),
            file_max_size_mb: default_file_max_size_mb(),
            choice_option_count: default_choice_option_count(),
        }
    }
}

fn default_short_text_max_length() -> usize {
    100
}
fn default_long_text_max_length() -> usize {
    1000
}
fn default_numeric_max() -> f64 {
    100.0
}
fn default_file_max_size_mb() -> f64 {
    5.0
}
fn default_choice_option_count() -> usize {
    3
}

/// Behaviour of the in-process data store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Simulated latency applied to every store call.
    #[serde(default)]
    pub latency_ms: u64,
}
