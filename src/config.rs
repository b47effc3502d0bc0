//! Session configuration

use crate::error::{LayerKvError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// How replies are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Bare protocol lines (`NULL`, `NO TRANSACTION`, values, counts)
    #[default]
    Text,
    /// One JSON object per executed command
    Json,
}

impl FromStr for OutputFormat {
    type Err = LayerKvError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(LayerKvError::Config(format!(
                "unknown output format '{}', expected 'text' or 'json'",
                other
            ))),
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub output_format: OutputFormat,
    /// tracing filter directive, e.g. `info` or `layerkv=debug`
    pub log_level: String,
    pub prompt: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Text,
            log_level: "info".to_string(),
            prompt: "> ".to_string(),
        }
    }
}

impl SessionConfig {
    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            LayerKvError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| LayerKvError::Config(format!("invalid config {}: {}", path.display(), e)))
    }
}
