//! # Validator Configuration
//!
//! File- and environment-backed configuration for building a [`Validator`].
//!
//! - `MFV_SCHEMA_DIR` (optional) overrides `schema_dir`
//! - `MFV_BASE_DIR` (optional) overrides `base_dir`
//!
//! [`Validator`]: crate::Validator

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::options::{SchemaFilter, ValidatorOptions};

/// Environment variable naming the default schema directory.
pub const ENV_SCHEMA_DIR: &str = "MFV_SCHEMA_DIR";

/// Environment variable naming the directory relative paths resolve against.
pub const ENV_BASE_DIR: &str = "MFV_BASE_DIR";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {reason}")]
    Parse { path: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Directory `init` scans when called without one.
    pub schema_dir: Option<PathBuf>,
    /// Directory relative `init` paths are resolved against.
    pub base_dir: Option<PathBuf>,
    /// Extensions (without the dot) of candidate schema files.
    pub extensions: Vec<String>,
    #[serde(flatten)]
    pub options: ValidatorOptions,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            schema_dir: None,
            base_dir: None,
            extensions: vec!["json".to_string()],
            options: ValidatorOptions::default(),
        }
    }
}

impl ValidatorConfig {
    /// Load from a `.yaml`/`.yml` or JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let parsed = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => serde_yaml::from_str(&content).map_err(|e| e.to_string()),
            _ => serde_json::from_str(&content).map_err(|e| e.to_string()),
        };

        parsed.map_err(|reason| ConfigError::Parse {
            path: path.display().to_string(),
            reason,
        })
    }

    /// Apply `MFV_SCHEMA_DIR` / `MFV_BASE_DIR` when set and non-empty.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(dir) = non_empty_env(ENV_SCHEMA_DIR) {
            self.schema_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = non_empty_env(ENV_BASE_DIR) {
            self.base_dir = Some(PathBuf::from(dir));
        }
        self
    }

    /// Defaults overlaid with the environment.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Filter matching the configured extensions.
    pub fn filter(&self) -> SchemaFilter {
        SchemaFilter::extensions(self.extensions.iter().cloned())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
