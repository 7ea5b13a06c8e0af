//! # mfv-cli: Schema Directory Tooling
//!
//! Subcommand handlers for the `mfv` binary. Each handler takes parsed
//! arguments and returns data; printing and exit codes live in `main`.

pub mod check;
pub mod list;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use mfv_schema::{Validator, ValidatorConfig};
use serde_json::Value;

/// Options shared by every subcommand that loads a schema directory.
#[derive(Args, Debug, Clone, Default)]
pub struct SchemaArgs {
    /// Directory of schema files (overrides config and MFV_SCHEMA_DIR).
    #[arg(long, short = 's')]
    pub schemas: Option<PathBuf>,

    /// Validator config file, JSON or YAML.
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Remove undeclared properties before validating.
    #[arg(long)]
    pub strip_additional: bool,

    /// Do not insert schema default values.
    #[arg(long)]
    pub no_defaults: bool,
}

impl SchemaArgs {
    /// Config file, then environment, then flags. Relative schema
    /// directories resolve against the working directory.
    pub fn resolve_config(&self) -> anyhow::Result<ValidatorConfig> {
        let mut config = match &self.config {
            Some(path) => ValidatorConfig::from_path(path)?,
            None => ValidatorConfig::default(),
        }
        .with_env_overrides();

        if let Some(dir) = &self.schemas {
            config.schema_dir = Some(dir.clone());
        }
        if self.strip_additional {
            config.options.strip_additional_properties = true;
        }
        if self.no_defaults {
            config.options.apply_defaults = false;
        }
        if config.base_dir.is_none() {
            config.base_dir = Some(std::env::current_dir().context("resolving working directory")?);
        }
        Ok(config)
    }

    /// Build a validator and load its schema directory.
    pub async fn load(&self) -> anyhow::Result<Validator> {
        let config = self.resolve_config()?;
        let validator = Validator::from_config(&config);
        let registrations = validator
            .init(None)
            .await
            .context("loading schema directory")?;
        tracing::debug!(count = registrations.len(), "validator ready");
        Ok(validator)
    }
}

/// Read a JSON or YAML document, chosen by extension.
pub fn read_document(path: &Path) -> anyhow::Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;

    let value = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => serde_yaml::from_str(&content)
            .with_context(|| format!("invalid YAML in {}", path.display()))?,
        _ => serde_json::from_str(&content)
            .with_context(|| format!("invalid JSON in {}", path.display()))?,
    };
    Ok(value)
}
