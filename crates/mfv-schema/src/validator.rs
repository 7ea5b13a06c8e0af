//! # Validator Facade
//!
//! Public entry points over the engine:
//!
//! | Entry point       | Returns                        | 417 (extra fields only) |
//! |-------------------|--------------------------------|-------------------------|
//! | `validate`        | `Result<Value, ClassifiedError>` | error                 |
//! | `filter`          | `Result<Value, ClassifiedError>` | `Ok(doc)`             |
//! | `validate_sync`   | [`ValidationOutcome`]          | `Invalid`               |
//! | `if_error`        | `Result<Value, ClassifiedError>` | error                 |
//!
//! ## Lifecycle
//!
//! A validator starts empty. Each `init` call adds or overwrites
//! registrations and never removes any. Calls against a name that is not
//! registered yet classify as not-found immediately; they never wait for a
//! pending `init`.
//!
//! Concurrent `init` calls on one validator may interleave their file reads.
//! Colliding names end up with whichever call registered last.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::ValidatorConfig;
use crate::engine::SchemaEngine;
use crate::error::ClassifiedError;
use crate::loader::{SchemaLoader, SchemaRegistration};
use crate::options::{SchemaFilter, ValidatorOptions};
use crate::translate::{self, ValidationOutcome};

/// Named schema validators loaded from directories.
#[derive(Debug)]
pub struct Validator {
    schema_dir: Option<PathBuf>,
    base_dir: Option<PathBuf>,
    filter: SchemaFilter,
    engine: SchemaEngine,
}

impl Default for Validator {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Validator {
    /// Validator with a default schema directory, JSON filter and default options.
    pub fn new(schema_dir: impl Into<PathBuf>) -> Self {
        Self::builder().schema_dir(schema_dir).build()
    }

    pub fn builder() -> ValidatorBuilder {
        ValidatorBuilder::default()
    }

    pub fn from_config(config: &ValidatorConfig) -> Self {
        let mut builder = Self::builder()
            .filter(config.filter())
            .options(config.options.clone());
        if let Some(dir) = &config.schema_dir {
            builder = builder.schema_dir(dir);
        }
        if let Some(dir) = &config.base_dir {
            builder = builder.base_dir(dir);
        }
        builder.build()
    }

    /// The underlying engine, for registering schemas by hand.
    pub fn engine(&self) -> &SchemaEngine {
        &self.engine
    }

    pub fn options(&self) -> &ValidatorOptions {
        self.engine.options()
    }

    pub fn schema_dir(&self) -> Option<&Path> {
        self.schema_dir.as_deref()
    }

    /// Load schemas from `dir`, or from the configured schema directory.
    ///
    /// May be called repeatedly to merge several directories; names that
    /// collide with earlier registrations overwrite them.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when no directory is available or a relative one
    /// cannot be resolved, plus every error of [`SchemaLoader::load`].
    pub async fn init(&self, dir: Option<&Path>) -> Result<Vec<SchemaRegistration>, ClassifiedError> {
        let dir = self.resolve_dir(dir)?;
        SchemaLoader::new(&self.engine, &self.filter).load(&dir).await
    }

    /// Blocking twin of [`init`](Self::init).
    pub fn init_sync(&self, dir: Option<&Path>) -> Result<Vec<SchemaRegistration>, ClassifiedError> {
        let dir = self.resolve_dir(dir)?;
        SchemaLoader::new(&self.engine, &self.filter).load_sync(&dir)
    }

    /// Validate `data` against the schema registered as `schema`.
    ///
    /// Rejects on every failure. The rejected document is available through
    /// [`ClassifiedError::original`].
    pub async fn validate(&self, schema: &str, data: Value) -> Result<Value, ClassifiedError> {
        self.validate_sync(schema, data).into_result()
    }

    /// Like [`validate`](Self::validate), but a document whose only problem
    /// is undeclared properties (status 417) is returned instead of rejected.
    pub async fn filter(&self, schema: &str, data: Value) -> Result<Value, ClassifiedError> {
        match self.validate_sync(schema, data) {
            ValidationOutcome::Invalid { error, doc } if error.is_additional_properties_only() => {
                Ok(doc)
            }
            outcome => outcome.into_result(),
        }
    }

    /// Validate without failing; the outcome carries either arm.
    pub fn validate_sync(&self, schema: &str, data: Value) -> ValidationOutcome {
        translate::evaluate(&self.engine, schema, data)
    }

    /// Synchronous validation that fails on every non-success outcome.
    pub fn if_error(&self, schema: &str, data: Value) -> Result<Value, ClassifiedError> {
        let outcome = self.validate_sync(schema, data);
        if let Some(error) = outcome.error() {
            if tracing::enabled!(tracing::Level::DEBUG) {
                tracing::debug!(
                    schema,
                    error = %error.to_json(),
                    doc = %outcome.doc(),
                    "validation failed"
                );
            }
        }
        outcome.into_result()
    }

    fn resolve_dir(&self, dir: Option<&Path>) -> Result<PathBuf, ClassifiedError> {
        let dir = dir.or(self.schema_dir.as_deref()).ok_or_else(|| {
            ClassifiedError::invalid_argument("\"dir\" or the validator's schema_dir must be defined")
        })?;

        if dir.is_absolute() {
            return Ok(dir.to_path_buf());
        }
        match &self.base_dir {
            Some(base) => Ok(base.join(dir)),
            None => Err(ClassifiedError::invalid_argument(format!(
                "\"{}\" is relative and no base_dir is configured",
                dir.display()
            ))),
        }
    }
}

/// Builder for [`Validator`].
#[derive(Debug, Default)]
pub struct ValidatorBuilder {
    schema_dir: Option<PathBuf>,
    base_dir: Option<PathBuf>,
    filter: Option<SchemaFilter>,
    options: ValidatorOptions,
}

impl ValidatorBuilder {
    /// Directory `init` scans when called without one.
    pub fn schema_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.schema_dir = Some(dir.into());
        self
    }

    /// Directory relative `init` paths resolve against, typically the
    /// caller's own source or manifest directory.
    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn filter(mut self, filter: SchemaFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn options(mut self, options: ValidatorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Validator {
        Validator {
            schema_dir: self.schema_dir,
            base_dir: self.base_dir,
            filter: self.filter.unwrap_or_default(),
            engine: SchemaEngine::new(self.options),
        }
    }
}
