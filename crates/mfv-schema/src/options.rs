//! Validator options and the schema file filter.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Options passed to the validation engine when the validator is built.
///
/// Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorOptions {
    /// Drop `additionalProperties` violations instead of reporting them.
    pub allow_additional_properties: bool,
    /// Remove undeclared keys from objects whose schema forbids them.
    pub strip_additional_properties: bool,
    /// Insert `default` values for absent declared properties.
    pub apply_defaults: bool,
    /// Report every violation rather than stopping at the first.
    pub collect_all_errors: bool,
    /// Assert `format` keywords instead of treating them as annotations.
    pub validate_formats: bool,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            allow_additional_properties: false,
            strip_additional_properties: false,
            apply_defaults: true,
            collect_all_errors: true,
            validate_formats: true,
        }
    }
}

type Predicate = dyn Fn(&Path) -> bool + Send + Sync;

/// Predicate selecting candidate schema files.
///
/// Receives each file's path relative to the directory being scanned.
#[derive(Clone)]
pub struct SchemaFilter {
    predicate: Arc<Predicate>,
}

impl SchemaFilter {
    pub fn new(predicate: impl Fn(&Path) -> bool + Send + Sync + 'static) -> Self {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    /// Files ending in `.json`.
    pub fn json() -> Self {
        Self::extensions(["json"])
    }

    /// Files whose extension is one of `extensions` (without the dot).
    pub fn extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let extensions: Vec<String> = extensions.into_iter().map(Into::into).collect();
        Self::new(move |path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| extensions.iter().any(|e| e == ext))
        })
    }

    /// Every file is a candidate.
    pub fn all() -> Self {
        Self::new(|_| true)
    }

    pub fn matches(&self, path: &Path) -> bool {
        (self.predicate)(path)
    }
}

impl Default for SchemaFilter {
    fn default() -> Self {
        Self::json()
    }
}

impl fmt::Debug for SchemaFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaFilter").finish_non_exhaustive()
    }
}
