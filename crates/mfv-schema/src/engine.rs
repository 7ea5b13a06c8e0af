//! # Validation Engine
//!
//! Thin ownership layer over the `jsonschema` crate. Holds the registry of
//! schema documents keyed by registration name, compiles validators lazily,
//! caches them, and runs them against owned documents.
//!
//! ## Registry
//!
//! Names are unique per engine. Registering a name again replaces the
//! previous document; nothing is merged. Any registration invalidates every
//! cached validator, because compiled validators capture the registry
//! snapshot their cross-schema `$ref`s were resolved from.
//!
//! ## Reference Resolution
//!
//! A schema without an absolute `$id` lives under `json-schema:///`, so a
//! `$ref` of `"address"` is requested as `json-schema:///address`. The
//! [`RegistryRetriever`] answers those requests from the registry snapshot
//! by registration name, declared id, or either form under the default base.
//! No request ever reaches the network.
//!
//! ## Engine Failures
//!
//! Compilation errors and panics raised while a validator runs are reported
//! as [`EngineError`], distinct from validation failures.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use jsonschema::error::ValidationErrorKind;
use jsonschema::{Retrieve, Uri, ValidationError};
use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;

use crate::format;
use crate::mutate::{self, Mutations};
use crate::options::ValidatorOptions;

/// Base URI the engine resolves relative schema ids and refs against.
pub(crate) const DEFAULT_BASE_URI: &str = "json-schema:///";

/// Keyword reported for undeclared-property violations.
pub const ADDITIONAL_PROPERTIES: &str = "additionalProperties";

/// Message attached to each undeclared-property violation.
pub const ADDITIONAL_PROPERTIES_MESSAGE: &str = "must NOT have additional properties";

#[derive(Error, Debug)]
pub enum EngineError {
    /// The schema could not be compiled into a validator.
    #[error("failed to compile schema {name}: {reason}")]
    Compile { name: String, reason: String },

    /// The validator panicked while running.
    #[error("validator {name} panicked: {reason}")]
    Panicked { name: String, reason: String },
}

/// One violation as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawError {
    /// Schema keyword that failed, e.g. `type`, `required`, `additionalProperties`.
    pub keyword: String,
    /// JSON Pointer of the failing value; empty for the document root.
    pub instance_path: String,
    /// JSON Pointer of the failing keyword within the schema.
    pub schema_path: String,
    pub message: String,
    /// The offending key, for `additionalProperties` violations only.
    pub additional_property: Option<String>,
}

impl RawError {
    pub fn is_additional_property(&self) -> bool {
        self.keyword == ADDITIONAL_PROPERTIES
    }

    fn undeclared(instance_path: &str, schema_path: &str, property: &str) -> Self {
        Self {
            keyword: ADDITIONAL_PROPERTIES.to_string(),
            instance_path: instance_path.to_string(),
            schema_path: schema_path.to_string(),
            message: ADDITIONAL_PROPERTIES_MESSAGE.to_string(),
            additional_property: Some(property.to_string()),
        }
    }

    /// One engine error may name several unexpected keys; each becomes its own entry.
    ///
    /// A closed object schema without `properties` is reported by the engine
    /// as a single false-schema error for its first key. Every key of the
    /// object at `instance_path` in `doc` is undeclared there, so each one
    /// is reported.
    fn from_engine(error: &ValidationError<'_>, doc: &Value) -> Vec<Self> {
        let instance_path = error.instance_path.to_string();
        let schema_path = error.schema_path.to_string();
        let keyword = schema_path.rsplit('/').next().unwrap_or_default().to_string();

        if let ValidationErrorKind::AdditionalProperties { unexpected } = &error.kind {
            return unexpected
                .iter()
                .map(|property| Self::undeclared(&instance_path, &schema_path, property))
                .collect();
        }

        if matches!(error.kind, ValidationErrorKind::FalseSchema { .. })
            && keyword == ADDITIONAL_PROPERTIES
        {
            let closed = doc
                .pointer(&instance_path)
                .and_then(Value::as_object)
                .filter(|object| !object.is_empty());
            if let Some(object) = closed {
                return object
                    .keys()
                    .map(|property| Self::undeclared(&instance_path, &schema_path, property))
                    .collect();
            }
        }

        vec![Self {
            keyword,
            instance_path,
            schema_path,
            message: error.to_string(),
            additional_property: None,
        }]
    }
}

/// A compiled validator together with what its mutation pass needs.
#[derive(Clone)]
pub struct CompiledSchema {
    name: String,
    document: Arc<Value>,
    refs: Arc<HashMap<String, Value>>,
    validator: Arc<jsonschema::Validator>,
}

impl CompiledSchema {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn document(&self) -> &Value {
        &self.document
    }
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Resolves `$ref` URIs from a registry snapshot.
struct RegistryRetriever {
    schemas: Arc<HashMap<String, Value>>,
}

impl Retrieve for RegistryRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let uri_str = uri.as_str();

        if let Some(value) = self.schemas.get(uri_str) {
            return Ok(value.clone());
        }

        uri_str
            .strip_prefix(DEFAULT_BASE_URI)
            .and_then(|bare| self.schemas.get(bare))
            .cloned()
            .ok_or_else(|| format!("no schema registered for URI: {uri_str}").into())
    }
}

#[derive(Default)]
struct Registry {
    documents: HashMap<String, Arc<Value>>,
    compiled: HashMap<String, CompiledSchema>,
    refs: Option<Arc<HashMap<String, Value>>>,
    generation: u64,
}

impl Registry {
    fn insert(&mut self, name: String, document: Value) -> bool {
        self.compiled.clear();
        self.refs = None;
        self.generation += 1;
        self.documents.insert(name, Arc::new(document)).is_some()
    }

    fn refs(&mut self) -> Arc<HashMap<String, Value>> {
        if let Some(refs) = &self.refs {
            return Arc::clone(refs);
        }

        let mut refs = HashMap::new();
        for (name, document) in &self.documents {
            let document = document.as_ref();
            refs.insert(format!("{DEFAULT_BASE_URI}{name}"), document.clone());
            if let Some(id) = declared_id(document) {
                if !id.contains(':') {
                    refs.insert(format!("{DEFAULT_BASE_URI}{id}"), document.clone());
                }
                refs.insert(id.to_string(), document.clone());
            }
            refs.insert(name.clone(), document.clone());
        }

        let refs = Arc::new(refs);
        self.refs = Some(Arc::clone(&refs));
        refs
    }
}

/// The declared identifier of a schema document: `$id`, else legacy `id`.
pub fn declared_id(document: &Value) -> Option<&str> {
    ["$id", "id"]
        .iter()
        .find_map(|key| document.get(key).and_then(Value::as_str))
        .filter(|id| !id.trim().is_empty())
}

/// Schema registry and validator runner shared by every facade call.
///
/// `Send + Sync`; the registry sits behind a read-write lock.
pub struct SchemaEngine {
    options: ValidatorOptions,
    registry: RwLock<Registry>,
}

impl fmt::Debug for SchemaEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaEngine")
            .field("options", &self.options)
            .field("schema_count", &self.registry.read().documents.len())
            .finish()
    }
}

impl SchemaEngine {
    pub fn new(options: ValidatorOptions) -> Self {
        Self {
            options,
            registry: RwLock::new(Registry::default()),
        }
    }

    pub fn options(&self) -> &ValidatorOptions {
        &self.options
    }

    /// Register `document` under `name`, replacing any previous registration.
    ///
    /// Returns `true` when a previous registration was replaced.
    pub fn add_schema(&self, document: Value, name: impl Into<String>) -> bool {
        let name = name.into();
        let replaced = self.registry.write().insert(name.clone(), document);
        if replaced {
            tracing::warn!(schema = %name, "schema registration overwritten");
        }
        replaced
    }

    /// Register a batch under a single lock acquisition.
    ///
    /// Returns how many registrations replaced an existing name.
    pub fn add_schemas(&self, schemas: impl IntoIterator<Item = (String, Value)>) -> usize {
        let mut registry = self.registry.write();
        let mut replaced = 0;
        for (name, document) in schemas {
            if registry.insert(name.clone(), document) {
                tracing::warn!(schema = %name, "schema registration overwritten");
                replaced += 1;
            }
        }
        replaced
    }

    /// The registered document for `name`.
    pub fn get_schema(&self, name: &str) -> Option<Value> {
        self.registry
            .read()
            .documents
            .get(name)
            .map(|document| document.as_ref().clone())
    }

    pub fn has_schema(&self, name: &str) -> bool {
        self.registry.read().documents.contains_key(name)
    }

    /// All registration names, sorted.
    pub fn schema_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registry.read().documents.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn schema_count(&self) -> usize {
        self.registry.read().documents.len()
    }

    /// The compiled validator for `name`, compiling and caching it on first use.
    ///
    /// `Ok(None)` when nothing is registered under `name`.
    pub fn compiled(&self, name: &str) -> Result<Option<CompiledSchema>, EngineError> {
        if let Some(compiled) = self.registry.read().compiled.get(name) {
            return Ok(Some(compiled.clone()));
        }

        let (document, refs, generation) = {
            let mut registry = self.registry.write();
            let Some(document) = registry.documents.get(name).cloned() else {
                return Ok(None);
            };
            (document, registry.refs(), registry.generation)
        };

        let validator = self.build(name, &document, &refs)?;
        let compiled = CompiledSchema {
            name: name.to_string(),
            document,
            refs,
            validator: Arc::new(validator),
        };

        let mut registry = self.registry.write();
        if registry.generation == generation {
            registry.compiled.insert(name.to_string(), compiled.clone());
        }
        Ok(Some(compiled))
    }

    fn build(
        &self,
        name: &str,
        document: &Value,
        refs: &Arc<HashMap<String, Value>>,
    ) -> Result<jsonschema::Validator, EngineError> {
        let retriever = RegistryRetriever {
            schemas: Arc::clone(refs),
        };

        let mut options = jsonschema::options();
        options
            .should_validate_formats(self.options.validate_formats)
            .with_format(format::HTTP_URL, format::is_http_url)
            .with_retriever(retriever);
        #[cfg(test)]
        options.with_format(format::PANICKING, format::panicking);

        options
            .build(document)
            .map_err(|e| EngineError::Compile {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }

    /// Apply configured mutations to `doc`, then validate it.
    ///
    /// Returns the violations in engine order; empty means valid.
    pub fn run(
        &self,
        compiled: &CompiledSchema,
        doc: &mut Value,
    ) -> Result<Vec<RawError>, EngineError> {
        let mutations = Mutations {
            apply_defaults: self.options.apply_defaults,
            strip_additional: self.options.strip_additional_properties,
        };
        let limit = if self.options.collect_all_errors {
            usize::MAX
        } else {
            1
        };
        let allow_additional = self.options.allow_additional_properties;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            mutate::apply(mutations, &compiled.document, &compiled.refs, doc);
            let doc: &Value = doc;
            compiled
                .validator
                .iter_errors(doc)
                .flat_map(|error| RawError::from_engine(&error, doc))
                .filter(|raw| !(allow_additional && raw.is_additional_property()))
                .take(limit)
                .collect::<Vec<_>>()
        }));

        outcome.map_err(|payload| {
            let reason = panic_reason(payload.as_ref());
            tracing::error!(schema = %compiled.name, %reason, "validator panicked");
            EngineError::Panicked {
                name: compiled.name.clone(),
                reason,
            }
        })
    }

    /// Human-readable summary: `data{path} {message}` joined by `, `.
    pub fn errors_text(errors: &[RawError]) -> String {
        if errors.is_empty() {
            return "No errors".to_string();
        }
        errors
            .iter()
            .map(|e| format!("data{} {}", e.instance_path, e.message))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn panic_reason(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
