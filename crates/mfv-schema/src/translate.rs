//! # Error Translation
//!
//! Turns the engine's raw violation list into a [`ClassifiedError`].
//!
//! ## Status Selection
//!
//! Every raw violation becomes one sub-error with status 400. The top-level
//! status is 417 when *every* violation was an undeclared property and 400
//! otherwise. A 417 tells lenient callers the document is otherwise valid.
//!
//! ## Field Paths
//!
//! Undeclared-property violations point at the offending key
//! (`{instancePath}/{key}`); every other violation points at the failing
//! value (`{instancePath}`).

use serde_json::Value;

use crate::engine::{RawError, SchemaEngine};
use crate::error::{
    ClassifiedError, FieldError, STATUS_ADDITIONAL_PROPERTIES, STATUS_BAD_REQUEST,
};

/// Result of validating a document without throwing.
#[derive(Debug)]
pub enum ValidationOutcome {
    /// The document satisfied its schema. Carries the document after any
    /// engine-side mutations.
    Valid(Value),
    /// The document was rejected. `doc` is the input after any engine-side
    /// mutations that ran before the failure.
    Invalid { error: ClassifiedError, doc: Value },
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub fn error(&self) -> Option<&ClassifiedError> {
        match self {
            Self::Valid(_) => None,
            Self::Invalid { error, .. } => Some(error),
        }
    }

    pub fn doc(&self) -> &Value {
        match self {
            Self::Valid(doc) | Self::Invalid { doc, .. } => doc,
        }
    }

    pub fn into_parts(self) -> (Option<ClassifiedError>, Value) {
        match self {
            Self::Valid(doc) => (None, doc),
            Self::Invalid { error, doc } => (Some(error), doc),
        }
    }

    /// `Ok(doc)` when valid; otherwise the error with the document attached
    /// as its [`original`](ClassifiedError::original).
    pub fn into_result(self) -> Result<Value, ClassifiedError> {
        match self {
            Self::Valid(doc) => Ok(doc),
            Self::Invalid { error, doc } => Err(error.with_original(doc)),
        }
    }
}

/// Classify a non-empty violation list; `None` when there is nothing to report.
pub fn classify(schema: &str, errors: &[RawError]) -> Option<ClassifiedError> {
    if errors.is_empty() {
        return None;
    }

    let mut only_additional_properties = true;
    let mut sub_errors = Vec::with_capacity(errors.len());
    for raw in errors {
        let field = match (&raw.additional_property, raw.is_additional_property()) {
            (Some(property), true) => format!("{}/{}", raw.instance_path, property),
            _ => {
                only_additional_properties = false;
                raw.instance_path.clone()
            }
        };
        sub_errors.push(FieldError::new(field, raw.message.clone()));
    }

    let status = if only_additional_properties {
        STATUS_ADDITIONAL_PROPERTIES
    } else {
        STATUS_BAD_REQUEST
    };
    let message = format!(
        "{schema} validation failed: {}",
        SchemaEngine::errors_text(errors)
    );

    Some(ClassifiedError::http_status(status, message, sub_errors))
}

/// Look up, run and classify in one step.
///
/// Unknown names classify as not-found before `doc` is inspected. Engine
/// failures classify as internal validation errors carrying the cause.
pub(crate) fn evaluate(engine: &SchemaEngine, schema: &str, mut doc: Value) -> ValidationOutcome {
    let compiled = match engine.compiled(schema) {
        Ok(Some(compiled)) => compiled,
        Ok(None) => {
            return ValidationOutcome::Invalid {
                error: ClassifiedError::not_found(schema),
                doc,
            }
        }
        Err(e) => {
            return ValidationOutcome::Invalid {
                error: ClassifiedError::internal(e),
                doc,
            }
        }
    };

    let raw = match engine.run(&compiled, &mut doc) {
        Ok(raw) => raw,
        Err(e) => {
            return ValidationOutcome::Invalid {
                error: ClassifiedError::internal(e),
                doc,
            }
        }
    };

    match classify(schema, &raw) {
        None => ValidationOutcome::Valid(doc),
        Some(error) => ValidationOutcome::Invalid { error, doc },
    }
}
