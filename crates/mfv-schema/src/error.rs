//! # Error Types: Classified Validation Errors
//!
//! Every failure surfaced by the validator is a [`ClassifiedError`]: a kind,
//! an HTTP-style status code, a human-readable message and an ordered list of
//! field-level sub-errors.
//!
//! ## Wire Contract
//!
//! The serialized shape is stable and consumed by callers directly:
//!
//! ```json
//! {
//!   "name": "HttpStatusError",
//!   "message": "custom validation failed: data must NOT have additional properties",
//!   "status": 417, "statusCode": 417, "status_code": 417,
//!   "errors": [{ "name": "HttpStatusError", "message": "...", "status": 400,
//!                "statusCode": 400, "status_code": 400, "field": "/extraneous" }]
//! }
//! ```
//!
//! The three status keys always mirror the same value. `errors` is omitted
//! when there are no sub-errors.

use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use thiserror::Error;

/// Status used for documents that only failed on undeclared properties.
pub const STATUS_ADDITIONAL_PROPERTIES: u16 = 417;

/// Status used for ordinary schema violations and for every sub-error.
pub const STATUS_BAD_REQUEST: u16 = 400;

/// Boxed cause attached to a [`ClassifiedError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Category of a [`ClassifiedError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No validator is registered under the requested name.
    NotFound,
    /// The schema directory is missing, not a directory, or unreadable.
    Io,
    /// The schema directory exists but no file passed the filter.
    FileNotFound,
    /// An entry point was called with an unusable argument.
    InvalidArgument,
    /// The engine itself failed while compiling or running a validator.
    InternalValidation,
    /// The document failed schema checks.
    SchemaValidation,
}

impl ErrorKind {
    /// Serialized `name` of errors of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NotFound => "NotFoundError",
            Self::Io => "IOError",
            Self::FileNotFound => "FileNotFoundError",
            Self::InvalidArgument => "TypeError",
            Self::InternalValidation => "InvalidOperationError",
            Self::SchemaValidation => "HttpStatusError",
        }
    }

    fn default_status(&self) -> u16 {
        match self {
            Self::NotFound | Self::FileNotFound => 404,
            Self::InvalidArgument | Self::SchemaValidation => STATUS_BAD_REQUEST,
            Self::Io | Self::InternalValidation => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single field-level diagnostic inside a schema validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// JSON Pointer of the offending value.
    pub field: String,
    /// What was wrong with it.
    pub message: String,
    /// Always [`STATUS_BAD_REQUEST`] for sub-errors produced by translation.
    pub status: u16,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            status: STATUS_BAD_REQUEST,
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

impl Serialize for FieldError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(6))?;
        map.serialize_entry("name", ErrorKind::SchemaValidation.name())?;
        map.serialize_entry("message", &self.message)?;
        map.serialize_entry("status", &self.status)?;
        map.serialize_entry("statusCode", &self.status)?;
        map.serialize_entry("status_code", &self.status)?;
        map.serialize_entry("field", &self.field)?;
        map.end()
    }
}

/// Error returned by every fallible validator operation.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct ClassifiedError {
    kind: ErrorKind,
    status: u16,
    message: String,
    errors: Vec<FieldError>,
    #[source]
    source: Option<BoxError>,
    original: Option<Value>,
}

impl ClassifiedError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: kind.default_status(),
            message: message.into(),
            errors: Vec::new(),
            source: None,
            original: None,
        }
    }

    /// No validator registered under `schema`.
    pub fn not_found(schema: &str) -> Self {
        Self::new(ErrorKind::NotFound, format!("validator \"{schema}\" not found"))
    }

    /// Directory-level I/O failure, carrying the underlying cause.
    pub fn io(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        let mut error = Self::new(ErrorKind::Io, message);
        error.source = Some(source.into());
        error
    }

    /// Directory-level I/O failure without an underlying cause.
    pub fn io_message(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    /// The filter left no candidate files in `dir`.
    pub fn file_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FileNotFound, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// The engine failed while compiling or running a validator.
    pub fn internal(source: impl Into<BoxError>) -> Self {
        let mut error = Self::new(ErrorKind::InternalValidation, "internal validation error");
        error.source = Some(source.into());
        error
    }

    /// A schema validation failure with its sub-errors, in engine order.
    pub fn http_status(status: u16, message: impl Into<String>, errors: Vec<FieldError>) -> Self {
        let mut error = Self::new(ErrorKind::SchemaValidation, message);
        error.status = status;
        error.errors = errors;
        error
    }

    pub(crate) fn with_original(mut self, doc: Value) -> Self {
        self.original = Some(doc);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// HTTP-style status code, mirrored as `status`/`statusCode`/`status_code`.
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Field-level diagnostics, empty for every kind but `SchemaValidation`.
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// The document a rejected `validate` call was made with, after any
    /// engine-side mutations. Never serialized.
    pub fn original(&self) -> Option<&Value> {
        self.original.as_ref()
    }

    /// Consume the error and recover the rejected document, if one is attached.
    pub fn into_original(self) -> Option<Value> {
        self.original
    }

    /// True when the document was valid except for undeclared properties.
    pub fn is_additional_properties_only(&self) -> bool {
        self.kind == ErrorKind::SchemaValidation && self.status == STATUS_ADDITIONAL_PROPERTIES
    }

    /// The serialized wire contract as a JSON value.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for ClassifiedError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.errors.is_empty() { 5 } else { 6 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("name", self.kind.name())?;
        map.serialize_entry("message", &self.message)?;
        map.serialize_entry("status", &self.status)?;
        map.serialize_entry("statusCode", &self.status)?;
        map.serialize_entry("status_code", &self.status)?;
        if !self.errors.is_empty() {
            map.serialize_entry("errors", &self.errors)?;
        }
        map.end()
    }
}
