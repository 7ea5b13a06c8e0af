//! # mfv-schema: Named JSON Schema Validators
//!
//! Discovers JSON Schema documents in a directory tree, registers them under
//! stable names, and validates request/response payloads against them with a
//! serializable, HTTP-status-coded error contract.
//!
//! ## Loading (`loader`)
//!
//! [`Validator::init`] walks a directory, keeps the files accepted by a
//! [`SchemaFilter`] (default: `*.json`) and registers each schema under its
//! `$id`, or under a dotted name derived from its relative path
//! (`nested/no-id.json` → `nested.no-id`).
//!
//! ## Validating (`validator`, `translate`)
//!
//! - [`Validator::validate`] rejects on any failure.
//! - [`Validator::filter`] tolerates documents whose only problem is
//!   undeclared properties (status 417).
//! - [`Validator::validate_sync`] returns a [`ValidationOutcome`].
//! - [`Validator::if_error`] fails synchronously.
//!
//! ## Errors (`error`)
//!
//! Every failure is a [`ClassifiedError`] with a kind, a status code mirrored
//! as `status`/`statusCode`/`status_code`, a message and field-level
//! sub-errors.
//!
//! ## Engine (`engine`)
//!
//! JSON Schema semantics come from the `jsonschema` crate. The engine adds a
//! name-keyed registry, cross-schema `$ref` resolution from that registry,
//! the `http-url` format, and default/strip mutations.

pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod loader;
mod mutate;
pub mod options;
pub mod translate;
pub mod validator;

pub use config::{ConfigError, ValidatorConfig};
pub use engine::{CompiledSchema, EngineError, RawError, SchemaEngine};
pub use error::{ClassifiedError, ErrorKind, FieldError};
pub use loader::{SchemaLoader, SchemaRegistration};
pub use options::{SchemaFilter, ValidatorOptions};
pub use translate::{classify, ValidationOutcome};
pub use validator::{Validator, ValidatorBuilder};
