//! # Schema Discovery
//!
//! Walks a directory tree, keeps the files the [`SchemaFilter`] accepts,
//! parses each as a schema document and registers it with the engine.
//!
//! ## Registration Names
//!
//! A schema registers under its declared `$id` (or legacy `id`). Without
//! one, the name is derived from the path relative to the scanned
//! directory: the final extension is dropped and the remaining components
//! are joined with `.`, so `nested/no-id.json` becomes `nested.no-id`.
//!
//! ## Failure Atomicity
//!
//! Every candidate is read and parsed before anything is registered, so a
//! failing `load` leaves the engine untouched. Loading the same names twice,
//! from this or another directory, overwrites earlier registrations.
//!
//! ## Traversal
//!
//! Symbolic links are never followed into; a link is a leaf and is read as
//! a file if the filter accepts its name.

use std::io;
use std::path::{Component, Path, PathBuf};

use serde_json::Value;

use crate::engine::{declared_id, SchemaEngine};
use crate::error::{BoxError, ClassifiedError};
use crate::options::SchemaFilter;

/// A schema registered by one `load` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaRegistration {
    /// Name the schema is looked up under.
    pub name: String,
    /// File the schema was read from.
    pub path: PathBuf,
}

struct ParsedSchema {
    name: String,
    path: PathBuf,
    document: Value,
}

/// Loads schema directories into a [`SchemaEngine`].
#[derive(Debug)]
pub struct SchemaLoader<'a> {
    engine: &'a SchemaEngine,
    filter: &'a SchemaFilter,
}

impl<'a> SchemaLoader<'a> {
    pub fn new(engine: &'a SchemaEngine, filter: &'a SchemaFilter) -> Self {
        Self { engine, filter }
    }

    /// Discover, parse and register every candidate under `base_dir`.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `base_dir` is relative.
    /// - `Io` if `base_dir` is missing, not a directory, unreadable, or a
    ///   candidate cannot be read or parsed.
    /// - `FileNotFound` if no file passes the filter.
    pub async fn load(&self, base_dir: &Path) -> Result<Vec<SchemaRegistration>, ClassifiedError> {
        ensure_absolute(base_dir)?;

        let metadata = tokio::fs::metadata(base_dir)
            .await
            .map_err(|e| unable_to_read(base_dir, e))?;
        ensure_directory(base_dir, metadata.is_dir())?;

        let files = walk(base_dir).await.map_err(|e| unable_to_read(base_dir, e))?;
        let candidates = self.candidates(base_dir, files)?;

        let mut parsed = Vec::with_capacity(candidates.len());
        for relative in candidates {
            let path = base_dir.join(&relative);
            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| unable_to_read(&path, e))?;
            parsed.push(parse_schema(&relative, path, &content)?);
        }

        Ok(self.register(base_dir, parsed))
    }

    /// Blocking twin of [`load`](Self::load).
    pub fn load_sync(&self, base_dir: &Path) -> Result<Vec<SchemaRegistration>, ClassifiedError> {
        ensure_absolute(base_dir)?;

        let metadata = std::fs::metadata(base_dir).map_err(|e| unable_to_read(base_dir, e))?;
        ensure_directory(base_dir, metadata.is_dir())?;

        let files = walk_sync(base_dir).map_err(|e| unable_to_read(base_dir, e))?;
        let candidates = self.candidates(base_dir, files)?;

        let mut parsed = Vec::with_capacity(candidates.len());
        for relative in candidates {
            let path = base_dir.join(&relative);
            let content = std::fs::read_to_string(&path).map_err(|e| unable_to_read(&path, e))?;
            parsed.push(parse_schema(&relative, path, &content)?);
        }

        Ok(self.register(base_dir, parsed))
    }

    fn candidates(
        &self,
        base_dir: &Path,
        files: Vec<PathBuf>,
    ) -> Result<Vec<PathBuf>, ClassifiedError> {
        let candidates: Vec<PathBuf> = files
            .into_iter()
            .filter(|relative| self.filter.matches(relative))
            .collect();

        if candidates.is_empty() {
            return Err(ClassifiedError::file_not_found(format!(
                "no schemas found in dir '{}'",
                base_dir.display()
            )));
        }
        Ok(candidates)
    }

    fn register(&self, base_dir: &Path, parsed: Vec<ParsedSchema>) -> Vec<SchemaRegistration> {
        let registrations: Vec<SchemaRegistration> = parsed
            .iter()
            .map(|schema| SchemaRegistration {
                name: schema.name.clone(),
                path: schema.path.clone(),
            })
            .collect();

        self.engine.add_schemas(
            parsed
                .into_iter()
                .map(|schema| (schema.name, schema.document)),
        );

        tracing::info!(
            dir = %base_dir.display(),
            count = registrations.len(),
            "schemas loaded"
        );
        registrations
    }
}

/// Registration name derived from a path relative to the scanned directory.
pub fn derive_name(relative: &Path) -> String {
    relative
        .with_extension("")
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(".")
}

fn parse_schema(relative: &Path, path: PathBuf, content: &str) -> Result<ParsedSchema, ClassifiedError> {
    let parsed: Result<Value, BoxError> = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => serde_yaml::from_str(content).map_err(Into::into),
        _ => serde_json::from_str(content).map_err(Into::into),
    };
    let document = parsed.map_err(|e| {
        ClassifiedError::io(format!("was unable to parse schema {}", path.display()), e)
    })?;

    let derived = derive_name(relative);
    let declared = declared_id(&document).map(str::to_string);
    tracing::debug!(
        schema = %declared.as_deref().unwrap_or(&derived),
        path = %path.display(),
        id = ?declared,
        default_name = %derived,
        "adding schema"
    );

    Ok(ParsedSchema {
        name: declared.unwrap_or(derived),
        path,
        document,
    })
}

fn ensure_absolute(base_dir: &Path) -> Result<(), ClassifiedError> {
    if base_dir.is_absolute() {
        Ok(())
    } else {
        Err(ClassifiedError::invalid_argument(format!(
            "schema directory \"{}\" must be absolute",
            base_dir.display()
        )))
    }
}

fn ensure_directory(base_dir: &Path, is_dir: bool) -> Result<(), ClassifiedError> {
    if is_dir {
        Ok(())
    } else {
        Err(ClassifiedError::io_message(format!(
            "\"{}\" is not a directory",
            base_dir.display()
        )))
    }
}

fn unable_to_read(path: &Path, source: io::Error) -> ClassifiedError {
    ClassifiedError::io(format!("was unable to read {}", path.display()), source)
}

/// Relative paths of every non-directory entry under `root`, sorted.
async fn walk(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut pending = vec![PathBuf::new()];
    let mut files = Vec::new();

    while let Some(relative) = pending.pop() {
        let mut entries = tokio::fs::read_dir(root.join(&relative)).await?;
        while let Some(entry) = entries.next_entry().await? {
            let child = relative.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                pending.push(child);
            } else {
                files.push(child);
            }
        }
    }

    files.sort();
    Ok(files)
}

fn walk_sync(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut pending = vec![PathBuf::new()];
    let mut files = Vec::new();

    while let Some(relative) = pending.pop() {
        for entry in std::fs::read_dir(root.join(&relative))? {
            let entry = entry?;
            let child = relative.join(entry.file_name());
            if entry.file_type()?.is_dir() {
                pending.push(child);
            } else {
                files.push(child);
            }
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::options::ValidatorOptions;
    use proptest::prelude::*;

    fn write(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_derive_name() {
        assert_eq!(derive_name(Path::new("custom.json")), "custom");
        assert_eq!(derive_name(Path::new("nested/no-id.json")), "nested.no-id");
        assert_eq!(derive_name(Path::new("a/b/c.schema.json")), "a.b.c.schema");
        assert_eq!(derive_name(Path::new("plain")), "plain");
    }

    #[test]
    fn test_load_sync_registers_by_id_and_path() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "with-id.json", r#"{"$id": "declared", "type": "string"}"#);
        write(tmp.path(), "nested/no-id.json", r#"{"type": "integer"}"#);
        write(tmp.path(), "notes.txt", "ignored");

        let engine = SchemaEngine::new(ValidatorOptions::default());
        let filter = SchemaFilter::default();
        let registrations = SchemaLoader::new(&engine, &filter)
            .load_sync(tmp.path())
            .unwrap();

        let names: Vec<&str> = registrations.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["nested.no-id", "declared"]);
        assert!(engine.has_schema("declared"));
        assert!(!engine.has_schema("with-id"));
        assert!(engine.has_schema("nested.no-id"));
    }

    #[test]
    fn test_yaml_schemas_parse() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "types/code.yaml", "type: string\nminLength: 2\n");

        let engine = SchemaEngine::new(ValidatorOptions::default());
        let filter = SchemaFilter::extensions(["yaml"]);
        SchemaLoader::new(&engine, &filter)
            .load_sync(tmp.path())
            .unwrap();

        assert_eq!(engine.schema_names(), vec!["types.code"]);
    }

    #[test]
    fn test_parse_failure_registers_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "a.json", r#"{"type": "string"}"#);
        write(tmp.path(), "b.json", "{broken");

        let engine = SchemaEngine::new(ValidatorOptions::default());
        let filter = SchemaFilter::default();
        let err = SchemaLoader::new(&engine, &filter)
            .load_sync(tmp.path())
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.message().contains("b.json"));
        assert_eq!(engine.schema_count(), 0);
    }

    #[test]
    fn test_relative_dir_rejected() {
        let engine = SchemaEngine::new(ValidatorOptions::default());
        let filter = SchemaFilter::default();
        let err = SchemaLoader::new(&engine, &filter)
            .load_sync(Path::new("relative/schemas"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directories_are_not_traversed() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "real/one.json", r#"{"type": "string"}"#);
        std::os::unix::fs::symlink(tmp.path().join("real"), tmp.path().join("loop")).unwrap();

        let files = walk_sync(tmp.path()).unwrap();
        assert_eq!(files, vec![PathBuf::from("loop"), PathBuf::from("real/one.json")]);
    }

    #[tokio::test]
    async fn test_async_and_sync_walks_agree() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "a.json", "{}");
        write(tmp.path(), "x/b.json", "{}");
        write(tmp.path(), "x/y/c.json", "{}");

        let from_async = walk(tmp.path()).await.unwrap();
        let from_sync = walk_sync(tmp.path()).unwrap();
        assert_eq!(from_async, from_sync);
        assert_eq!(from_sync.len(), 3);
    }

    proptest! {
        #[test]
        fn prop_derived_names_have_no_separators(
            parts in proptest::collection::vec("[a-z][a-z0-9-]{0,8}", 1..5)
        ) {
            let relative = format!("{}.json", parts.join("/"));
            let name = derive_name(Path::new(&relative));
            prop_assert_eq!(name, parts.join("."));
        }
    }
}
