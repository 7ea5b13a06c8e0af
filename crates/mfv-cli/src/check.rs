//! `mfv check`: validate documents against a named schema.

use std::path::PathBuf;

use clap::Args;
use mfv_schema::{ClassifiedError, Validator};
use serde_json::{json, Value};

use crate::{read_document, SchemaArgs};

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub schema: SchemaArgs,

    /// Registered schema name to validate against.
    #[arg(long, short = 'n')]
    pub name: String,

    /// Accept documents whose only problem is undeclared properties.
    #[arg(long)]
    pub lenient: bool,

    /// Documents to validate (JSON or YAML).
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

/// Result of validating one file.
#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub result: Result<Value, ClassifiedError>,
}

impl FileReport {
    pub fn is_valid(&self) -> bool {
        self.result.is_ok()
    }

    pub fn to_json(&self) -> Value {
        match &self.result {
            Ok(doc) => json!({
                "file": self.path.display().to_string(),
                "valid": true,
                "document": doc,
            }),
            Err(error) => json!({
                "file": self.path.display().to_string(),
                "valid": false,
                "error": error.to_json(),
            }),
        }
    }
}

/// Validate every file in order. Unreadable files abort the run; schema
/// failures are reported per file.
pub async fn run_check(validator: &Validator, args: &CheckArgs) -> anyhow::Result<Vec<FileReport>> {
    let mut reports = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let doc = read_document(path)?;
        let result = if args.lenient {
            validator.filter(&args.name, doc).await
        } else {
            validator.validate(&args.name, doc).await
        };
        if let Err(error) = &result {
            tracing::info!(file = %path.display(), status = error.status(), "document rejected");
        }
        reports.push(FileReport {
            path: path.clone(),
            result,
        });
    }
    Ok(reports)
}
