//! `mfv list`: show the names a schema directory registers.

use clap::Args;
use mfv_schema::Validator;

use crate::SchemaArgs;

#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub schema: SchemaArgs,

    /// Print a JSON array instead of one name per line.
    #[arg(long)]
    pub json: bool,
}

/// Registered schema names, sorted.
pub fn run_list(validator: &Validator) -> Vec<String> {
    validator.engine().schema_names()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_names() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("billing")).unwrap();
        std::fs::write(tmp.path().join("user.json"), r#"{"type": "object"}"#).unwrap();
        std::fs::write(
            tmp.path().join("billing/invoice.json"),
            r#"{"type": "object"}"#,
        )
        .unwrap();
        std::fs::write(
            tmp.path().join("tagged.json"),
            r#"{"$id": "urn:tagged", "type": "string"}"#,
        )
        .unwrap();

        let args = SchemaArgs {
            schemas: Some(tmp.path().to_path_buf()),
            ..SchemaArgs::default()
        };
        let validator = args.load().await.unwrap();
        assert_eq!(
            run_list(&validator),
            vec!["billing.invoice", "urn:tagged", "user"]
        );
    }
}
