//! Integration tests: load the on-disk fixture tree and exercise every entry
//! point of the validator against it.

use std::path::PathBuf;
use std::sync::Arc;

use mfv_schema::{ErrorKind, SchemaFilter, ValidationOutcome, Validator, ValidatorOptions};
use serde_json::json;

fn tests_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests")
}

fn fixtures() -> PathBuf {
    tests_dir().join("fixtures")
}

fn stripping() -> ValidatorOptions {
    ValidatorOptions {
        strip_additional_properties: true,
        ..ValidatorOptions::default()
    }
}

async fn loaded(options: ValidatorOptions) -> Validator {
    let validator = Validator::builder()
        .schema_dir(fixtures())
        .options(options)
        .build();
    validator.init(None).await.expect("fixtures load");
    validator
}

// ── init ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_init_without_dir_is_type_error() {
    let err = Validator::default().init(None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(err.name(), "TypeError");
}

#[tokio::test]
async fn test_init_registers_fixture_names() {
    let validator = loaded(ValidatorOptions::default()).await;
    let engine = validator.engine();

    for name in [
        "custom",
        "core-no-id",
        "nested.no-id",
        "http-url",
        "2019-09",
        "defaults",
        "order",
        "legacy.point",
    ] {
        assert!(engine.has_schema(name), "missing schema {name}");
    }
    assert_eq!(engine.schema_count(), 8);
}

#[tokio::test]
async fn test_init_with_relative_path_and_base_dir() {
    let validator = Validator::builder().base_dir(tests_dir()).build();
    validator
        .init(Some(std::path::Path::new("fixtures")))
        .await
        .unwrap();

    assert!(validator.engine().has_schema("custom"));
    assert!(validator.engine().has_schema("core-no-id"));
    assert!(validator.engine().has_schema("nested.no-id"));
}

#[test]
fn test_init_sync_matches_async() {
    let validator = Validator::new(fixtures());
    let registrations = validator.init_sync(None).unwrap();
    assert_eq!(registrations.len(), 8);
    assert!(registrations
        .iter()
        .any(|r| r.name == "nested.no-id" && r.path.ends_with("nested/no-id.json")));
}

#[tokio::test]
async fn test_init_missing_dir_is_io_error() {
    let err = Validator::default()
        .init(Some(tests_dir().join("notexistant").as_path()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert_eq!(err.name(), "IOError");
    assert!(std::error::Error::source(&err).is_some());
}

#[tokio::test]
async fn test_init_empty_dir_is_file_not_found() {
    let err = Validator::default()
        .init(Some(fixtures().join("empty").as_path()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FileNotFound);
    assert_eq!(err.name(), "FileNotFoundError");
}

#[tokio::test]
async fn test_init_on_a_file_is_io_error() {
    let err = Validator::default()
        .init(Some(fixtures().join("empty/.gitkeep").as_path()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(err.message().contains("is not a directory"));
}

#[tokio::test]
async fn test_non_matching_files_register_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("readme.txt"), "not a schema").unwrap();
    std::fs::write(tmp.path().join("schema.json.bak"), "{}").unwrap();

    let validator = Validator::default();
    let err = validator.init(Some(tmp.path())).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FileNotFound);
    assert_eq!(validator.engine().schema_count(), 0);
}

#[tokio::test]
async fn test_declared_id_wins_over_path_name() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir(tmp.path().join("deep")).unwrap();
    std::fs::write(
        tmp.path().join("deep/file-name.json"),
        r#"{"$id": "declared-name", "type": "boolean"}"#,
    )
    .unwrap();

    let validator = Validator::default();
    let registrations = validator.init(Some(tmp.path())).await.unwrap();
    assert_eq!(registrations[0].name, "declared-name");
    assert!(!validator.engine().has_schema("deep.file-name"));
    assert!(validator.if_error("declared-name", json!(true)).is_ok());
}

#[tokio::test]
async fn test_custom_filter_accepts_yaml() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("tag.yml"), "type: string\npattern: '^[a-z]+$'\n").unwrap();
    std::fs::write(tmp.path().join("skip.json"), "{}").unwrap();

    let validator = Validator::builder()
        .filter(SchemaFilter::extensions(["yml"]))
        .build();
    validator.init(Some(tmp.path())).await.unwrap();

    assert_eq!(validator.engine().schema_names(), vec!["tag"]);
    assert!(validator.if_error("tag", json!("abc")).is_ok());
    assert!(validator.if_error("tag", json!("ABC")).is_err());
}

#[tokio::test]
async fn test_repeated_init_merges_and_overwrites() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    std::fs::write(first.path().join("a.json"), r#"{"type": "string"}"#).unwrap();
    std::fs::write(first.path().join("shared.json"), r#"{"type": "string"}"#).unwrap();
    std::fs::write(second.path().join("b.json"), r#"{"type": "integer"}"#).unwrap();
    std::fs::write(second.path().join("shared.json"), r#"{"type": "integer"}"#).unwrap();

    let validator = Validator::default();
    validator.init(Some(first.path())).await.unwrap();
    assert!(validator.if_error("shared", json!("s")).is_ok());

    validator.init(Some(second.path())).await.unwrap();
    assert_eq!(validator.engine().schema_names(), vec!["a", "b", "shared"]);
    assert!(validator.if_error("shared", json!(1)).is_ok());
    assert!(validator.if_error("shared", json!("s")).is_err());
}

// ── validate / filter ───────────────────────────────────────────────

#[tokio::test]
async fn test_validate_unknown_schema_is_not_found() {
    let validator = loaded(ValidatorOptions::default()).await;
    let err = validator.validate("bad-route", json!({})).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.name(), "NotFoundError");
}

#[tokio::test]
async fn test_validate_correct_object() {
    let validator = loaded(ValidatorOptions::default()).await;
    let doc = validator
        .validate("custom", json!({"string": "not empty"}))
        .await
        .unwrap();
    assert_eq!(doc, json!({"string": "not empty"}));
}

#[tokio::test]
async fn test_validate_extra_property_is_417_with_exact_shape() {
    let validator = loaded(ValidatorOptions::default()).await;
    let err = validator
        .validate("custom", json!({"string": "not empty", "extraneous": true}))
        .await
        .unwrap_err();

    assert_eq!(err.status(), 417);
    assert_eq!(
        serde_json::to_value(&err).unwrap(),
        json!({
            "errors": [{
                "field": "/extraneous",
                "message": "must NOT have additional properties",
                "name": "HttpStatusError",
                "status": 400,
                "statusCode": 400,
                "status_code": 400,
            }],
            "message": "custom validation failed: data must NOT have additional properties",
            "name": "HttpStatusError",
            "status": 417,
            "statusCode": 417,
            "status_code": 417,
        })
    );
}

#[tokio::test]
async fn test_filter_strips_extra_properties() {
    let validator = loaded(stripping()).await;
    let doc = validator
        .filter("custom", json!({"string": "not empty", "qq": "not in schema"}))
        .await
        .unwrap();
    assert_eq!(doc, json!({"string": "not empty"}));
}

#[tokio::test]
async fn test_filter_tolerates_417_without_stripping() {
    let validator = loaded(ValidatorOptions::default()).await;
    let doc = validator
        .filter("custom", json!({"string": "ok", "extra": 1}))
        .await
        .unwrap();
    assert_eq!(doc, json!({"string": "ok", "extra": 1}));
}

#[tokio::test]
async fn test_filter_still_rejects_invalid_data() {
    let validator = loaded(stripping()).await;
    let err = validator
        .filter("custom", json!({"string": 20, "qq": "not in schema"}))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaValidation);
    assert_eq!(err.status(), 400);
}

#[tokio::test]
async fn test_extra_property_and_type_violation_is_400_everywhere() {
    let validator = loaded(ValidatorOptions::default()).await;
    let data = json!({"string": 20, "extra": true});

    let err = validator.validate("custom", data.clone()).await.unwrap_err();
    assert_eq!(err.status(), 400);
    let fields: Vec<&str> = err.errors().iter().map(|e| e.field.as_str()).collect();
    assert!(fields.contains(&"/extra"));
    assert!(fields.contains(&"/string"));
    assert!(err.errors().iter().all(|e| e.status == 400));

    let err = validator.filter("custom", data).await.unwrap_err();
    assert_eq!(err.status(), 400);
}

fn closed_schemas() -> Validator {
    let validator = Validator::default();
    validator.engine().add_schema(
        json!({"type": "object", "additionalProperties": false}),
        "closed",
    );
    validator.engine().add_schema(
        json!({
            "type": "object",
            "properties": {
                "meta": {"type": "object", "additionalProperties": false}
            }
        }),
        "closed-nested",
    );
    validator
}

#[tokio::test]
async fn test_closed_object_without_properties_is_417() {
    let validator = closed_schemas();
    let err = validator
        .validate("closed", json!({"a": 1, "b": 2}))
        .await
        .unwrap_err();

    assert_eq!(
        serde_json::to_value(&err).unwrap(),
        json!({
            "errors": [
                {
                    "field": "/a",
                    "message": "must NOT have additional properties",
                    "name": "HttpStatusError",
                    "status": 400,
                    "statusCode": 400,
                    "status_code": 400,
                },
                {
                    "field": "/b",
                    "message": "must NOT have additional properties",
                    "name": "HttpStatusError",
                    "status": 400,
                    "statusCode": 400,
                    "status_code": 400,
                },
            ],
            "message": "closed validation failed: data must NOT have additional properties, data must NOT have additional properties",
            "name": "HttpStatusError",
            "status": 417,
            "statusCode": 417,
            "status_code": 417,
        })
    );

    let doc = validator
        .filter("closed", json!({"a": 1, "b": 2}))
        .await
        .unwrap();
    assert_eq!(doc, json!({"a": 1, "b": 2}));
}

#[tokio::test]
async fn test_nested_closed_object_without_properties_is_417() {
    let validator = closed_schemas();
    let err = validator
        .validate("closed-nested", json!({"meta": {"x": true}}))
        .await
        .unwrap_err();
    assert_eq!(err.status(), 417);
    assert_eq!(err.errors().len(), 1);
    assert_eq!(err.errors()[0].field, "/meta/x");

    assert!(validator
        .filter("closed-nested", json!({"meta": {"x": true}}))
        .await
        .is_ok());
    assert!(validator
        .validate("closed-nested", json!({"meta": {}}))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_closed_object_with_type_violation_is_400() {
    let validator = closed_schemas();
    let err = validator
        .filter("closed-nested", json!({"meta": 5}))
        .await
        .unwrap_err();
    assert_eq!(err.status(), 400);
}

#[tokio::test]
async fn test_closed_object_stripped_by_filter() {
    let validator = Validator::builder().options(stripping()).build();
    validator.engine().add_schema(
        json!({"type": "object", "additionalProperties": false}),
        "closed",
    );
    let doc = validator
        .filter("closed", json!({"a": 1}))
        .await
        .unwrap();
    assert_eq!(doc, json!({}));
}

#[tokio::test]
async fn test_unknown_keywords_are_annotations() {
    let validator = Validator::default();
    validator.engine().add_schema(
        json!({"type": "integer", "range": [1, 3], "regexp": "^x"}),
        "plain-integer",
    );
    assert_eq!(
        validator.validate("plain-integer", json!(10)).await.unwrap(),
        json!(10)
    );
    assert!(validator.validate("plain-integer", json!("x")).await.is_err());
}

#[tokio::test]
async fn test_cross_schema_reference() {
    let validator = loaded(ValidatorOptions::default()).await;
    assert!(validator
        .validate("order", json!({"item": {"string": "x"}, "callback": "https://hooks.example.com/cb"}))
        .await
        .is_ok());

    let err = validator
        .validate("order", json!({"item": {"string": 1}, "callback": "ftp://x"}))
        .await
        .unwrap_err();
    assert_eq!(err.status(), 400);
    let fields: Vec<&str> = err.errors().iter().map(|e| e.field.as_str()).collect();
    assert!(fields.contains(&"/item/string"));
    assert!(fields.contains(&"/callback"));
}

#[tokio::test]
async fn test_draft_07_schema() {
    let validator = loaded(ValidatorOptions::default()).await;
    assert!(validator
        .validate("legacy.point", json!({"x": 1, "y": 2.5}))
        .await
        .is_ok());
    let err = validator
        .validate("legacy.point", json!({"x": "1"}))
        .await
        .unwrap_err();
    assert_eq!(err.status(), 400);
    assert_eq!(err.errors().len(), 2);
}

// ── defaults ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_defaults_round_trip_is_idempotent() {
    let validator = loaded(ValidatorOptions::default()).await;

    let first = validator
        .validate("defaults", json!({"name": "acme"}))
        .await
        .unwrap();
    assert_eq!(
        first,
        json!({"name": "acme", "tier": "free", "flags": {"beta": false}})
    );

    let second = validator.validate("defaults", first.clone()).await.unwrap();
    assert_eq!(second, first);
}

#[tokio::test]
async fn test_defaults_disabled() {
    let validator = loaded(ValidatorOptions {
        apply_defaults: false,
        ..ValidatorOptions::default()
    })
    .await;
    let doc = validator
        .validate("defaults", json!({"name": "acme"}))
        .await
        .unwrap();
    assert_eq!(doc, json!({"name": "acme"}));
}

// ── validate_sync / if_error ────────────────────────────────────────

#[tokio::test]
async fn test_validate_sync_success() {
    let validator = loaded(ValidatorOptions::default()).await;
    let outcome = validator.validate_sync("custom", json!({"string": "not empty"}));
    assert!(outcome.is_valid());
    assert!(outcome.error().is_none());
    assert_eq!(outcome.doc(), &json!({"string": "not empty"}));
}

#[tokio::test]
async fn test_validate_sync_strips_without_error() {
    let validator = loaded(stripping()).await;
    let outcome = validator.validate_sync("custom", json!({"string": "not empty", "extra": true}));
    match outcome {
        ValidationOutcome::Valid(doc) => assert_eq!(doc, json!({"string": "not empty"})),
        ValidationOutcome::Invalid { error, .. } => panic!("unexpected error: {error}"),
    }
}

#[tokio::test]
async fn test_validate_sync_failure_keeps_document() {
    let validator = loaded(ValidatorOptions::default()).await;
    let outcome = validator.validate_sync("custom", json!({"string": 5}));
    let (error, doc) = outcome.into_parts();
    assert_eq!(error.map(|e| e.status()), Some(400));
    assert_eq!(doc, json!({"string": 5}));
}

#[tokio::test]
async fn test_if_error_throws_on_invalid_data() {
    let validator = loaded(stripping()).await;
    let err = validator
        .if_error("custom", json!({"string": 200, "extra": true}))
        .unwrap_err();
    assert_eq!(err.name(), "HttpStatusError");
}

#[tokio::test]
async fn test_if_error_returns_stripped_document() {
    let validator = loaded(stripping()).await;
    let doc = validator
        .if_error("custom", json!({"string": "not empty", "extra": true}))
        .unwrap();
    assert_eq!(doc, json!({"string": "not empty"}));
}

#[test]
fn test_if_error_unknown_schema_before_init() {
    let validator = Validator::new(fixtures());
    let err = validator.if_error("custom", json!({})).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ── formats and drafts ──────────────────────────────────────────────

#[tokio::test]
async fn test_http_url_long_label_accepted() {
    let validator = loaded(ValidatorOptions::default()).await;
    let url = "https://google.com12349834543489525824485";
    assert_eq!(validator.if_error("http-url", json!(url)).unwrap(), json!(url));
}

#[tokio::test]
async fn test_http_url_rejections() {
    let validator = loaded(ValidatorOptions::default()).await;
    for bad in [
        "ftp://crap",
        "https://super.duper:8443",
        "https://",
        "http://notld",
        "http://notld:8443",
        "http://notld. :8443",
        "http://notld.",
        "http://notld. ",
    ] {
        let err = validator.if_error("http-url", json!(bad)).unwrap_err();
        assert_eq!(err.name(), "HttpStatusError", "{bad} should be rejected");
    }
}

#[tokio::test]
async fn test_http_url_with_fragment_accepted() {
    let validator = loaded(ValidatorOptions::default()).await;
    assert_eq!(
        validator.if_error("http-url", json!("https://super.duper#hash")).unwrap(),
        json!("https://super.duper#hash")
    );
}

#[tokio::test]
async fn test_2019_09_keywords() {
    let validator = loaded(ValidatorOptions::default()).await;
    let err = validator.if_error("2019-09", json!([1])).unwrap_err();
    assert_eq!(err.name(), "HttpStatusError");
    assert_eq!(validator.if_error("2019-09", json!([1, 2])).unwrap(), json!([1, 2]));
}

// ── concurrency ─────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_validate_while_init_pending() {
    let validator = Arc::new(Validator::new(fixtures()));

    let loader = {
        let validator = Arc::clone(&validator);
        tokio::spawn(async move { validator.init(None).await })
    };
    let probe = {
        let validator = Arc::clone(&validator);
        tokio::spawn(async move { validator.validate("custom", json!({"string": "x"})).await })
    };

    loader.await.unwrap().unwrap();
    match probe.await.unwrap() {
        Ok(doc) => assert_eq!(doc, json!({"string": "x"})),
        Err(err) => assert_eq!(err.kind(), ErrorKind::NotFound),
    }

    assert!(validator
        .validate("custom", json!({"string": "x"}))
        .await
        .is_ok());
}
