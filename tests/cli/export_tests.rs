//! Export command tests

use api_interchange_sdk::cli::commands::export::{ExportArgs, handle_export, parse_bundle};
use api_interchange_sdk::cli::commands::import::InputSource;
use api_interchange_sdk::cli::error::CliError;
use api_interchange_sdk::{ExportOptions, FormatId};
use std::io::Write;
use tempfile::{NamedTempFile, tempdir};

const BUNDLE: &str = r#"{
  "collections": [],
  "requests": [
    {"id": "r1", "name": "Ping", "method": "GET", "url": "https://a.test/ping"},
    {"id": "r2", "name": "Create", "method": "POST", "url": "https://a.test/items",
     "headers": [{"key": "Content-Type", "value": "application/json"}],
     "body": {"type": "json", "content": "{\"id\": 1}"}}
  ]
}"#;

fn create_bundle_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", BUNDLE).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_cli_export_curl() {
    let input = create_bundle_file();
    let dir = tempdir().unwrap();
    let output = dir.path().join("out").join("requests.sh");
    let args = ExportArgs {
        input: InputSource::File(input.path().to_path_buf()),
        format: FormatId::Curl,
        options: ExportOptions::default(),
        output: Some(output.clone()),
        force: false,
    };

    let result = handle_export(&args).unwrap();
    assert_eq!(result.metadata.item_count, 2);

    let script = std::fs::read_to_string(&output).unwrap();
    assert!(script.contains("curl"));
    assert!(script.contains("-X POST"));
}

#[test]
fn test_cli_export_postman_compact() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("collection.json");
    let args = ExportArgs {
        input: InputSource::String(BUNDLE.to_string()),
        format: FormatId::PostmanV21,
        options: ExportOptions {
            prettify: false,
            ..ExportOptions::default()
        },
        output: Some(output.clone()),
        force: false,
    };

    handle_export(&args).unwrap();
    let written = std::fs::read_to_string(&output).unwrap();
    assert!(!written.contains('\n'));
    let doc: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(doc["item"].as_array().unwrap().len(), 2);
}

#[test]
fn test_cli_export_unsupported_format() {
    let args = ExportArgs {
        input: InputSource::String(BUNDLE.to_string()),
        format: FormatId::Wsdl11,
        options: ExportOptions::default(),
        output: None,
        force: false,
    };
    assert!(matches!(handle_export(&args), Err(CliError::ExportFailed(_))));
}

#[test]
fn test_cli_rejects_non_bundle_input() {
    assert!(matches!(parse_bundle("[1, 2]"), Err(CliError::InvalidArgument(_))));
}
