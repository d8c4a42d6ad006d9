//! Integration tests for CLI

use api_interchange_sdk::cli::commands::convert::{ConvertArgs, handle_convert};
use api_interchange_sdk::cli::commands::detect::handle_detect;
use api_interchange_sdk::cli::commands::export::{ExportArgs, handle_export};
use api_interchange_sdk::cli::commands::import::{ImportArgs, InputSource, handle_import};
use api_interchange_sdk::cli::error::CliError;
use api_interchange_sdk::{ExportOptions, FormatId, ImportOptions, Importer};
use tempfile::tempdir;

const HAR: &str = r#"{
  "log": {
    "version": "1.2",
    "entries": [
      {"request": {"method": "GET", "url": "https://shop.test/cart?id=9",
                   "headers": [{"name": "Accept", "value": "application/json"}]}},
      {"request": {"method": "POST", "url": "https://shop.test/checkout",
                   "postData": {"mimeType": "application/json", "text": "{\"pay\": true}"}}}
    ]
  }
}"#;

#[test]
fn test_cli_detect() {
    let candidates = handle_detect(&InputSource::String(HAR.to_string())).unwrap();
    assert_eq!(candidates[0], Importer::Har);

    let unknown = handle_detect(&InputSource::String("plain text".to_string()));
    assert!(matches!(unknown, Err(CliError::UnknownFormat)));
}

#[test]
fn test_cli_convert_har_to_curl() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("shop.sh");
    let args = ConvertArgs {
        input: InputSource::String(HAR.to_string()),
        from: None,
        to: FormatId::Curl,
        import_options: ImportOptions::default(),
        export_options: ExportOptions::default(),
        output: Some(output.clone()),
        force: false,
    };

    let result = handle_convert(&args).unwrap();
    assert_eq!(result.format, FormatId::Curl);
    assert_eq!(result.metadata.item_count, 2);

    let script = std::fs::read_to_string(&output).unwrap();
    assert!(script.contains("https://shop.test/cart?id=9"));
    assert!(script.contains("-X POST"));
}

#[test]
fn test_cli_import_then_export() {
    let dir = tempdir().unwrap();
    let imported = dir.path().join("imported.json");
    let import = ImportArgs {
        input: InputSource::String(HAR.to_string()),
        format: None,
        options: ImportOptions::default(),
        pretty: true,
        output: Some(imported.clone()),
        force: false,
    };
    handle_import(&import).unwrap();

    let exported = dir.path().join("shop.har");
    let export = ExportArgs {
        input: InputSource::File(imported),
        format: FormatId::Har,
        options: ExportOptions::default(),
        output: Some(exported.clone()),
        force: false,
    };
    let result = handle_export(&export).unwrap();
    assert_eq!(result.metadata.item_count, 2);

    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&exported).unwrap()).unwrap();
    assert_eq!(doc["log"]["entries"][1]["request"]["method"], "POST");
}

#[test]
fn test_cli_convert_failure() {
    let args = ConvertArgs {
        input: InputSource::String("not an api".to_string()),
        from: None,
        to: FormatId::Json,
        import_options: ImportOptions::default(),
        export_options: ExportOptions::default(),
        output: None,
        force: false,
    };
    assert!(matches!(handle_convert(&args), Err(CliError::ExportFailed(_))));
}
