//! Import command tests

use api_interchange_sdk::ImportOptions;
use api_interchange_sdk::cli::commands::import::{
    ImportArgs, InputSource, handle_import, load_input,
};
use api_interchange_sdk::cli::error::CliError;
use api_interchange_sdk::formats::FormatId;
use std::io::Write;
use std::path::PathBuf;
use tempfile::{NamedTempFile, tempdir};

fn import_args(input: InputSource, output: Option<PathBuf>) -> ImportArgs {
    ImportArgs {
        input,
        format: None,
        options: ImportOptions::default(),
        pretty: true,
        output,
        force: false,
    }
}

#[test]
fn test_cli_import_curl_file() {
    let mut file = NamedTempFile::new().unwrap();
    let command = r#"curl -X POST https://api.test/users -d '{"name":"Ann"}'"#;
    writeln!(file, "{}", command).unwrap();
    file.flush().unwrap();

    let dir = tempdir().unwrap();
    let output = dir.path().join("result.json");
    let input = InputSource::File(file.path().to_path_buf());
    let args = import_args(input, Some(output.clone()));

    let result = handle_import(&args).unwrap();
    assert_eq!(result.metadata.format, Some(FormatId::Curl));
    assert_eq!(result.requests[0].method, "POST");

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written["success"], true);
    assert_eq!(written["requests"][0]["url"], "https://api.test/users");
}

#[test]
fn test_cli_import_with_explicit_format_and_base_url() {
    let content = "#%RAML 1.0\ntitle: Users\n/users:\n  get:\n";
    let mut args = import_args(InputSource::String(content.to_string()), None);
    args.format = Some(FormatId::Raml10);
    args.options.base_url = Some("https://raml.test".to_string());
    args.pretty = false;

    let dir = tempdir().unwrap();
    args.output = Some(dir.path().join("raml.json"));

    let result = handle_import(&args).unwrap();
    assert_eq!(result.requests.len(), 1);
    assert_eq!(result.requests[0].url, "https://raml.test/users");
}

#[test]
fn test_cli_import_failure_still_writes_result() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("failed.json");
    let input = InputSource::String("{ broken".to_string());
    let mut args = import_args(input, Some(output.clone()));
    args.format = Some(FormatId::PostmanV21);

    let err = handle_import(&args).unwrap_err();
    assert!(matches!(err, CliError::ImportFailed(_)));

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written["success"], false);
}

#[test]
fn test_cli_import_refuses_to_overwrite() {
    let existing = NamedTempFile::new().unwrap();
    let args = import_args(
        InputSource::String("curl https://a.test".to_string()),
        Some(existing.path().to_path_buf()),
    );
    let err = handle_import(&args).unwrap_err();
    assert!(matches!(err, CliError::InvalidArgument(_)));

    let mut forced = args.clone();
    forced.force = true;
    assert!(handle_import(&forced).is_ok());
}

#[test]
fn test_cli_missing_input_file() {
    let missing = InputSource::File(PathBuf::from("/nonexistent/collection.json"));
    assert!(matches!(load_input(&missing), Err(CliError::FileNotFound(_))));
    assert!(matches!(InputSource::from_arg("-"), InputSource::Stdin));
}
