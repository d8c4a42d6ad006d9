//! Import command handler

use crate::cli::commands::export::emit;
use crate::cli::error::CliError;
use crate::formats::FormatId;
use crate::import::{ImportOptions, ImportResult};
use crate::registry::FormatRegistry;
use std::io::{self, Read};
use std::path::PathBuf;

/// Input source for import operations
#[derive(Debug, Clone)]
pub enum InputSource {
    File(PathBuf),
    Stdin,
    String(String),
}

impl InputSource {
    /// `-` means stdin, anything else is a file path
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            InputSource::Stdin
        } else {
            InputSource::File(PathBuf::from(arg))
        }
    }
}

/// Arguments for import operations
#[derive(Debug, Clone)]
pub struct ImportArgs {
    pub input: InputSource,
    /// Skip detection and use this format's importer
    pub format: Option<FormatId>,
    pub options: ImportOptions,
    pub pretty: bool,
    /// Write to this file instead of stdout
    pub output: Option<PathBuf>,
    pub force: bool,
}

/// Load input content from InputSource
pub fn load_input(input: &InputSource) -> Result<String, CliError> {
    match input {
        InputSource::File(path) => {
            if !path.exists() {
                return Err(CliError::FileNotFound(path.clone()));
            }
            std::fs::read_to_string(path)
                .map_err(|e| CliError::FileReadError(path.clone(), e.to_string()))
        }
        InputSource::Stdin => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| CliError::IoError(format!("Failed to read stdin: {}", e)))?;
            Ok(buffer)
        }
        InputSource::String(content) => Ok(content.clone()),
    }
}

/// Run an import and emit the `ImportResult` as JSON.
///
/// A result with `success == false` is still written, then reported as an
/// error so the process exits non-zero.
pub fn handle_import(args: &ImportArgs) -> Result<ImportResult, CliError> {
    let content = load_input(&args.input)?;
    let result = FormatRegistry::new().import(&content, args.format, &args.options);

    let serialized = if args.pretty {
        serde_json::to_string_pretty(&result)
    } else {
        serde_json::to_string(&result)
    };
    let json = serialized
        .map_err(|e| CliError::IoError(format!("Failed to serialize import result: {}", e)))?;
    emit(args.output.as_ref(), &json, args.force)?;

    for warning in &result.warnings {
        eprintln!("warning: {}", warning);
    }
    if !result.success {
        return Err(CliError::ImportFailed(result.errors.join("; ")));
    }
    if let Some(output) = &args.output {
        eprintln!(
            "✅ Imported {} requests in {} collections to {}",
            result.requests.len(),
            result.collections.len(),
            output.display()
        );
    }
    Ok(result)
}
