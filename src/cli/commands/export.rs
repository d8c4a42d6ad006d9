//! Export command handler

use crate::cli::commands::import::{InputSource, load_input};
use crate::cli::error::CliError;
use crate::export::{ExportBundle, ExportOptions, ExportResult};
use crate::formats::FormatId;
use crate::registry::FormatRegistry;
use std::path::{Path, PathBuf};

/// Arguments for export operations
#[derive(Debug, Clone)]
pub struct ExportArgs {
    /// JSON bundle: `{collections, requests, environments}`, an import
    /// result or a native JSON envelope
    pub input: InputSource,
    pub format: FormatId,
    pub options: ExportOptions,
    /// Write to this file instead of stdout
    pub output: Option<PathBuf>,
    pub force: bool,
}

/// Check if file exists and handle overwrite
pub fn check_file_overwrite(output_path: &Path, force: bool) -> Result<(), CliError> {
    if output_path.exists() && !force {
        return Err(CliError::InvalidArgument(format!(
            "Output file exists: {}. Use --force to overwrite.",
            output_path.display()
        )));
    }
    Ok(())
}

/// Write export output to file
pub fn write_export_output(output_path: &PathBuf, content: &str) -> Result<(), CliError> {
    if let Some(parent) = output_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            CliError::FileWriteError(
                output_path.clone(),
                format!("Failed to create directory: {}", e),
            )
        })?;
    }

    std::fs::write(output_path, content)
        .map_err(|e| CliError::FileWriteError(output_path.clone(), e.to_string()))
}

/// Write `content` to `output`, or print it to stdout
pub fn emit(output: Option<&PathBuf>, content: &str, force: bool) -> Result<(), CliError> {
    match output {
        Some(path) => {
            check_file_overwrite(path, force)?;
            write_export_output(path, content)
        }
        None => {
            println!("{}", content);
            Ok(())
        }
    }
}

/// Read an export bundle from JSON text
pub fn parse_bundle(content: &str) -> Result<ExportBundle, CliError> {
    serde_json::from_str(content)
        .map_err(|e| CliError::InvalidArgument(format!("Input is not an export bundle: {}", e)))
}

/// Write a finished export, failing when the exporter reported errors
pub fn finish_export(
    result: ExportResult,
    output: Option<&PathBuf>,
    force: bool,
) -> Result<ExportResult, CliError> {
    for warning in &result.warnings {
        eprintln!("warning: {}", warning);
    }
    let Some(data) = result.data.as_deref().filter(|_| result.success) else {
        return Err(CliError::ExportFailed(result.errors.join("; ")));
    };
    emit(output, data, force)?;
    if let Some(path) = output {
        eprintln!(
            "✅ Exported {} requests as {} to {}",
            result.metadata.item_count,
            result.format,
            path.display()
        );
    }
    Ok(result)
}

/// Handle export command
pub fn handle_export(args: &ExportArgs) -> Result<ExportResult, CliError> {
    let bundle = parse_bundle(&load_input(&args.input)?)?;
    let result = FormatRegistry::new().export(args.format, &bundle, &args.options);
    finish_export(result, args.output.as_ref(), args.force)
}
