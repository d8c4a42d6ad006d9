//! Convert command handler

use crate::cli::commands::export::finish_export;
use crate::cli::commands::import::{InputSource, load_input};
use crate::cli::error::CliError;
use crate::export::{ExportOptions, ExportResult};
use crate::formats::FormatId;
use crate::import::ImportOptions;
use crate::registry::FormatRegistry;
use std::path::PathBuf;

/// Arguments for convert operations
#[derive(Debug, Clone)]
pub struct ConvertArgs {
    pub input: InputSource,
    /// Source format; detected when absent
    pub from: Option<FormatId>,
    pub to: FormatId,
    pub import_options: ImportOptions,
    pub export_options: ExportOptions,
    pub output: Option<PathBuf>,
    pub force: bool,
}

/// Import the input and export it in the target format in one step
pub fn handle_convert(args: &ConvertArgs) -> Result<ExportResult, CliError> {
    let content = load_input(&args.input)?;
    let result = FormatRegistry::new().convert(
        &content,
        args.from,
        args.to,
        &args.import_options,
        &args.export_options,
    );
    finish_export(result, args.output.as_ref(), args.force)
}
