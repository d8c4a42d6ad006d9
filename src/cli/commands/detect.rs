//! Detect command handler

use crate::cli::commands::import::{InputSource, load_input};
use crate::cli::error::CliError;
use crate::registry::{FormatRegistry, Importer};

/// Print every importer that recognises the input, most specific first.
///
/// Returns the candidates; no candidate is an error.
pub fn handle_detect(input: &InputSource) -> Result<Vec<Importer>, CliError> {
    let content = load_input(input)?;
    let candidates = FormatRegistry::new().candidates(&content);
    if candidates.is_empty() {
        return Err(CliError::UnknownFormat);
    }
    for (rank, importer) in candidates.iter().enumerate() {
        let formats: Vec<&str> = importer.formats().iter().map(|f| f.as_str()).collect();
        let marker = if rank == 0 { "*" } else { " " };
        println!("{} {} ({})", marker, importer.name(), formats.join(", "));
    }
    Ok(candidates)
}
