//! Export functionality
//!
//! Provides exporters from the canonical model into:
//! - the native JSON envelope
//! - cURL commands
//! - Postman Collection v2.1
//! - HAR 1.2
//!
//! Like importers, exporters always return an [`ExportResult`]; invalid
//! entities are dropped with a warning instead of failing the export.

pub mod curl;
pub mod har;
pub mod json;
pub mod postman;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::formats::FormatId;
use crate::import::ImportResult;
use crate::models::{Collection, Environment, Request};

pub use curl::CurlExporter;
pub use har::HarExporter;
pub use json::JsonExporter;
pub use postman::PostmanExporter;

/// Result of an export operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[must_use = "export results contain the exported content and should be used"]
pub struct ExportResult {
    pub success: bool,
    /// Serialized document, absent on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    pub format: FormatId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub metadata: ExportMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub exported_at: DateTime<Utc>,
    /// Number of requests written
    pub item_count: usize,
    /// Byte length of `data`
    pub size: usize,
}

impl ExportResult {
    /// Failed export carrying one error message
    pub fn failure(format: FormatId, error: impl ToString) -> Self {
        let message = error.to_string();
        warn!("Export to {} failed: {}", format, message);
        ExportResult {
            success: false,
            data: None,
            format,
            errors: vec![message],
            warnings: Vec::new(),
            metadata: ExportMetadata {
                exported_at: Utc::now(),
                item_count: 0,
                size: 0,
            },
        }
    }
}

/// Error during export
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(FormatId),
    #[error("Nothing to export: {0}")]
    EmptyBundle(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        ExportError::SerializationError(err.to_string())
    }
}

/// Exporter options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportOptions {
    /// Pretty-print structured output
    pub prettify: bool,
    /// Write environments for formats that can hold them
    pub include_environments: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            prettify: true,
            include_environments: true,
        }
    }
}

/// Entities handed to an exporter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportBundle {
    pub collections: Vec<Collection>,
    pub requests: Vec<Request>,
    pub environments: Vec<Environment>,
}

impl ExportBundle {
    pub fn new(collections: Vec<Collection>, requests: Vec<Request>) -> Self {
        Self {
            collections,
            requests,
            environments: Vec::new(),
        }
    }

    pub fn with_environments(mut self, environments: Vec<Environment>) -> Self {
        self.environments = environments;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty() && self.requests.is_empty() && self.environments.is_empty()
    }
}

impl From<ImportResult> for ExportBundle {
    fn from(result: ImportResult) -> Self {
        Self {
            collections: result.collections,
            requests: result.requests,
            environments: result.environments,
        }
    }
}

impl From<&ImportResult> for ExportBundle {
    fn from(result: &ImportResult) -> Self {
        Self {
            collections: result.collections.clone(),
            requests: result.requests.clone(),
            environments: result.environments.clone(),
        }
    }
}

/// Serialized output of one exporter run
#[derive(Debug)]
pub(crate) struct ExportOutput {
    pub data: String,
    pub item_count: usize,
    pub warnings: Vec<String>,
}

impl ExportOutput {
    pub(crate) fn into_result(self, format: FormatId) -> ExportResult {
        info!(
            "Exported {} requests as {} ({} bytes, {} warnings)",
            self.item_count,
            format,
            self.data.len(),
            self.warnings.len()
        );
        ExportResult {
            success: true,
            format,
            errors: Vec::new(),
            metadata: ExportMetadata {
                exported_at: Utc::now(),
                item_count: self.item_count,
                size: self.data.len(),
            },
            data: Some(self.data),
            warnings: self.warnings,
        }
    }
}

/// Turn an exporter's internal result into the public result type
pub(crate) fn finish(format: FormatId, output: Result<ExportOutput, ExportError>) -> ExportResult {
    match output {
        Ok(output) => output.into_result(format),
        Err(e) => ExportResult::failure(format, e),
    }
}

/// Requests that can be exported; the rest are reported in `warnings`
pub(crate) fn exportable_requests<'a>(
    bundle: &'a ExportBundle,
    warnings: &mut Vec<String>,
) -> Vec<&'a Request> {
    bundle
        .requests
        .iter()
        .filter(|request| {
            let valid = request.is_valid();
            if !valid {
                let message = format!("Skipped request '{}': missing method or URL", request.name);
                warn!("{}", message);
                warnings.push(message);
            }
            valid
        })
        .collect()
}

/// Collections that can be exported; the rest are reported in `warnings`
pub(crate) fn exportable_collections<'a>(
    bundle: &'a ExportBundle,
    warnings: &mut Vec<String>,
) -> Vec<&'a Collection> {
    bundle
        .collections
        .iter()
        .filter(|collection| {
            let valid = !collection.name.trim().is_empty();
            if !valid {
                let message = format!("Skipped collection {}: missing name", collection.id);
                warn!("{}", message);
                warnings.push(message);
            }
            valid
        })
        .collect()
}

pub(crate) fn to_json_text<T: Serialize>(value: &T, prettify: bool) -> Result<String, ExportError> {
    let text = if prettify {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(text)
}
