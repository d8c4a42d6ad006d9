//! Import functionality
//!
//! Provides converters from external API description formats into the
//! canonical model:
//! - OpenAPI 3.x / Swagger 2.0
//! - AsyncAPI 2.x / 3.0
//! - GraphQL SDL
//! - Protobuf service definitions
//! - RAML 1.0, WADL, WSDL 1.1, SoapUI projects
//! - Postman, Insomnia and HAR exports
//! - AWS API Gateway and Azure API Management exports
//! - cURL commands and the native JSON envelope
//!
//! Every importer returns an [`ImportResult`] and never panics or returns
//! `Err` across its `import` boundary.

pub mod api_gateway;
pub mod asyncapi;
pub mod curl;
pub mod graphql;
pub mod har;
pub mod insomnia;
pub mod json;
pub mod openapi;
pub mod postman;
pub mod protobuf;
pub mod raml;
pub mod soapui;
pub mod wadl;
pub mod wsdl;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use tracing::{info, warn};

use crate::formats::FormatId;
use crate::models::{Collection, Environment, Request, Variable};
use crate::xml::XmlError;

/// Base URL used when a document does not declare one
pub const BASE_URL_PLACEHOLDER: &str = "{{baseUrl}}";

/// Result of an import operation.
///
/// `success == false` means the document could not be parsed as claimed;
/// in that case no entities are returned. Problems with individual
/// operations are reported in `warnings` on an otherwise successful result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[must_use = "import results should be processed or errors checked"]
pub struct ImportResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collections: Vec<Collection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requests: Vec<Request>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environments: Vec<Environment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<Variable>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub metadata: ImportMetadata,
}

/// Provenance of an import
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportMetadata {
    /// Detected or requested format; `None` when nothing recognised the content
    pub format: Option<FormatId>,
    /// Number of requests returned
    pub item_count: usize,
    pub imported_at: DateTime<Utc>,
}

impl ImportResult {
    /// Tier-1 failure: no entities, one error message
    pub fn failure(format: Option<FormatId>, error: impl ToString) -> Self {
        let message = error.to_string();
        warn!("Import failed ({:?}): {}", format, message);
        ImportResult {
            success: false,
            collections: Vec::new(),
            requests: Vec::new(),
            environments: Vec::new(),
            variables: Vec::new(),
            errors: vec![message],
            warnings: Vec::new(),
            metadata: ImportMetadata {
                format,
                item_count: 0,
                imported_at: Utc::now(),
            },
        }
    }
}

/// Error during import
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    #[error("XML error: {0}")]
    Xml(#[from] XmlError),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for ImportError {
    fn from(err: anyhow::Error) -> Self {
        ImportError::ParseError(format!("{:#}", err))
    }
}

/// Options accepted by every importer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportOptions {
    /// Emit environments for formats that carry them
    pub include_environments: bool,
    /// Emit variables for formats that carry them
    pub include_variables: bool,
    /// Replaces the `{{baseUrl}}` placeholder for documents without a base URL
    pub base_url: Option<String>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            include_environments: true,
            include_variables: true,
            base_url: None,
        }
    }
}

impl ImportOptions {
    /// Configured base URL, or the `{{baseUrl}}` placeholder
    pub fn base_url_or_placeholder(&self) -> String {
        self.base_url
            .as_deref()
            .map(|u| u.trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| BASE_URL_PLACEHOLDER.to_string())
    }
}

/// Entities accumulated during one import run
#[derive(Debug)]
pub(crate) struct ImportContext {
    pub format: FormatId,
    pub collections: Vec<Collection>,
    pub requests: Vec<Request>,
    pub environments: Vec<Environment>,
    pub variables: Vec<Variable>,
    pub warnings: Vec<String>,
}

impl ImportContext {
    pub fn new(format: FormatId) -> Self {
        Self {
            format,
            collections: Vec::new(),
            requests: Vec::new(),
            environments: Vec::new(),
            variables: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Record a skipped operation
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}: {}", self.format, message);
        self.warnings.push(message);
    }

    /// Add a collection, linking it under `parent` when given. Returns its index.
    pub fn add_collection(&mut self, collection: Collection, parent: Option<usize>) -> usize {
        if let Some(parent) = parent.and_then(|idx| self.collections.get_mut(idx)) {
            parent.folders.push(collection.id.clone());
        }
        self.collections.push(collection);
        self.collections.len() - 1
    }

    /// Add a request, attaching it to the collection at `collection` when given
    pub fn add_request(&mut self, mut request: Request, collection: Option<usize>) {
        if let Some(owner) = collection.and_then(|idx| self.collections.get_mut(idx)) {
            request.collection_id = Some(owner.id.clone());
            owner.requests.push(request.id.clone());
        }
        self.requests.push(request);
    }

    /// Drop requests without method or URL and build the result
    pub fn finish(mut self) -> ImportResult {
        let (valid, invalid): (Vec<Request>, Vec<Request>) = std::mem::take(&mut self.requests)
            .into_iter()
            .partition(Request::is_valid);

        for dropped in &invalid {
            for collection in &mut self.collections {
                collection.requests.retain(|id| id != &dropped.id);
            }
            self.warn(format!(
                "Skipped request '{}': missing method or URL",
                dropped.name
            ));
        }

        info!(
            "Imported {} document: {} collections, {} requests, {} environments, {} warnings",
            self.format,
            self.collections.len(),
            valid.len(),
            self.environments.len(),
            self.warnings.len()
        );

        ImportResult {
            success: true,
            metadata: ImportMetadata {
                format: Some(self.format),
                item_count: valid.len(),
                imported_at: Utc::now(),
            },
            collections: self.collections,
            requests: valid,
            environments: self.environments,
            variables: self.variables,
            errors: Vec::new(),
            warnings: self.warnings,
        }
    }
}

/// Parse a JSON or YAML document into a JSON value.
///
/// JSON is tried first; YAML mapping keys that are not strings are
/// stringified (`200:` becomes `"200"`).
pub(crate) fn parse_document(content: &str) -> Result<Value, ImportError> {
    let trimmed = content.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        return Err(ImportError::ParseError("Empty document".to_string()));
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => Ok(value),
        Err(json_err) => match serde_yaml::from_str::<serde_yaml::Value>(trimmed) {
            Ok(yaml) => Ok(yaml_to_json(yaml)),
            Err(yaml_err) => {
                if trimmed.starts_with('{') || trimmed.starts_with('[') {
                    Err(ImportError::ParseError(format!("Invalid JSON: {}", json_err)))
                } else {
                    Err(ImportError::ParseError(format!("Invalid YAML: {}", yaml_err)))
                }
            }
        },
    }
}

/// Parse a document that must be JSON
pub(crate) fn parse_json_document(content: &str) -> Result<Value, ImportError> {
    let trimmed = content.trim_start_matches('\u{feff}').trim();
    serde_json::from_str(trimmed)
        .map_err(|e| ImportError::ParseError(format!("Invalid JSON: {}", e)))
}

/// Cheap structural sniff: parse and check the top level is a mapping
pub(crate) fn sniff_mapping(content: &str) -> Option<Value> {
    parse_document(content).ok().filter(Value::is_object)
}

fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Value::Number(u.into())
            } else {
                n.as_f64()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => {
            Value::Array(items.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => {
            let mut object = Map::new();
            for (key, value) in mapping {
                object.insert(yaml_key(key), yaml_to_json(value));
            }
            Value::Object(object)
        }
        serde_yaml::Value::Tagged(tagged) => {
            let tagged = *tagged;
            yaml_to_json(tagged.value)
        }
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Null => "null".to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

/// Join a base URL and a path with exactly one slash between them
pub(crate) fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim();
    if path.is_empty() || path == "/" {
        return if base.is_empty() {
            "/".to_string()
        } else {
            base.to_string()
        };
    }
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// String field of a JSON object
pub(crate) fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// Boolean field of a JSON object
pub(crate) fn bool_field(value: &Value, key: &str) -> Option<bool> {
    value.get(key).and_then(Value::as_bool)
}

/// Elements of an array field; empty when absent or not an array
pub(crate) fn array_field<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Entries of an object field; empty when absent or not an object
pub(crate) fn object_entries<'a>(
    value: &'a Value,
    key: &str,
) -> impl Iterator<Item = (&'a String, &'a Value)> {
    value
        .get(key)
        .and_then(Value::as_object)
        .into_iter()
        .flatten()
}

/// Non-blank string field, owned
pub(crate) fn text_field(value: &Value, key: &str) -> Option<String> {
    str_field(value, key)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Render a scalar JSON value as plain text (`Null` → empty)
pub(crate) fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub use api_gateway::ApiGatewayImporter;
pub use asyncapi::AsyncApiImporter;
pub use curl::CurlImporter;
pub use graphql::GraphqlImporter;
pub use har::HarImporter;
pub use insomnia::InsomniaImporter;
pub use json::JsonImporter;
pub use openapi::OpenApiImporter;
pub use postman::PostmanImporter;
pub use protobuf::ProtobufImporter;
pub use raml::RamlImporter;
pub use soapui::SoapUiImporter;
pub use wadl::WadlImporter;
pub use wsdl::WsdlImporter;
