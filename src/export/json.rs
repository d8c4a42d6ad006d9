//! Native JSON exporter
//!
//! Writes collections and requests in a versioned envelope that the native
//! JSON importer reads back.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{
    ExportBundle, ExportError, ExportOptions, ExportOutput, ExportResult, exportable_collections,
    exportable_requests, finish, to_json_text,
};
use crate::formats::FormatId;
use crate::models::{Collection, Environment, Request};

/// Envelope version written by this exporter
pub const ENVELOPE_VERSION: &str = "1.0";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a> {
    version: &'static str,
    exported_at: DateTime<Utc>,
    collections: Vec<&'a Collection>,
    requests: Vec<&'a Request>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    environments: Vec<&'a Environment>,
}

/// Native JSON exporter
#[derive(Debug, Default)]
pub struct JsonExporter;

impl JsonExporter {
    pub fn new() -> Self {
        Self
    }

    /// Export a bundle as the native JSON envelope.
    ///
    /// # Example
    ///
    /// ```rust
    /// use api_interchange_sdk::export::{ExportBundle, ExportOptions, JsonExporter};
    /// use api_interchange_sdk::models::Request;
    ///
    /// let bundle = ExportBundle::new(Vec::new(), vec![Request::new("Ping", "GET", "https://a.test/ping")]);
    /// let result = JsonExporter::new().export(&bundle, &ExportOptions::default());
    /// assert!(result.success);
    /// assert!(result.data.unwrap().contains("\"exportedAt\""));
    /// ```
    pub fn export(&self, bundle: &ExportBundle, options: &ExportOptions) -> ExportResult {
        finish(FormatId::Json, self.render(bundle, options))
    }

    fn render(
        &self,
        bundle: &ExportBundle,
        options: &ExportOptions,
    ) -> Result<ExportOutput, ExportError> {
        let mut warnings = Vec::new();
        let collections = exportable_collections(bundle, &mut warnings);
        let requests = exportable_requests(bundle, &mut warnings);
        let environments = if options.include_environments {
            bundle.environments.iter().collect()
        } else {
            Vec::new()
        };

        let envelope = Envelope {
            version: ENVELOPE_VERSION,
            exported_at: Utc::now(),
            collections,
            requests,
            environments,
        };
        let item_count = envelope.requests.len();
        Ok(ExportOutput {
            data: to_json_text(&envelope, options.prettify)?,
            item_count,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Variable, VariableScope};

    #[test]
    fn test_envelope_shape() {
        let collection = Collection::new("Root");
        let mut request = Request::new("Ping", "GET", "https://a.test/ping");
        request.collection_id = Some(collection.id.clone());
        let bundle = ExportBundle::new(vec![collection], vec![request]);

        let result = JsonExporter::new().export(&bundle, &ExportOptions::default());
        assert!(result.success);
        assert_eq!(result.metadata.item_count, 1);
        let data = result.data.unwrap();
        assert_eq!(result.metadata.size, data.len());

        let value: serde_json::Value = serde_json::from_str(&data).unwrap();
        assert_eq!(value["version"], ENVELOPE_VERSION);
        assert_eq!(value["collections"][0]["name"], "Root");
        assert_eq!(value["requests"][0]["method"], "GET");
        assert!(value.get("environments").is_none());
    }

    #[test]
    fn test_environments_follow_options() {
        let host = Variable::new("host", "dev.test", VariableScope::Environment);
        let env = Environment::new("Dev", vec![host]);
        let bundle = ExportBundle::default().with_environments(vec![env]);

        let with = JsonExporter::new().export(&bundle, &ExportOptions::default());
        assert!(with.data.unwrap().contains("\"Dev\""));

        let options = ExportOptions {
            include_environments: false,
            prettify: false,
        };
        let without = JsonExporter::new().export(&bundle, &options);
        let data = without.data.unwrap();
        assert!(!data.contains("\"Dev\""));
        assert!(!data.contains('\n'));
    }
}
