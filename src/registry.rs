//! Format registry
//!
//! A fixed, closed list of importers and exporters. Auto-detection asks each
//! importer in priority order whether it recognises the content; the most
//! specific sniffs come first so that, for example, a Postman export is not
//! claimed by a generic JSON check further down the list.

use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{debug, error, info};

use crate::export::{
    CurlExporter, ExportBundle, ExportError, ExportOptions, ExportResult, HarExporter, JsonExporter,
    PostmanExporter,
};
use crate::formats::FormatId;
use crate::import::{
    ImportError, ImportOptions, ImportResult, api_gateway::ApiGatewayImporter,
    asyncapi::AsyncApiImporter, curl::CurlImporter, graphql::GraphqlImporter, har::HarImporter,
    insomnia::InsomniaImporter, json::JsonImporter, openapi::OpenApiImporter,
    postman::PostmanImporter, protobuf::ProtobufImporter, raml::RamlImporter,
    soapui::SoapUiImporter, wadl::WadlImporter, wsdl::WsdlImporter,
};

/// One importer of the closed set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Importer {
    Json,
    Postman,
    Insomnia,
    Har,
    ApiGateway,
    AsyncApi,
    OpenApi,
    Raml,
    SoapUi,
    Wsdl,
    Wadl,
    Protobuf,
    Graphql,
    Curl,
}

impl Importer {
    /// Auto-detection order
    pub const PRIORITY: [Importer; 14] = [
        Importer::Json,
        Importer::Postman,
        Importer::Insomnia,
        Importer::Har,
        Importer::ApiGateway,
        Importer::AsyncApi,
        Importer::OpenApi,
        Importer::Raml,
        Importer::SoapUi,
        Importer::Wsdl,
        Importer::Wadl,
        Importer::Protobuf,
        Importer::Graphql,
        Importer::Curl,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Importer::Json => "Native JSON",
            Importer::Postman => "Postman",
            Importer::Insomnia => "Insomnia",
            Importer::Har => "HAR",
            Importer::ApiGateway => "API Gateway",
            Importer::AsyncApi => "AsyncAPI",
            Importer::OpenApi => "OpenAPI",
            Importer::Raml => "RAML",
            Importer::SoapUi => "SoapUI",
            Importer::Wsdl => "WSDL",
            Importer::Wadl => "WADL",
            Importer::Protobuf => "Protobuf",
            Importer::Graphql => "GraphQL",
            Importer::Curl => "cURL",
        }
    }

    /// Format identifiers this importer can produce
    pub fn formats(&self) -> &'static [FormatId] {
        match self {
            Importer::Json => &[FormatId::Json],
            Importer::Postman => &[FormatId::PostmanV21],
            Importer::Insomnia => &[FormatId::InsomniaV4],
            Importer::Har => &[FormatId::Har],
            Importer::ApiGateway => &[FormatId::AwsGateway, FormatId::AzureApim],
            Importer::AsyncApi => &[FormatId::AsyncApi20, FormatId::AsyncApi30],
            Importer::OpenApi => &[FormatId::OpenApi30, FormatId::OpenApi31, FormatId::Swagger20],
            Importer::Raml => &[FormatId::Raml10],
            Importer::SoapUi => &[FormatId::SoapUi],
            Importer::Wsdl => &[FormatId::Wsdl11],
            Importer::Wadl => &[FormatId::Wadl],
            Importer::Protobuf => &[FormatId::Protobuf3],
            Importer::Graphql => &[FormatId::GraphqlSchema],
            Importer::Curl => &[FormatId::Curl],
        }
    }

    /// Importer responsible for `format`
    pub fn for_format(format: FormatId) -> Importer {
        match format {
            FormatId::OpenApi30 | FormatId::OpenApi31 | FormatId::Swagger20 => Importer::OpenApi,
            FormatId::PostmanV21 => Importer::Postman,
            FormatId::InsomniaV4 => Importer::Insomnia,
            FormatId::Har => Importer::Har,
            FormatId::Curl => Importer::Curl,
            FormatId::GraphqlSchema => Importer::Graphql,
            FormatId::AsyncApi20 | FormatId::AsyncApi30 => Importer::AsyncApi,
            FormatId::Raml10 => Importer::Raml,
            FormatId::Wadl => Importer::Wadl,
            FormatId::Wsdl11 => Importer::Wsdl,
            FormatId::SoapUi => Importer::SoapUi,
            FormatId::AwsGateway | FormatId::AzureApim => Importer::ApiGateway,
            FormatId::Json => Importer::Json,
            FormatId::Protobuf3 => Importer::Protobuf,
        }
    }

    pub fn can_import(&self, content: &str) -> bool {
        match self {
            Importer::Json => JsonImporter::new().can_import(content),
            Importer::Postman => PostmanImporter::new().can_import(content),
            Importer::Insomnia => InsomniaImporter::new().can_import(content),
            Importer::Har => HarImporter::new().can_import(content),
            Importer::ApiGateway => ApiGatewayImporter::new().can_import(content),
            Importer::AsyncApi => AsyncApiImporter::new().can_import(content),
            Importer::OpenApi => OpenApiImporter::new().can_import(content),
            Importer::Raml => RamlImporter::new().can_import(content),
            Importer::SoapUi => SoapUiImporter::new().can_import(content),
            Importer::Wsdl => WsdlImporter::new().can_import(content),
            Importer::Wadl => WadlImporter::new().can_import(content),
            Importer::Protobuf => ProtobufImporter::new().can_import(content),
            Importer::Graphql => GraphqlImporter::new().can_import(content),
            Importer::Curl => CurlImporter::new().can_import(content),
        }
    }

    pub fn import(&self, content: &str, options: &ImportOptions) -> ImportResult {
        match self {
            Importer::Json => JsonImporter::new().import(content, options),
            Importer::Postman => PostmanImporter::new().import(content, options),
            Importer::Insomnia => InsomniaImporter::new().import(content, options),
            Importer::Har => HarImporter::new().import(content, options),
            Importer::ApiGateway => ApiGatewayImporter::new().import(content, options),
            Importer::AsyncApi => AsyncApiImporter::new().import(content, options),
            Importer::OpenApi => OpenApiImporter::new().import(content, options),
            Importer::Raml => RamlImporter::new().import(content, options),
            Importer::SoapUi => SoapUiImporter::new().import(content, options),
            Importer::Wsdl => WsdlImporter::new().import(content, options),
            Importer::Wadl => WadlImporter::new().import(content, options),
            Importer::Protobuf => ProtobufImporter::new().import(content, options),
            Importer::Graphql => GraphqlImporter::new().import(content, options),
            Importer::Curl => CurlImporter::new().import(content, options),
        }
    }
}

/// One exporter of the closed set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exporter {
    Json,
    Curl,
    Postman,
    Har,
}

impl Exporter {
    pub const ALL: [Exporter; 4] = [
        Exporter::Json,
        Exporter::Curl,
        Exporter::Postman,
        Exporter::Har,
    ];

    /// Exporter writing `format`, if there is one
    pub fn for_format(format: FormatId) -> Option<Exporter> {
        match format {
            FormatId::Json => Some(Exporter::Json),
            FormatId::Curl => Some(Exporter::Curl),
            FormatId::PostmanV21 => Some(Exporter::Postman),
            FormatId::Har => Some(Exporter::Har),
            _ => None,
        }
    }

    pub fn format(&self) -> FormatId {
        match self {
            Exporter::Json => FormatId::Json,
            Exporter::Curl => FormatId::Curl,
            Exporter::Postman => FormatId::PostmanV21,
            Exporter::Har => FormatId::Har,
        }
    }

    pub fn export(&self, bundle: &ExportBundle, options: &ExportOptions) -> ExportResult {
        match self {
            Exporter::Json => JsonExporter::new().export(bundle, options),
            Exporter::Curl => CurlExporter::new().export(bundle, options),
            Exporter::Postman => PostmanExporter::new().export(bundle, options),
            Exporter::Har => HarExporter::new().export(bundle, options),
        }
    }
}

/// Read-only dispatcher over the fixed importer/exporter lists
#[derive(Debug, Clone)]
pub struct FormatRegistry {
    importers: Vec<Importer>,
    exporters: Vec<Exporter>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self {
            importers: Importer::PRIORITY.to_vec(),
            exporters: Exporter::ALL.to_vec(),
        }
    }

    /// First importer, in priority order, that recognises `content`
    pub fn detect(&self, content: &str) -> Option<Importer> {
        self.importers
            .iter()
            .copied()
            .find(|i| i.can_import(content))
    }

    /// Every importer that recognises `content`, in priority order
    pub fn candidates(&self, content: &str) -> Vec<Importer> {
        let matches: Vec<Importer> = self
            .importers
            .iter()
            .copied()
            .filter(|i| i.can_import(content))
            .collect();
        debug!(
            "Detection candidates: {:?}",
            matches.iter().map(Importer::name).collect::<Vec<_>>()
        );
        matches
    }

    pub fn importer_for(&self, format: FormatId) -> Importer {
        Importer::for_format(format)
    }

    pub fn exporter_for(&self, format: FormatId) -> Option<Exporter> {
        Exporter::for_format(format).filter(|e| self.exporters.contains(e))
    }

    /// Formats that can be imported
    pub fn import_formats(&self) -> Vec<FormatId> {
        self.importers
            .iter()
            .flat_map(|i| i.formats().iter().copied())
            .collect()
    }

    /// Formats that can be exported
    pub fn export_formats(&self) -> Vec<FormatId> {
        self.exporters.iter().map(Exporter::format).collect()
    }

    /// Import `content`, auto-detecting the format unless `format` names one
    pub fn import(
        &self,
        content: &str,
        format: Option<FormatId>,
        options: &ImportOptions,
    ) -> ImportResult {
        let (importer, others) = match format {
            Some(format) => {
                debug!("Importing as requested format {}", format);
                (self.importer_for(format), Vec::new())
            }
            None => {
                let mut candidates = self.candidates(content);
                if candidates.is_empty() {
                    return ImportResult::failure(
                        None,
                        ImportError::UnsupportedFormat(
                            "content matches no known format".to_string(),
                        ),
                    );
                }
                let first = candidates.remove(0);
                debug!("Detected {} importer", first.name());
                (first, candidates)
            }
        };

        let mut result = guarded(|| importer.import(content, options)).unwrap_or_else(|message| {
            ImportResult::failure(
                Some(format.unwrap_or(importer.formats()[0])),
                ImportError::Internal(message),
            )
        });
        if result.success && !others.is_empty() {
            let names: Vec<&str> = others.iter().map(Importer::name).collect();
            result.warnings.push(format!(
                "Content was also recognised as {}; imported as {}",
                names.join(", "),
                importer.name()
            ));
        }
        result
    }

    /// Serialize `bundle` as `format`
    pub fn export(
        &self,
        format: FormatId,
        bundle: &ExportBundle,
        options: &ExportOptions,
    ) -> ExportResult {
        let Some(exporter) = self.exporter_for(format) else {
            return ExportResult::failure(format, ExportError::UnsupportedFormat(format));
        };
        guarded(|| exporter.export(bundle, options))
            .unwrap_or_else(|message| ExportResult::failure(format, ExportError::Internal(message)))
    }

    /// Import `content` and immediately export it as `target`.
    ///
    /// Import warnings are carried into the export result. A failed import
    /// yields a failed export carrying the import errors.
    pub fn convert(
        &self,
        content: &str,
        source: Option<FormatId>,
        target: FormatId,
        import_options: &ImportOptions,
        export_options: &ExportOptions,
    ) -> ExportResult {
        let imported = self.import(content, source, import_options);
        if !imported.success {
            let mut failed = ExportResult::failure(target, "import failed");
            failed.errors = imported.errors;
            return failed;
        }
        info!(
            "Converting {} requests from {:?} to {}",
            imported.requests.len(),
            imported.metadata.format,
            target
        );
        let import_warnings = imported.warnings.clone();
        let mut exported = self.export(target, &ExportBundle::from(imported), export_options);
        let mut warnings = import_warnings;
        warnings.append(&mut exported.warnings);
        exported.warnings = warnings;
        exported
    }
}

/// Run a converter, turning a panic into an error message
fn guarded<T>(run: impl FnOnce() -> T) -> Result<T, String> {
    catch_unwind(AssertUnwindSafe(run)).map_err(|panic| {
        let message = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "converter panicked".to_string());
        error!("Converter fault: {}", message);
        message
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_format_has_an_importer() {
        for format in FormatId::ALL {
            assert!(
                Importer::for_format(format).formats().contains(&format),
                "{}",
                format
            );
        }
    }

    #[test]
    fn test_unknown_content_fails_without_format() {
        let result =
            FormatRegistry::new().import("just some words", None, &ImportOptions::default());
        assert!(!result.success);
        assert!(result.metadata.format.is_none());
        assert!(result.errors[0].starts_with("Unsupported format"));
    }

    #[test]
    fn test_unsupported_export_format() {
        let result = FormatRegistry::new().export(
            FormatId::Wadl,
            &ExportBundle::default(),
            &ExportOptions::default(),
        );
        assert!(!result.success);
        assert_eq!(
            result.errors,
            vec!["Unsupported export format: wadl".to_string()]
        );
    }

    #[test]
    fn test_guarded_catches_panics() {
        let outcome: Result<(), String> = guarded(|| panic!("boom"));
        assert_eq!(outcome, Err("boom".to_string()));
    }
}
