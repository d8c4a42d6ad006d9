//! Cloud API gateway importer
//!
//! - AWS API Gateway exports are OpenAPI/Swagger documents carrying
//!   `x-amazon-apigateway-*` extensions; they go through the OpenAPI walker
//!   and gain the integration target in each description.
//! - Azure API Management ARM templates list `service/apis` and
//!   `service/apis/operations` resources; each API becomes a Collection and
//!   each operation a Request.

use serde_json::Value;

use super::openapi::{detect_version, walk_document};
use super::{
    ImportContext, ImportError, ImportOptions, ImportResult, array_field, join_url, parse_document,
    scalar_text, sniff_mapping, str_field, text_field,
};
use crate::formats::FormatId;
use crate::models::{BodyType, Collection, KeyValue, Request, RequestBody};

const AWS_EXTENSION: &str = "x-amazon-apigateway";
const APIM_API: &str = "microsoft.apimanagement/service/apis";
const APIM_OPERATION: &str = "microsoft.apimanagement/service/apis/operations";

/// AWS API Gateway / Azure APIM importer
#[derive(Debug, Default)]
pub struct ApiGatewayImporter;

impl ApiGatewayImporter {
    pub fn new() -> Self {
        Self
    }

    /// Whether the content is an AWS export or an APIM ARM template
    pub fn can_import(&self, content: &str) -> bool {
        if content.contains(AWS_EXTENSION) {
            return sniff_mapping(content).is_some_and(|doc| detect_version(&doc).is_some());
        }
        content.contains("Microsoft.ApiManagement")
            && sniff_mapping(content).is_some_and(|doc| is_apim_template(&doc))
    }

    pub fn import(&self, content: &str, options: &ImportOptions) -> ImportResult {
        match self.parse(content, options) {
            Ok(ctx) => ctx.finish(),
            Err(e) => ImportResult::failure(Some(failure_format(content)), e),
        }
    }

    fn parse(&self, content: &str, options: &ImportOptions) -> Result<ImportContext, ImportError> {
        let doc = parse_document(content)?;

        if is_apim_template(&doc) {
            let mut ctx = ImportContext::new(FormatId::AzureApim);
            import_apim(&doc, options, &mut ctx);
            return Ok(ctx);
        }

        if detect_version(&doc).is_some() {
            let mut ctx = ImportContext::new(FormatId::AwsGateway);
            walk_document(&doc, options, &mut ctx, &describe_integration);
            return Ok(ctx);
        }

        Err(ImportError::InvalidDocument(
            "neither an AWS API Gateway export nor an Azure APIM template".to_string(),
        ))
    }
}

/// Azure when the text names APIM resources, AWS otherwise
fn failure_format(content: &str) -> FormatId {
    if content.contains("Microsoft.ApiManagement") {
        FormatId::AzureApim
    } else {
        FormatId::AwsGateway
    }
}

/// Append the AWS integration target to the request description
fn describe_integration(operation: &Value, request: &mut Request) {
    let Some(integration) = operation.get("x-amazon-apigateway-integration") else {
        return;
    };
    let kind = str_field(integration, "type").unwrap_or("unknown");
    let line = match str_field(integration, "uri") {
        Some(uri) => format!("Integration: {} {}", kind, uri),
        None => format!("Integration: {}", kind),
    };
    request.description = Some(match request.description.take() {
        Some(existing) => format!("{}\n\n{}", existing, line),
        None => line,
    });
}

fn is_apim_template(doc: &Value) -> bool {
    doc.get("resources")
        .and_then(Value::as_array)
        .is_some_and(|resources| resources.iter().any(|r| resource_type(r) == APIM_API))
}

fn resource_type(resource: &Value) -> String {
    str_field(resource, "type")
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Meaningful `/`-separated segments of an ARM resource name.
///
/// Handles plain names (`svc/petstore`) and expressions such as
/// `[concat(parameters('svc'), '/petstore/list')]`.
fn name_segments(name: &str) -> Vec<String> {
    name.split('/')
        .skip(1)
        .map(|s| s.trim_matches(|c: char| matches!(c, '\'' | '"' | ')' | ']' | ' ' | ',')))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn import_apim(doc: &Value, options: &ImportOptions, ctx: &mut ImportContext) {
    let resources = doc
        .get("resources")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    // (api key, collection index, service url)
    let mut apis: Vec<(String, usize, String)> = Vec::new();
    let mut operations: Vec<(Option<String>, &Value)> = Vec::new();

    for resource in resources {
        let kind = resource_type(resource);
        if kind == APIM_API {
            let props = resource.get("properties").cloned().unwrap_or(Value::Null);
            let key = name_segments(str_field(resource, "name").unwrap_or_default())
                .last()
                .cloned()
                .unwrap_or_default();
            let title = text_field(&props, "displayName").unwrap_or_else(|| key.clone());
            let collection =
                Collection::new(title).with_description(text_field(&props, "description"));
            let idx = ctx.add_collection(collection, None);
            let service_url = text_field(&props, "serviceUrl")
                .unwrap_or_else(|| options.base_url_or_placeholder());
            apis.push((key.clone(), idx, service_url));

            for child in resource
                .get("resources")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
            {
                if resource_type(child).ends_with("operations") {
                    operations.push((Some(key.clone()), child));
                }
            }
        } else if kind == APIM_OPERATION {
            let segments = name_segments(str_field(resource, "name").unwrap_or_default());
            let api_key = segments.len().checked_sub(2).map(|i| segments[i].clone());
            operations.push((api_key, resource));
        }
    }

    for (api_key, operation) in operations {
        let owner = api_key
            .as_ref()
            .and_then(|key| apis.iter().find(|(k, _, _)| k == key))
            .or_else(|| (apis.len() == 1).then(|| &apis[0]));
        let Some((_, collection_idx, service_url)) = owner else {
            ctx.warn(format!(
                "Skipped operation {}: no matching API resource",
                str_field(operation, "name").unwrap_or("<unnamed>")
            ));
            continue;
        };
        let request = apim_request(operation, service_url);
        ctx.add_request(request, Some(*collection_idx));
    }
}

fn apim_request(operation: &Value, service_url: &str) -> Request {
    let props = operation.get("properties").cloned().unwrap_or(Value::Null);
    let method = str_field(&props, "method")
        .unwrap_or("GET")
        .to_ascii_uppercase();
    let template = str_field(&props, "urlTemplate").unwrap_or("/");
    let name = text_field(&props, "displayName")
        .or_else(|| name_segments(str_field(operation, "name").unwrap_or_default()).pop())
        .unwrap_or_else(|| format!("{} {}", method, template));

    let mut request = Request::new(name, &method, "");
    request.set_url_lifting_query(&join_url(service_url, template));
    request.description = text_field(&props, "description");

    let spec = props.get("request").cloned().unwrap_or(Value::Null);
    for param in array_field(&spec, "queryParameters") {
        if let Some(name) = str_field(param, "name") {
            request
                .query_params
                .push(KeyValue::new(name, apim_default(param)));
        }
    }
    for header in array_field(&spec, "headers") {
        if let Some(name) = str_field(header, "name") {
            let value = apim_default(header);
            request.headers.push(KeyValue::new(name, value));
        }
    }
    request.add_header_if_missing("Ocp-Apim-Subscription-Key", "{{subscriptionKey}}");

    if let Some(representation) = spec
        .get("representations")
        .and_then(Value::as_array)
        .and_then(|r| r.first())
    {
        let content_type = str_field(representation, "contentType").unwrap_or("application/json");
        let sample = representation
            .get("sample")
            .or_else(|| {
                representation
                    .get("examples")
                    .and_then(Value::as_object)
                    .and_then(|e| e.values().next())
                    .and_then(|e| e.get("value"))
            })
            .cloned();
        if let Some(sample) = sample {
            let body_type = BodyType::from_mime(content_type);
            request.body = Some(RequestBody::from_value(body_type, &sample));
            request.add_header_if_missing("Content-Type", content_type);
        }
    }

    request
}

fn apim_default(param: &Value) -> String {
    param
        .get("defaultValue")
        .or_else(|| array_field(param, "values").first())
        .map(scalar_text)
        .unwrap_or_default()
}
