//! SoapUI project importer
//!
//! A project becomes a root collection with one child collection per
//! interface. SOAP interfaces contribute their stored operation calls; REST
//! services contribute one request per stored method request.

use super::{ImportContext, ImportError, ImportOptions, ImportResult, join_url};
use super::wsdl::{Definitions, SoapVersion, soap_envelope};
use crate::formats::FormatId;
use crate::models::{BodyType, Collection, KeyValue, Protocol, Request, RequestBody};
use crate::xml::{self, XmlElement, local};

/// SoapUI project importer
#[derive(Debug, Default)]
pub struct SoapUiImporter;

impl SoapUiImporter {
    pub fn new() -> Self {
        Self
    }

    pub fn can_import(&self, content: &str) -> bool {
        content.contains("soapui-project") && content.contains("eviware.com/soapui")
    }

    pub fn import(&self, content: &str, options: &ImportOptions) -> ImportResult {
        match self.parse(content, options) {
            Ok(ctx) => ctx.finish(),
            Err(e) => ImportResult::failure(Some(FormatId::SoapUi), e),
        }
    }

    fn parse(&self, content: &str, options: &ImportOptions) -> Result<ImportContext, ImportError> {
        let root = xml::parse(content)?;
        if root.local_name() != "soapui-project" {
            return Err(ImportError::InvalidDocument(format!(
                "expected <soapui-project> root, found <{}>",
                root.name
            )));
        }

        let mut ctx = ImportContext::new(FormatId::SoapUi);
        let project = Collection::new(root.attr("name").unwrap_or("SoapUI Project"))
            .with_description(root.child_text("description").map(str::to_string));
        let project_idx = ctx.add_collection(project, None);
        let base_url = options.base_url_or_placeholder();

        for interface in root.children_named("interface") {
            let name = interface.attr("name").unwrap_or("Interface");
            let interface_idx = ctx.add_collection(Collection::new(name), Some(project_idx));
            let kind = interface.attr("type").map(local).unwrap_or_default();
            match kind {
                "RestService" => {
                    import_rest_service(interface, &base_url, &mut ctx, interface_idx)
                }
                "WsdlInterface" | "" => {
                    import_wsdl_interface(interface, &base_url, &mut ctx, interface_idx)
                }
                other => ctx.warn(format!(
                    "Skipped interface {} of unsupported type {}",
                    name, other
                )),
            }
        }
        Ok(ctx)
    }
}

fn first_endpoint(interface: &XmlElement) -> Option<String> {
    interface
        .child("endpoints")
        .and_then(|e| e.child_text("endpoint"))
        .map(str::to_string)
}

fn import_wsdl_interface(
    interface: &XmlElement,
    base_url: &str,
    ctx: &mut ImportContext,
    collection_idx: usize,
) {
    let version = match interface.attr("soapVersion") {
        Some("1_2") => SoapVersion::Soap12,
        _ => SoapVersion::Soap11,
    };
    let endpoint = first_endpoint(interface).unwrap_or_else(|| base_url.to_string());

    // The WSDL is usually cached inside the project
    let cached = interface
        .child("definitionCache")
        .into_iter()
        .flat_map(|cache| cache.children_named("part"))
        .filter_map(|part| part.child_text("content"))
        .filter_map(|text| xml::parse(text).ok())
        .find(|root| root.local_name() == "definitions");
    let definitions = cached.as_ref().and_then(|root| Definitions::new(root).ok());
    let target_namespace = cached
        .as_ref()
        .and_then(|root| root.attr("targetNamespace"))
        .unwrap_or_default();

    for operation in interface.children_named("operation") {
        let name = operation.attr("name").unwrap_or("Operation");
        let action = operation.attr("action").unwrap_or_default();
        let calls: Vec<&XmlElement> = operation.children_named("call").collect();

        if calls.is_empty() {
            let skeleton = format!("<tns:{}/>", name);
            let envelope = definitions
                .as_ref()
                .and_then(|d| d.envelope_for(version, name))
                .unwrap_or_else(|| soap_envelope(version, target_namespace, &skeleton));
            let request = soap_request(name.to_string(), &endpoint, version, action, envelope);
            ctx.add_request(request, Some(collection_idx));
            continue;
        }

        for call in calls {
            let call_name = call.attr("name").unwrap_or("Request");
            let url = call
                .child_text("endpoint")
                .map(str::to_string)
                .unwrap_or_else(|| endpoint.clone());
            let envelope = call
                .child_text("request")
                .map(str::to_string)
                .or_else(|| {
                    definitions
                        .as_ref()
                        .and_then(|d| d.envelope_for(version, name))
                })
                .unwrap_or_default();
            let call_name = format!("{} - {}", name, call_name);
            let request = soap_request(call_name, &url, version, action, envelope);
            ctx.add_request(request, Some(collection_idx));
        }
    }
}

fn soap_request(
    name: String,
    url: &str,
    version: SoapVersion,
    action: &str,
    envelope: String,
) -> Request {
    let mut request = Request::new(name, "POST", url);
    request.protocol = Protocol::Soap;
    version.apply_headers(&mut request, action);
    if !envelope.trim().is_empty() {
        request.body = Some(RequestBody::new(BodyType::Xml, envelope));
    }
    request
}

/// `con:parameters/con:parameter` entries as (name, value, style)
fn declared_parameters(node: &XmlElement) -> Vec<(String, String, String)> {
    node.child("parameters")
        .into_iter()
        .flat_map(|p| p.children_named("parameter"))
        .filter_map(|param| {
            let name = param.child_text("name")?.to_string();
            let value = param
                .child_text("value")
                .or_else(|| param.child_text("default"))
                .unwrap_or_default()
                .to_string();
            let style = param
                .child_text("style")
                .unwrap_or("QUERY")
                .to_ascii_uppercase();
            Some((name, value, style))
        })
        .collect()
}

fn import_rest_service(
    service: &XmlElement,
    base_url: &str,
    ctx: &mut ImportContext,
    collection_idx: usize,
) {
    let endpoint = first_endpoint(service).unwrap_or_else(|| base_url.to_string());
    let base = join_url(&endpoint, service.attr("basePath").unwrap_or_default());
    for resource in service.children_named("resource") {
        walk_resource(resource, &base, &[], ctx, collection_idx);
    }
}

fn walk_resource(
    resource: &XmlElement,
    parent_url: &str,
    inherited: &[(String, String, String)],
    ctx: &mut ImportContext,
    collection_idx: usize,
) {
    let url = join_url(parent_url, resource.attr("path").unwrap_or_default());
    let mut params = inherited.to_vec();
    params.extend(declared_parameters(resource));

    for method in resource.children_named("method") {
        let verb = method.attr("method").unwrap_or("GET");
        let method_name = method.attr("name").unwrap_or(verb);
        let mut method_params = params.clone();
        method_params.extend(declared_parameters(method));

        let stored: Vec<&XmlElement> = method.children_named("request").collect();
        if stored.is_empty() {
            let request = rest_request(method_name.to_string(), verb, &url, &method_params, None);
            ctx.add_request(request, Some(collection_idx));
        }
        for stored_request in stored {
            let name = format!(
                "{} - {}",
                method_name,
                stored_request.attr("name").unwrap_or("Request")
            );
            let request = rest_request(name, verb, &url, &method_params, Some(stored_request));
            ctx.add_request(request, Some(collection_idx));
        }
    }

    for child in resource.children_named("resource") {
        walk_resource(child, &url, &params, ctx, collection_idx);
    }
}

fn rest_request(
    name: String,
    verb: &str,
    url: &str,
    params: &[(String, String, String)],
    stored: Option<&XmlElement>,
) -> Request {
    let mut request = Request::new(name, verb, url);

    // Values stored on the request override declared defaults
    let overrides: Vec<(&str, &str)> = stored
        .and_then(|s| s.child("parameters"))
        .into_iter()
        .flat_map(|p| p.children_named("entry"))
        .filter_map(|entry| {
            let key = entry.attr("key")?;
            Some((key, entry.attr("value").unwrap_or_default()))
        })
        .collect();

    for (name, default, style) in params {
        let value = overrides
            .iter()
            .find(|(key, _)| *key == name.as_str())
            .map(|(_, v)| v.to_string())
            .unwrap_or_else(|| default.clone());
        match style.as_str() {
            "HEADER" => request.headers.push(KeyValue::new(name, value)),
            "TEMPLATE" if !value.is_empty() => {
                request.url = request.url.replace(&format!("{{{}}}", name), &value);
            }
            "QUERY" => request.query_params.push(KeyValue::new(name, value)),
            _ => {}
        }
    }

    if let Some(stored) = stored {
        let body = stored.child_text("request").unwrap_or_default();
        if !body.is_empty() {
            let media = stored.attr("mediaType").unwrap_or("application/json");
            let body_type = match BodyType::from_mime(media) {
                BodyType::UrlEncoded | BodyType::FormData => BodyType::Raw,
                other => other,
            };
            request.body = Some(RequestBody::new(body_type, body));
            request.add_header_if_missing("Content-Type", media);
        }
    }
    request
}
