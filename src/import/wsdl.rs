//! WSDL 1.1 importer
//!
//! Resolves `service/port → binding → portType/operation` and emits one SOAP
//! request per bound operation. Request bodies are SOAP envelopes whose
//! payload is a skeleton of the input message element, with `?` standing in
//! for every simple value.

use std::collections::HashSet;

use super::{ImportContext, ImportError, ImportOptions, ImportResult};
use crate::formats::FormatId;
use crate::models::{BodyType, Collection, Protocol, Request, RequestBody};
use crate::schema::MAX_DEPTH;
use crate::xml::{self, XmlElement, local};

const SOAP11_ENVELOPE: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const SOAP12_ENVELOPE: &str = "http://www.w3.org/2003/05/soap-envelope";

/// SOAP protocol version of a binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SoapVersion {
    Soap11,
    Soap12,
}

impl SoapVersion {
    /// Version implied by the namespace of a `soap:binding` element
    fn from_binding_namespace(namespace: &str) -> Option<Self> {
        if namespace.contains("/wsdl/soap12") {
            Some(SoapVersion::Soap12)
        } else if namespace.contains("/wsdl/soap") {
            Some(SoapVersion::Soap11)
        } else {
            None
        }
    }

    fn envelope_namespace(&self) -> &'static str {
        match self {
            SoapVersion::Soap11 => SOAP11_ENVELOPE,
            SoapVersion::Soap12 => SOAP12_ENVELOPE,
        }
    }

    /// Add the content type and action headers this version expects
    pub(crate) fn apply_headers(&self, request: &mut Request, action: &str) {
        match self {
            SoapVersion::Soap11 => {
                request.add_header_if_missing("Content-Type", "text/xml; charset=utf-8");
                request.add_header_if_missing("SOAPAction", action);
            }
            SoapVersion::Soap12 => {
                let content_type = if action.is_empty() {
                    "application/soap+xml; charset=utf-8".to_string()
                } else {
                    format!("application/soap+xml; charset=utf-8; action=\"{}\"", action)
                };
                request.add_header_if_missing("Content-Type", content_type);
            }
        }
    }
}

/// Wrap a payload fragment in a SOAP envelope
pub(crate) fn soap_envelope(version: SoapVersion, target_namespace: &str, payload: &str) -> String {
    let mut out = format!(
        "<soapenv:Envelope xmlns:soapenv=\"{}\"",
        version.envelope_namespace()
    );
    if !target_namespace.is_empty() {
        out.push_str(&format!(" xmlns:tns=\"{}\"", xml::escape(target_namespace)));
    }
    out.push_str(">\n  <soapenv:Header/>\n  <soapenv:Body>\n");
    for line in payload.lines() {
        out.push_str("    ");
        out.push_str(line);
        out.push('\n');
    }
    out.push_str("  </soapenv:Body>\n</soapenv:Envelope>");
    out
}

/// One bound SOAP operation
#[derive(Debug, Clone)]
pub(crate) struct SoapOperation {
    pub name: String,
    pub binding: String,
    pub endpoint: Option<String>,
    pub action: String,
    pub version: SoapVersion,
    pub documentation: Option<String>,
    pub envelope: String,
}

impl SoapOperation {
    pub(crate) fn into_request(self, base_url: &str) -> Request {
        let url = self.endpoint.unwrap_or_else(|| base_url.to_string());
        let mut request = Request::new(self.name, "POST", url);
        request.protocol = Protocol::Soap;
        request.description = self.documentation;
        self.version.apply_headers(&mut request, &self.action);
        request.body = Some(RequestBody::new(BodyType::Xml, self.envelope));
        request
    }
}

/// Lookup view over a parsed `definitions` element
pub(crate) struct Definitions<'a> {
    root: &'a XmlElement,
    target_namespace: String,
    schemas: Vec<&'a XmlElement>,
}

impl<'a> Definitions<'a> {
    pub(crate) fn new(root: &'a XmlElement) -> Result<Self, ImportError> {
        if root.local_name() != "definitions" {
            return Err(ImportError::InvalidDocument(format!(
                "expected WSDL 1.1 <definitions> root, found <{}>",
                root.name
            )));
        }
        let schemas = root
            .children_named("types")
            .flat_map(|types| types.children_named("schema"))
            .collect();
        Ok(Self {
            root,
            target_namespace: root.attr("targetNamespace").unwrap_or_default().to_string(),
            schemas,
        })
    }

    pub(crate) fn name(&self) -> Option<&'a str> {
        self.root.attr("name")
    }

    fn named(&self, kind: &'a str, name: &str) -> Option<&'a XmlElement> {
        let name = local(name);
        self.root
            .children_named(kind)
            .find(|e| e.attr("name") == Some(name))
    }

    /// Operations bound through each service port, grouped by service name.
    ///
    /// Every binding is imported once even when several ports share it.
    pub(crate) fn service_operations(
        &self,
        warnings: &mut Vec<String>,
    ) -> Vec<(String, Vec<SoapOperation>)> {
        let mut seen = HashSet::new();
        let mut services = Vec::new();
        for service in self.root.children_named("service") {
            let service_name = service.attr("name").unwrap_or("Service").to_string();
            let mut operations = Vec::new();
            for port in service.children_named("port") {
                let Some(binding_ref) = port.attr("binding") else {
                    continue;
                };
                let Some(binding) = self.named("binding", binding_ref) else {
                    warnings.push(format!("Skipped port bound to unknown binding {}", binding_ref));
                    continue;
                };
                let Some(version) = self.binding_version(binding) else {
                    tracing::debug!(binding = binding_ref, "skipping non-SOAP binding");
                    continue;
                };
                if !seen.insert(local(binding_ref).to_string()) {
                    continue;
                }
                let endpoint = port
                    .child("address")
                    .and_then(|a| a.attr("location"))
                    .map(str::to_string);
                operations.extend(self.binding_operations(binding, version, endpoint, warnings));
            }
            services.push((service_name, operations));
        }
        services
    }

    /// portType operations when the document declares no service
    pub(crate) fn port_type_operations(&self) -> Vec<SoapOperation> {
        let mut operations = Vec::new();
        for port_type in self.root.children_named("portType") {
            let port_name = port_type.attr("name").unwrap_or_default();
            for operation in port_type.children_named("operation") {
                let name = operation.attr("name").unwrap_or_default();
                operations.push(SoapOperation {
                    name: name.to_string(),
                    binding: port_name.to_string(),
                    endpoint: None,
                    action: String::new(),
                    version: SoapVersion::Soap11,
                    documentation: operation.child_text("documentation").map(str::to_string),
                    envelope: self.envelope(SoapVersion::Soap11, operation),
                });
            }
        }
        operations
    }

    fn binding_version(&self, binding: &XmlElement) -> Option<SoapVersion> {
        let soap_binding = binding
            .children
            .iter()
            .find(|c| c.local_name() == "binding")?;
        let prefix = soap_binding
            .name
            .split_once(':')
            .map(|(p, _)| p)
            .unwrap_or_default();
        let namespace = soap_binding
            .namespace_for(prefix)
            .or_else(|| binding.namespace_for(prefix))
            .or_else(|| self.root.namespace_for(prefix))?;
        SoapVersion::from_binding_namespace(namespace)
    }

    fn binding_operations(
        &self,
        binding: &XmlElement,
        version: SoapVersion,
        endpoint: Option<String>,
        warnings: &mut Vec<String>,
    ) -> Vec<SoapOperation> {
        let binding_name = binding.attr("name").unwrap_or_default();
        let port_type = binding.attr("type").and_then(|t| self.named("portType", t));
        let mut operations = Vec::new();
        for bound in binding.children_named("operation") {
            let Some(name) = bound.attr("name") else {
                continue;
            };
            let abstract_op = port_type.and_then(|pt| {
                pt.children_named("operation")
                    .find(|op| op.attr("name") == Some(name))
            });
            let Some(abstract_op) = abstract_op else {
                warnings.push(format!(
                    "Skipped operation {} in binding {}: not declared by its portType",
                    name, binding_name
                ));
                continue;
            };
            let action = bound
                .child("operation")
                .and_then(|op| op.attr("soapAction"))
                .unwrap_or_default();
            operations.push(SoapOperation {
                name: name.to_string(),
                binding: binding_name.to_string(),
                endpoint: endpoint.clone(),
                action: action.to_string(),
                version,
                documentation: abstract_op
                    .child_text("documentation")
                    .map(str::to_string),
                envelope: self.envelope(version, abstract_op),
            });
        }
        operations
    }

    /// Skeleton envelope for the named portType operation, if declared
    pub(crate) fn envelope_for(&self, version: SoapVersion, operation: &str) -> Option<String> {
        self.root
            .children_named("portType")
            .flat_map(|pt| pt.children_named("operation"))
            .find(|op| op.attr("name") == Some(operation))
            .map(|op| self.envelope(version, op))
    }

    fn envelope(&self, version: SoapVersion, operation: &XmlElement) -> String {
        let name = operation.attr("name").unwrap_or("Operation");
        let message = operation
            .child("input")
            .and_then(|input| input.attr("message"))
            .and_then(|m| self.named("message", m));

        let mut payload = String::new();
        let parts: Vec<&XmlElement> = message
            .map(|m| m.children_named("part").collect())
            .unwrap_or_default();
        let (element_parts, type_parts): (Vec<&XmlElement>, Vec<&XmlElement>) =
            parts.into_iter().partition(|p| p.attr("element").is_some());

        for part in &element_parts {
            let element_name = part.attr("element").unwrap_or_default();
            match self.schema_element(local(element_name)) {
                Some((element, qualified)) => {
                    self.write_element(&mut payload, element, "tns:", qualified, 0, 0)
                }
                None => {
                    let name = local(element_name);
                    payload.push_str(&format!("<tns:{}>?</tns:{}>\n", name, name));
                }
            }
        }
        if !type_parts.is_empty() || element_parts.is_empty() {
            // rpc style: the operation element wraps one child per part
            if type_parts.is_empty() {
                payload.push_str(&format!("<tns:{}/>\n", name));
            } else {
                payload.push_str(&format!("<tns:{}>\n", name));
                for part in type_parts {
                    let part_name = part.attr("name").unwrap_or("part");
                    payload.push_str(&format!("  <{}>?</{}>\n", part_name, part_name));
                }
                payload.push_str(&format!("</tns:{}>\n", name));
            }
        }
        soap_envelope(version, &self.target_namespace, payload.trim_end())
    }

    /// Top-level schema element and whether its children are namespace-qualified
    fn schema_element(&self, name: &str) -> Option<(&'a XmlElement, bool)> {
        self.schemas.iter().find_map(|schema| {
            schema
                .children_named("element")
                .find(|e| e.attr("name") == Some(name))
                .map(|e| (e, schema.attr("elementFormDefault") == Some("qualified")))
        })
    }

    fn complex_type(&self, name: &str) -> Option<&'a XmlElement> {
        self.schemas.iter().find_map(|schema| {
            schema
                .children_named("complexType")
                .find(|t| t.attr("name") == Some(name))
        })
    }

    fn write_element(
        &self,
        out: &mut String,
        element: &'a XmlElement,
        prefix: &str,
        qualified: bool,
        indent: usize,
        depth: usize,
    ) {
        if let Some(reference) = element.attr("ref") {
            if let Some((target, target_qualified)) = self.schema_element(local(reference)) {
                if depth < MAX_DEPTH {
                    self.write_element(out, target, "tns:", target_qualified, indent, depth + 1);
                }
            }
            return;
        }

        let pad = "  ".repeat(indent);
        let tag = format!("{}{}", prefix, element.attr("name").unwrap_or("element"));
        let particles = if depth >= MAX_DEPTH {
            None
        } else {
            self.element_particles(element, depth)
        };
        match particles {
            None => out.push_str(&format!("{}<{}>?</{}>\n", pad, tag, tag)),
            Some(children) if children.is_empty() => out.push_str(&format!("{}<{}/>\n", pad, tag)),
            Some(children) => {
                out.push_str(&format!("{}<{}>\n", pad, tag));
                let child_prefix = if qualified { "tns:" } else { "" };
                for child in children {
                    self.write_element(out, child, child_prefix, qualified, indent + 1, depth + 1);
                }
                out.push_str(&format!("{}</{}>\n", pad, tag));
            }
        }
    }

    /// Child elements of a complex element, `None` for simple content
    fn element_particles(
        &self,
        element: &'a XmlElement,
        depth: usize,
    ) -> Option<Vec<&'a XmlElement>> {
        if let Some(inline) = element.child("complexType") {
            return Some(self.type_particles(inline, depth));
        }
        let type_name = local(element.attr("type")?);
        self.complex_type(type_name)
            .map(|complex| self.type_particles(complex, depth))
    }

    fn type_particles(&self, node: &'a XmlElement, depth: usize) -> Vec<&'a XmlElement> {
        let mut particles = Vec::new();
        if depth > MAX_DEPTH {
            return particles;
        }
        for child in &node.children {
            match child.local_name() {
                "element" => particles.push(child),
                "sequence" | "all" => {
                    particles.extend(self.type_particles(child, depth + 1))
                }
                "choice" => {
                    let first = self.type_particles(child, depth + 1).into_iter().next();
                    particles.extend(first);
                }
                "complexContent" | "extension" | "restriction" => {
                    let base = child.attr("base").and_then(|b| self.complex_type(local(b)));
                    if let Some(base) = base {
                        particles.extend(self.type_particles(base, depth + 1));
                    }
                    particles.extend(self.type_particles(child, depth + 1));
                }
                _ => {}
            }
        }
        particles
    }
}

/// WSDL 1.1 importer
#[derive(Debug, Default)]
pub struct WsdlImporter;

impl WsdlImporter {
    pub fn new() -> Self {
        Self
    }

    pub fn can_import(&self, content: &str) -> bool {
        content.trim_start().starts_with('<')
            && content.contains("definitions")
            && content.contains("schemas.xmlsoap.org/wsdl")
    }

    pub fn import(&self, content: &str, options: &ImportOptions) -> ImportResult {
        match self.parse(content, options) {
            Ok(ctx) => ctx.finish(),
            Err(e) => ImportResult::failure(Some(FormatId::Wsdl11), e),
        }
    }

    fn parse(&self, content: &str, options: &ImportOptions) -> Result<ImportContext, ImportError> {
        let root = xml::parse(content)?;
        let definitions = Definitions::new(&root)?;
        let mut ctx = ImportContext::new(FormatId::Wsdl11);
        let base_url = options.base_url_or_placeholder();

        let mut warnings = Vec::new();
        let services = definitions.service_operations(&mut warnings);
        for warning in warnings {
            ctx.warn(warning);
        }

        if services.is_empty() {
            let name = definitions.name().unwrap_or("SOAP Service");
            let collection_idx = ctx.add_collection(Collection::new(name), None);
            ctx.warn("Document declares no service; requests use the base URL placeholder");
            for operation in definitions.port_type_operations() {
                ctx.add_request(operation.into_request(&base_url), Some(collection_idx));
            }
            return Ok(ctx);
        }

        for (service_name, operations) in services {
            let collection_idx = ctx.add_collection(Collection::new(service_name), None);
            let bindings: HashSet<&str> = operations.iter().map(|o| o.binding.as_str()).collect();
            let qualify = bindings.len() > 1;
            for operation in operations {
                let binding = operation.binding.clone();
                let mut request = operation.into_request(&base_url);
                if qualify {
                    request.name = format!("{} ({})", request.name, binding);
                }
                ctx.add_request(request, Some(collection_idx));
            }
        }
        Ok(ctx)
    }
}
