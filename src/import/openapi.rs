//! OpenAPI importer
//!
//! Imports OpenAPI 3.0/3.1 and Swagger 2.0 documents (YAML or JSON).
//!
//! - One Collection per document, titled `info.title`
//! - Each (path, verb) pair becomes a Request, in document order
//! - Path-level parameters are merged with operation-level ones
//! - Bodies come from media examples, else the schema example generator
//! - Security requirements add placeholder credentials
//!
//! References are resolved within the same document only.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use super::{
    ImportContext, ImportError, ImportOptions, ImportResult, join_url, parse_document,
    scalar_text, sniff_mapping, str_field, text_field,
};
use crate::formats::FormatId;
use crate::models::{BodyType, Collection, KeyValue, Request, RequestBody};
use crate::schema::{generate_example, resolve_ref};
use crate::xml;

/// `openapi`/`swagger` version key, JSON or YAML
static RE_VERSION_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)(?:^|[{,])\s*"?(openapi|swagger)"?\s*:\s*["']?(\d+(?:\.\d+)?)"#)
        .expect("Invalid regex")
});

const METHODS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// OpenAPI / Swagger importer
#[derive(Debug, Default)]
pub struct OpenApiImporter;

impl OpenApiImporter {
    /// Create a new OpenAPI importer
    ///
    /// # Example
    ///
    /// ```rust
    /// use api_interchange_sdk::import::openapi::OpenApiImporter;
    ///
    /// let importer = OpenApiImporter::new();
    /// assert!(importer.can_import("openapi: 3.0.0\npaths: {}\n"));
    /// ```
    pub fn new() -> Self {
        Self
    }

    /// Whether the content declares an `openapi` or `swagger` version
    pub fn can_import(&self, content: &str) -> bool {
        sniff_mapping(content).is_some_and(|doc| detect_version(&doc).is_some())
    }

    /// Import OpenAPI/Swagger content.
    ///
    /// # Example
    ///
    /// ```rust
    /// use api_interchange_sdk::import::{ImportOptions, openapi::OpenApiImporter};
    ///
    /// let doc = r#"{"openapi": "3.0.0", "info": {"title": "Pets"},
    ///   "servers": [{"url": "https://pets.test"}],
    ///   "paths": {"/pets": {"get": {"summary": "List pets"}}}}"#;
    /// let result = OpenApiImporter::new().import(doc, &ImportOptions::default());
    /// assert!(result.success);
    /// assert_eq!(result.requests[0].url, "https://pets.test/pets");
    /// ```
    pub fn import(&self, content: &str, options: &ImportOptions) -> ImportResult {
        match self.parse(content, options) {
            Ok(ctx) => ctx.finish(),
            Err(e) => ImportResult::failure(Some(version_hint(content)), e),
        }
    }

    fn parse(&self, content: &str, options: &ImportOptions) -> Result<ImportContext, ImportError> {
        let doc = parse_document(content)?;
        let format = detect_version(&doc).ok_or_else(|| {
            ImportError::InvalidDocument(
                "missing or unsupported openapi/swagger version".to_string(),
            )
        })?;
        let mut ctx = ImportContext::new(format);
        walk_document(&doc, options, &mut ctx, &|_, _| {});
        Ok(ctx)
    }
}

/// Version of an OpenAPI/Swagger document
pub(crate) fn detect_version(doc: &Value) -> Option<FormatId> {
    if let Some(version) = doc.get("openapi").map(scalar_text) {
        return if version.starts_with("3.1") {
            Some(FormatId::OpenApi31)
        } else if version.starts_with('3') {
            Some(FormatId::OpenApi30)
        } else {
            None
        };
    }
    let version = doc.get("swagger").map(scalar_text)?;
    version.starts_with('2').then_some(FormatId::Swagger20)
}

/// Version read from the raw text, for documents that do not parse
pub(crate) fn version_hint(content: &str) -> FormatId {
    let Some(captures) = RE_VERSION_LINE.captures(content) else {
        return FormatId::OpenApi30;
    };
    match (&captures[1], &captures[2]) {
        ("swagger", _) => FormatId::Swagger20,
        (_, version) if version.starts_with("3.1") => FormatId::OpenApi31,
        _ => FormatId::OpenApi30,
    }
}

/// Walk every path/verb of `doc` into one Collection.
///
/// `decorate` runs on each request after it is built, with the operation
/// object it came from.
pub(crate) fn walk_document(
    doc: &Value,
    options: &ImportOptions,
    ctx: &mut ImportContext,
    decorate: &dyn Fn(&Value, &mut Request),
) {
    let info = doc.get("info").cloned().unwrap_or(Value::Null);
    let title = text_field(&info, "title").unwrap_or_else(|| "Imported API".to_string());
    let collection = Collection::new(title).with_description(text_field(&info, "description"));
    let collection_idx = ctx.add_collection(collection, None);

    let walker = Walker {
        doc,
        swagger: doc.get("swagger").is_some(),
        base_url: base_url(doc, options),
    };

    let Some(paths) = doc.get("paths").and_then(Value::as_object) else {
        ctx.warn("Document declares no paths");
        return;
    };

    for (path, item) in paths {
        let item = match walker.deref(item) {
            Some(item) if item.is_object() => item,
            _ => {
                ctx.warn(format!("Skipped path {}: unresolvable path item", path));
                continue;
            }
        };
        let shared_params = item
            .get("parameters")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for (method, operation) in item.as_object().into_iter().flatten() {
            if !METHODS.contains(&method.to_ascii_lowercase().as_str()) {
                continue;
            }
            if !operation.is_object() {
                ctx.warn(format!(
                    "Skipped {} {}: operation is not an object",
                    method.to_ascii_uppercase(),
                    path
                ));
                continue;
            }
            let mut request = walker.build_request(path, method, operation, shared_params, ctx);
            decorate(operation, &mut request);
            ctx.add_request(request, Some(collection_idx));
        }
    }
}

/// Resolve the document base URL: `servers[0]` (OAS3) or
/// `scheme://host + basePath` (Swagger), else the configured placeholder.
fn base_url(doc: &Value, options: &ImportOptions) -> String {
    if let Some(host) = str_field(doc, "host") {
        let scheme = doc
            .get("schemes")
            .and_then(Value::as_array)
            .and_then(|s| s.first())
            .and_then(Value::as_str)
            .unwrap_or("https");
        let base_path = str_field(doc, "basePath").unwrap_or_default();
        return join_url(&format!("{}://{}", scheme, host), base_path);
    }
    if doc.get("swagger").is_some() {
        let base_path = str_field(doc, "basePath").unwrap_or_default();
        return join_url(&options.base_url_or_placeholder(), base_path);
    }

    let Some(server) = doc
        .get("servers")
        .and_then(Value::as_array)
        .and_then(|servers| servers.first())
    else {
        return options.base_url_or_placeholder();
    };
    let mut url = str_field(server, "url").unwrap_or_default().to_string();
    if let Some(variables) = server.get("variables").and_then(Value::as_object) {
        for (name, variable) in variables {
            let default = variable.get("default").map(scalar_text).unwrap_or_default();
            url = url.replace(&format!("{{{}}}", name), &default);
        }
    }
    if url.is_empty() || url.starts_with('/') {
        return join_url(&options.base_url_or_placeholder(), &url);
    }
    url.trim_end_matches('/').to_string()
}

struct Walker<'a> {
    doc: &'a Value,
    swagger: bool,
    base_url: String,
}

impl<'a> Walker<'a> {
    /// Follow a local `$ref`, returning the node itself when it has none
    fn deref<'b>(&self, node: &'b Value) -> Option<&'b Value>
    where
        'a: 'b,
    {
        match node.get("$ref").and_then(Value::as_str) {
            Some(reference) => resolve_ref(self.doc, reference),
            None => Some(node),
        }
    }

    fn build_request(
        &self,
        path: &str,
        method: &str,
        operation: &Value,
        shared_params: &[Value],
        ctx: &mut ImportContext,
    ) -> Request {
        let method_upper = method.to_ascii_uppercase();
        let name = text_field(operation, "summary")
            .or_else(|| text_field(operation, "operationId"))
            .unwrap_or_else(|| format!("{} {}", method_upper, path));

        let mut request = Request::new(name, &method_upper, join_url(&self.base_url, path));
        request.description = text_field(operation, "description");

        let params = self.merged_parameters(path, &method_upper, operation, shared_params, ctx);
        let mut cookies = Vec::new();
        let mut form_params = Vec::new();

        for param in &params {
            let Some(param_name) = str_field(param, "name") else {
                continue;
            };
            let location = str_field(param, "in").unwrap_or_default();
            match location {
                "query" => request
                    .query_params
                    .push(KeyValue::new(param_name, parameter_value(param))),
                "header" => request
                    .headers
                    .push(KeyValue::new(param_name, parameter_value(param))),
                "cookie" => cookies.push(format!("{}={}", param_name, parameter_value(param))),
                "body" => {
                    let schema = param.get("schema").cloned().unwrap_or(Value::Null);
                    let example = generate_example(&schema, self.doc, 0);
                    request.body = Some(RequestBody::from_value(BodyType::Json, &example));
                }
                "formData" => form_params.push(KeyValue::new(param_name, parameter_value(param))),
                _ => {}
            }
        }

        if !cookies.is_empty() {
            let cookie = cookies.join("; ");
            request.headers.push(KeyValue::new("Cookie", cookie));
        }

        if self.swagger {
            let consumes = self.consumes(operation);
            if !form_params.is_empty() {
                let multipart = consumes.iter().any(|c| c.starts_with("multipart/"));
                let body_type = if multipart {
                    BodyType::FormData
                } else {
                    BodyType::UrlEncoded
                };
                request.body = Some(RequestBody::from_pairs(body_type, &form_params));
            }
            if let Some(body) = &request.body {
                let content_type = consumes
                    .first()
                    .cloned()
                    .or_else(|| body.body_type.content_type().map(str::to_string));
                if let Some(content_type) = content_type {
                    request.add_header_if_missing("Content-Type", content_type);
                }
            }
        } else if let Some(request_body) = operation.get("requestBody") {
            match self.deref(request_body) {
                Some(resolved) => self.apply_request_body(&mut request, resolved),
                None => ctx.warn(format!(
                    "{} {}: unresolvable requestBody reference",
                    method_upper, path
                )),
            }
        }

        self.apply_security(&mut request, operation);
        request
    }

    /// Path-level then operation-level parameters, operation winning on `(name, in)`
    fn merged_parameters(
        &self,
        path: &str,
        method: &str,
        operation: &Value,
        shared: &[Value],
        ctx: &mut ImportContext,
    ) -> Vec<Value> {
        let own = operation
            .get("parameters")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut merged: Vec<Value> = Vec::new();
        for raw in shared.iter().chain(own) {
            let Some(param) = self.deref(raw) else {
                ctx.warn(format!(
                    "{} {}: unresolvable parameter reference {}",
                    method,
                    path,
                    str_field(raw, "$ref").unwrap_or_default()
                ));
                continue;
            };
            let key = (str_field(param, "name"), str_field(param, "in"));
            merged.retain(|existing| {
                (str_field(existing, "name"), str_field(existing, "in")) != key
            });
            merged.push(param.clone());
        }
        merged
    }

    fn consumes(&self, operation: &Value) -> Vec<String> {
        operation
            .get("consumes")
            .or_else(|| self.doc.get("consumes"))
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn apply_request_body(&self, request: &mut Request, request_body: &Value) {
        let Some(content) = request_body.get("content").and_then(Value::as_object) else {
            return;
        };
        let chosen = content
            .iter()
            .find(|(mime, _)| BodyType::from_mime(mime) == BodyType::Json)
            .or_else(|| content.iter().next());
        let Some((mime, media)) = chosen else {
            return;
        };

        let body_type = BodyType::from_mime(mime);
        let example = self.media_example(media);
        debug!(
            "Request body {} for {} {}",
            mime, request.method, request.url
        );

        let body = match body_type {
            BodyType::UrlEncoded | BodyType::FormData => {
                RequestBody::from_pairs(body_type, &object_pairs(&example))
            }
            BodyType::Xml => match &example {
                Value::String(text) => RequestBody::new(BodyType::Xml, text.clone()),
                other => {
                    let root = media
                        .get("schema")
                        .and_then(|s| self.xml_root_name(s))
                        .unwrap_or_else(|| "root".to_string());
                    RequestBody::new(BodyType::Xml, xml::render_value(&root, other))
                }
            },
            BodyType::Json => RequestBody::from_value(BodyType::Json, &example),
            _ => match &example {
                Value::Null => RequestBody::new(body_type, ""),
                other => RequestBody::from_value(body_type, other),
            },
        };
        request.body = Some(body);
        request.add_header_if_missing("Content-Type", mime.as_str());
    }

    /// Media `example`, then the first `examples` value, else generated
    fn media_example(&self, media: &Value) -> Value {
        if let Some(example) = media.get("example") {
            return example.clone();
        }
        let first_example = media
            .get("examples")
            .and_then(Value::as_object)
            .and_then(|examples| examples.values().next())
            .and_then(|example| self.deref(example))
            .and_then(|example| example.get("value"));
        if let Some(value) = first_example {
            return value.clone();
        }
        media
            .get("schema")
            .map(|schema| generate_example(schema, self.doc, 0))
            .unwrap_or(Value::Null)
    }

    fn xml_root_name(&self, schema: &Value) -> Option<String> {
        if let Some(name) = schema.get("xml").and_then(|x| str_field(x, "name")) {
            return Some(name.to_string());
        }
        str_field(schema, "$ref")
            .and_then(|r| r.rsplit('/').next())
            .map(str::to_string)
    }

    fn apply_security(&self, request: &mut Request, operation: &Value) {
        let requirements = operation
            .get("security")
            .or_else(|| self.doc.get("security"))
            .and_then(Value::as_array);
        let first = requirements.and_then(|r| r.first());
        let Some(requirement) = first.and_then(Value::as_object) else {
            return;
        };

        let schemes = if self.swagger {
            self.doc.get("securityDefinitions")
        } else {
            self.doc
                .get("components")
                .and_then(|c| c.get("securitySchemes"))
        };

        for scheme_name in requirement.keys() {
            let Some(scheme) = schemes
                .and_then(|s| s.get(scheme_name))
                .and_then(|s| self.deref(s))
            else {
                debug!("Unknown security scheme {}", scheme_name);
                continue;
            };
            apply_scheme(request, scheme);
        }
    }
}

fn apply_scheme(request: &mut Request, scheme: &Value) {
    let scheme_type = str_field(scheme, "type").unwrap_or_default();
    match scheme_type {
        "apiKey" => {
            let name = str_field(scheme, "name").unwrap_or("X-API-Key");
            match str_field(scheme, "in").unwrap_or("header") {
                "query" => {
                    if !request.query_params.iter().any(|p| p.key == name) {
                        request.query_params.push(KeyValue::new(name, "{{apiKey}}"));
                    }
                }
                "cookie" => {
                    request.add_header_if_missing("Cookie", format!("{}={{{{apiKey}}}}", name))
                }
                _ => request.add_header_if_missing(name, "{{apiKey}}"),
            }
        }
        "http" => {
            let http_scheme = str_field(scheme, "scheme").unwrap_or_default();
            if http_scheme.eq_ignore_ascii_case("basic") {
                request.add_header_if_missing("Authorization", "Basic {{credentials}}");
            } else if http_scheme.eq_ignore_ascii_case("bearer") {
                request.add_header_if_missing("Authorization", "Bearer {{token}}");
            }
        }
        "basic" => request.add_header_if_missing("Authorization", "Basic {{credentials}}"),
        "oauth2" | "openIdConnect" => {
            request.add_header_if_missing("Authorization", "Bearer {{token}}")
        }
        other => debug!("Unsupported security scheme type {}", other),
    }
}

/// Example value for a query/header parameter
fn parameter_value(param: &Value) -> String {
    let candidates = [
        param.get("example"),
        param
            .get("examples")
            .and_then(Value::as_object)
            .and_then(|e| e.values().next())
            .and_then(|e| e.get("value")),
        param.get("schema").and_then(|s| s.get("example")),
        param.get("default"),
        param.get("schema").and_then(|s| s.get("default")),
    ];
    candidates
        .into_iter()
        .flatten()
        .next()
        .map(scalar_text)
        .unwrap_or_default()
}

/// Flatten a generated object into form pairs
fn object_pairs(example: &Value) -> Vec<KeyValue> {
    example
        .as_object()
        .map(|fields: &Map<String, Value>| {
            fields
                .iter()
                .map(|(key, value)| KeyValue::new(key, scalar_text(value)))
                .collect()
        })
        .unwrap_or_default()
}
