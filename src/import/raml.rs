//! RAML importer
//!
//! Walks RAML 1.0 resources (`/path` keys, nested) and their methods. Body
//! examples come from the document when present; otherwise RAML type
//! declarations are converted to JSON-Schema-like nodes and fed to the
//! schema example generator, with named types reachable through `$ref`.

use serde_json::{Map, Value, json};

use super::{
    ImportContext, ImportError, ImportOptions, ImportResult, array_field, join_url, object_entries,
    parse_document, scalar_text, text_field,
};
use crate::formats::FormatId;
use crate::models::{BodyType, Collection, KeyValue, Request, RequestBody};
use crate::schema::generate_example;

const METHODS: &[&str] = &["get", "post", "put", "patch", "delete", "head", "options"];

/// RAML importer
#[derive(Debug, Default)]
pub struct RamlImporter;

impl RamlImporter {
    pub fn new() -> Self {
        Self
    }

    /// RAML documents must start with the `#%RAML` header
    pub fn can_import(&self, content: &str) -> bool {
        content
            .trim_start_matches('\u{feff}')
            .trim_start()
            .starts_with("#%RAML")
    }

    pub fn import(&self, content: &str, options: &ImportOptions) -> ImportResult {
        match self.parse(content, options) {
            Ok(ctx) => ctx.finish(),
            Err(e) => ImportResult::failure(Some(FormatId::Raml10), e),
        }
    }

    fn parse(&self, content: &str, options: &ImportOptions) -> Result<ImportContext, ImportError> {
        if !self.can_import(content) {
            return Err(ImportError::InvalidDocument("missing #%RAML header".to_string()));
        }
        let doc = parse_document(content)?;
        if !doc.is_object() {
            return Err(ImportError::InvalidDocument(
                "RAML root must be a mapping".to_string(),
            ));
        }

        let mut ctx = ImportContext::new(FormatId::Raml10);
        let title = text_field(&doc, "title").unwrap_or_else(|| "RAML API".to_string());
        let description = text_field(&doc, "description");
        let root = Collection::new(title).with_description(description);
        let collection_idx = ctx.add_collection(root, None);

        let walker = Walker {
            doc: &doc,
            base_url: base_uri(&doc, options),
            default_media_type: default_media_type(&doc),
            schema_root: schema_root(&doc),
        };

        let mut found = false;
        for (key, resource) in doc.as_object().into_iter().flatten() {
            if key.starts_with('/') {
                found = true;
                walker.walk_resource(key, resource, &mut ctx, collection_idx);
            }
        }
        if !found {
            ctx.warn("Document declares no resources");
        }
        Ok(ctx)
    }
}

fn base_uri(doc: &Value, options: &ImportOptions) -> String {
    let Some(mut uri) = text_field(doc, "baseUri") else {
        return options.base_url_or_placeholder();
    };
    if let Some(version) = doc.get("version") {
        uri = uri.replace("{version}", &scalar_text(version));
    }
    if let Some(params) = doc.get("baseUriParameters").and_then(Value::as_object) {
        for (name, param) in params {
            let value = param_value(param);
            if !value.is_empty() {
                uri = uri.replace(&format!("{{{}}}", name), &value);
            }
        }
    }
    uri.trim_end_matches('/').to_string()
}

fn default_media_type(doc: &Value) -> String {
    match doc.get("mediaType") {
        Some(Value::String(media)) => media.clone(),
        Some(Value::Array(list)) => list
            .first()
            .and_then(Value::as_str)
            .unwrap_or("application/json")
            .to_string(),
        _ => "application/json".to_string(),
    }
}

/// Converted named types, addressable as `#/types/<Name>`
fn schema_root(doc: &Value) -> Value {
    let mut types = Map::new();
    for key in ["types", "schemas"] {
        if let Some(declared) = doc.get(key).and_then(Value::as_object) {
            for (name, declaration) in declared {
                types.insert(name.clone(), raml_to_schema(declaration));
            }
        }
    }
    json!({ "types": types })
}

/// Convert a RAML type declaration (expression string or node) into a
/// JSON-Schema-like node
fn raml_to_schema(declaration: &Value) -> Value {
    match declaration {
        Value::String(expression) => type_expression(expression),
        Value::Object(node) => {
            let mut schema = match node.get("properties").and_then(Value::as_object) {
                Some(properties) => {
                    let mut converted = Map::new();
                    for (name, property) in properties {
                        let name = name.trim_end_matches('?');
                        converted.insert(name.to_string(), raml_to_schema(property));
                    }
                    json!({"type": "object", "properties": converted})
                }
                None => match node.get("type") {
                    Some(inner) => raml_to_schema(inner),
                    None if node.contains_key("items") => json!({"type": "array"}),
                    None => json!({"type": "string"}),
                },
            };
            let Some(object) = schema.as_object_mut() else {
                return schema;
            };
            if let Some(items) = node.get("items") {
                object.insert("type".to_string(), json!("array"));
                object.insert("items".to_string(), raml_to_schema(items));
            }
            for key in ["example", "enum", "format"] {
                if let Some(value) = node.get(key) {
                    object.insert(key.to_string(), value.clone());
                }
            }
            schema
        }
        Value::Array(alternatives) => alternatives
            .first()
            .map(raml_to_schema)
            .unwrap_or_else(|| json!({"type": "string"})),
        _ => json!({"type": "string"}),
    }
}

fn type_expression(expression: &str) -> Value {
    let expression = expression.split('|').next().unwrap_or(expression).trim();
    let expression = expression.trim_start_matches('(').trim_end_matches(')');
    if let Some(item) = expression.strip_suffix("[]") {
        return json!({"type": "array", "items": type_expression(item)});
    }
    match expression {
        "string" | "file" | "any" | "" => json!({"type": "string"}),
        "integer" => json!({"type": "integer"}),
        "number" => json!({"type": "number"}),
        "boolean" => json!({"type": "boolean"}),
        "date-only" => json!({"type": "string", "format": "date"}),
        "datetime" | "datetime-only" => json!({"type": "string", "format": "date-time"}),
        "object" => json!({"type": "object"}),
        "array" => json!({"type": "array"}),
        "nil" => Value::Null,
        // Inline JSON schema strings
        other if other.starts_with('{') => serde_json::from_str(other).unwrap_or(Value::Null),
        named => json!({"$ref": format!("#/types/{}", named)}),
    }
}

fn param_value(param: &Value) -> String {
    match param {
        Value::Object(node) => node
            .get("example")
            .or_else(|| node.get("default"))
            .or_else(|| array_field(param, "enum").first())
            .map(scalar_text)
            .unwrap_or_default(),
        _ => String::new(),
    }
}

struct Walker<'a> {
    doc: &'a Value,
    base_url: String,
    default_media_type: String,
    schema_root: Value,
}

impl Walker<'_> {
    fn walk_resource(
        &self,
        path: &str,
        resource: &Value,
        ctx: &mut ImportContext,
        collection_idx: usize,
    ) {
        let Some(node) = resource.as_object() else {
            return;
        };
        for (key, child) in node {
            if key.starts_with('/') {
                self.walk_resource(&format!("{}{}", path, key), child, ctx, collection_idx);
                continue;
            }
            let method = key.trim_end_matches('?').to_ascii_lowercase();
            if !METHODS.contains(&method.as_str()) {
                continue;
            }
            let request = self.build_request(path, &method, child);
            ctx.add_request(request, Some(collection_idx));
        }
    }

    fn build_request(&self, path: &str, method: &str, node: &Value) -> Request {
        let method_upper = method.to_ascii_uppercase();
        let name = match text_field(node, "displayName") {
            Some(name) => name,
            None => format!("{} {}", method_upper, path),
        };
        let mut request = Request::new(name, &method_upper, join_url(&self.base_url, path));
        request.description = text_field(node, "description");

        let mut sources = vec![node];
        sources.extend(self.traits(node));
        for source in sources {
            for (name, param) in object_entries(source, "queryParameters") {
                let name = name.trim_end_matches('?');
                if !request.query_params.iter().any(|p| p.key == name) {
                    let value = param_value(param);
                    request.query_params.push(KeyValue::new(name, value));
                }
            }
            for (name, param) in object_entries(source, "headers") {
                let name = name.trim_end_matches('?');
                request.add_header_if_missing(name, param_value(param));
            }
        }

        if let Some(body) = node.get("body") {
            self.apply_body(&mut request, body);
        }
        request
    }

    /// Trait definitions referenced through `is:`
    fn traits(&self, node: &Value) -> Vec<&Value> {
        let Some(names) = node.get("is").and_then(Value::as_array) else {
            return Vec::new();
        };
        names
            .iter()
            .filter_map(|name| match name {
                Value::String(s) => Some(s.as_str()),
                Value::Object(map) => map.keys().next().map(String::as_str),
                _ => None,
            })
            .filter_map(|name| self.doc.get("traits").and_then(|t| t.get(name)))
            .collect()
    }

    fn apply_body(&self, request: &mut Request, body: &Value) {
        let media_entries: Vec<(String, &Value)> = match body.as_object() {
            Some(map) if map.keys().any(|k| k.contains('/')) => map
                .iter()
                .filter(|(k, _)| k.contains('/'))
                .map(|(k, v)| (k.clone(), v))
                .collect(),
            _ => vec![(self.default_media_type.clone(), body)],
        };
        let chosen = media_entries
            .iter()
            .find(|(media, _)| BodyType::from_mime(media) == BodyType::Json)
            .or_else(|| media_entries.first());
        let Some((media, declaration)) = chosen else {
            return;
        };

        let example = self.body_example(declaration);
        let body_type = BodyType::from_mime(media);
        let body = match body_type {
            BodyType::UrlEncoded | BodyType::FormData => {
                let pairs: Vec<KeyValue> = example
                    .as_object()
                    .into_iter()
                    .flatten()
                    .map(|(k, v)| KeyValue::new(k, scalar_text(v)))
                    .collect();
                RequestBody::from_pairs(body_type, &pairs)
            }
            BodyType::Xml => match &example {
                Value::String(text) => RequestBody::new(BodyType::Xml, text.clone()),
                other => RequestBody::new(BodyType::Xml, crate::xml::render_value("root", other)),
            },
            _ => RequestBody::from_value(body_type, &example),
        };
        request.body = Some(body);
        request.add_header_if_missing("Content-Type", media.as_str());
    }

    fn body_example(&self, declaration: &Value) -> Value {
        if let Some(example) = declaration.get("example") {
            return unwrap_example(example);
        }
        if let Some(first) = declaration
            .get("examples")
            .and_then(Value::as_object)
            .and_then(|e| e.values().next())
        {
            return unwrap_example(first);
        }
        let schema = raml_to_schema(declaration);
        generate_example(&schema, &self.schema_root, 0)
    }
}

/// RAML examples may be wrapped as `{value: ...}`; JSON strings are parsed
fn unwrap_example(example: &Value) -> Value {
    let inner = match example {
        Value::Object(map) if map.contains_key("value") => &map["value"],
        other => other,
    };
    match inner {
        Value::String(text) => serde_json::from_str(text).unwrap_or_else(|_| inner.clone()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_expression() {
        assert_eq!(
            type_expression("string[]"),
            json!({"type": "array", "items": {"type": "string"}})
        );
        assert_eq!(
            type_expression("User | nil"),
            json!({"$ref": "#/types/User"})
        );
        assert_eq!(
            type_expression("date-only"),
            json!({"type": "string", "format": "date"})
        );
    }

    #[test]
    fn test_named_types_generate_through_refs() {
        let doc = json!({"types": {"User": {
            "type": "object",
            "properties": {"id": "integer", "email?": {"type": "string", "format": "email"}}
        }}});
        let root = schema_root(&doc);
        let example = generate_example(&type_expression("User"), &root, 0);
        assert_eq!(example, json!({"id": 0, "email": "user@example.com"}));
    }
}
