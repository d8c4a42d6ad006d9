//! Postman importer
//!
//! Handles collection exports (schema v2.0 and v2.1) and environment
//! exports. Folders become child collections; authentication declared on a
//! folder or the collection is inherited by the requests below it.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};

use super::{
    ImportContext, ImportError, ImportOptions, ImportResult, array_field, bool_field,
    parse_json_document, scalar_text, sniff_mapping, str_field, text_field,
};
use crate::formats::FormatId;
use crate::models::{
    BodyType, Collection, Environment, KeyValue, Protocol, Request, RequestBody, Variable,
    VariableScope, VariableType, name_from_url, split_query,
};

/// Postman collection and environment importer
#[derive(Debug, Default)]
pub struct PostmanImporter;

impl PostmanImporter {
    pub fn new() -> Self {
        Self
    }

    pub fn can_import(&self, content: &str) -> bool {
        let Some(doc) = sniff_mapping(content) else {
            return false;
        };
        is_collection(&doc) || is_environment(&doc)
    }

    /// Import a Postman collection or environment export.
    ///
    /// # Example
    ///
    /// ```rust
    /// use api_interchange_sdk::import::{ImportOptions, postman::PostmanImporter};
    ///
    /// let collection = r#"{
    ///   "info": {"name": "Demo", "schema": "https://schema.getpostman.com/json/collection/v2.1.0/collection.json"},
    ///   "item": [{"name": "List users", "request": {"method": "GET", "url": "https://api.test/users?page=1"}}]
    /// }"#;
    /// let result = PostmanImporter::new().import(collection, &ImportOptions::default());
    /// assert!(result.success);
    /// assert_eq!(result.requests[0].url, "https://api.test/users");
    /// assert_eq!(result.requests[0].query_params[0].value, "1");
    /// ```
    pub fn import(&self, content: &str, options: &ImportOptions) -> ImportResult {
        match self.parse(content, options) {
            Ok(ctx) => ctx.finish(),
            Err(e) => ImportResult::failure(Some(FormatId::PostmanV21), e),
        }
    }

    fn parse(&self, content: &str, options: &ImportOptions) -> Result<ImportContext, ImportError> {
        let doc = parse_json_document(content)?;
        let mut ctx = ImportContext::new(FormatId::PostmanV21);

        if is_environment(&doc) {
            if options.include_environments {
                ctx.environments.push(environment(&doc));
            } else {
                ctx.warn("Environment export skipped: environments are excluded");
            }
            return Ok(ctx);
        }
        if !is_collection(&doc) {
            return Err(ImportError::InvalidDocument(
                "not a Postman collection or environment".to_string(),
            ));
        }

        let info = doc.get("info").cloned().unwrap_or(Value::Null);
        let name = text_field(&info, "name").unwrap_or_else(|| "Postman Collection".to_string());
        let root = Collection::new(name).with_description(description(info.get("description")));
        let root_idx = ctx.add_collection(root, None);

        if options.include_variables {
            for variable in array_field(&doc, "variable") {
                if let Some(variable) = collection_variable(variable) {
                    ctx.variables.push(variable);
                }
            }
        }

        let auth = doc.get("auth");
        walk_items(doc.get("item"), root_idx, auth, &mut ctx);
        Ok(ctx)
    }
}

fn is_collection(doc: &Value) -> bool {
    let Some(info) = doc.get("info") else {
        return false;
    };
    let schema_match = str_field(info, "schema").is_some_and(|s| s.contains("getpostman.com"));
    schema_match || (info.get("_postman_id").is_some() && doc.get("item").is_some())
}

fn is_environment(doc: &Value) -> bool {
    doc.get("_postman_variable_scope").is_some()
        || (doc.get("values").is_some_and(Value::is_array)
            && doc.get("name").is_some()
            && doc.get("info").is_none())
}

/// Descriptions are either a string or `{content, type}`
fn description(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(text) => Some(text.clone()),
        other => text_field(other, "content"),
    };
    text.filter(|d| !d.trim().is_empty())
}

fn is_disabled(entry: &Value) -> bool {
    bool_field(entry, "disabled").unwrap_or(false)
}

fn collection_variable(entry: &Value) -> Option<Variable> {
    let key = str_field(entry, "key").or_else(|| str_field(entry, "id"))?;
    let value = entry.get("value").unwrap_or(&Value::Null);
    let mut variable = Variable::from_json(key, value, VariableScope::Collection);
    variable.enabled = !is_disabled(entry);
    Some(variable)
}

fn environment(doc: &Value) -> Environment {
    let name = text_field(doc, "name").unwrap_or_else(|| "Postman Environment".to_string());
    let variables = array_field(doc, "values")
        .iter()
        .filter_map(|entry| {
            let key = str_field(entry, "key")?;
            let value = entry.get("value").unwrap_or(&Value::Null);
            let mut variable = Variable::from_json(key, value, VariableScope::Environment);
            variable.enabled = bool_field(entry, "enabled").unwrap_or(true);
            if str_field(entry, "type") == Some("secret") {
                variable.var_type = VariableType::Secret;
            }
            Some(variable)
        })
        .collect();
    Environment::new(name, variables)
}

fn walk_items(
    items: Option<&Value>,
    collection_idx: usize,
    auth: Option<&Value>,
    ctx: &mut ImportContext,
) {
    for item in items.and_then(Value::as_array).into_iter().flatten() {
        let name = text_field(item, "name");
        let item_auth = item.get("auth").or(auth);

        if item.get("item").is_some() {
            let folder = Collection::new(name.unwrap_or_else(|| "Folder".to_string()))
                .with_description(description(item.get("description")));
            let folder_idx = ctx.add_collection(folder, Some(collection_idx));
            walk_items(item.get("item"), folder_idx, item_auth, ctx);
            continue;
        }

        let Some(source) = item.get("request") else {
            ctx.warn(format!(
                "Skipped item '{}': no request",
                name.unwrap_or_default()
            ));
            continue;
        };
        let request = build_request(name, item, source, item_auth);
        ctx.add_request(request, Some(collection_idx));
    }
}

fn build_request(
    name: Option<String>,
    item: &Value,
    source: &Value,
    inherited_auth: Option<&Value>,
) -> Request {
    // A request may be written as a bare URL string
    let (method, url_node, request_node) = match source {
        Value::String(url) => ("GET".to_string(), Value::String(url.clone()), Value::Null),
        node => (
            str_field(node, "method").unwrap_or("GET").to_string(),
            node.get("url").cloned().unwrap_or(Value::Null),
            node.clone(),
        ),
    };

    let mut request = Request::new(String::new(), method, "");
    apply_url(&mut request, &url_node);
    request.name = name.unwrap_or_else(|| name_from_url(&request.method, &request.url));
    request.description = description(request_node.get("description"))
        .or_else(|| description(item.get("description")));

    match request_node.get("header") {
        Some(Value::Array(headers)) => {
            for header in headers {
                if let Some(key) = str_field(header, "key") {
                    let value = header.get("value").map(scalar_text).unwrap_or_default();
                    let enabled = !is_disabled(header);
                    request
                        .headers
                        .push(KeyValue::with_enabled(key, value, enabled));
                }
            }
        }
        // v1-style "Key: Value\n" header strings
        Some(Value::String(block)) => {
            for line in block.lines() {
                if let Some((key, value)) = line.split_once(':') {
                    request
                        .headers
                        .push(KeyValue::new(key.trim(), value.trim()));
                }
            }
        }
        _ => {}
    }

    if let Some(body) = request_node.get("body") {
        apply_body(&mut request, body);
    }

    let auth = request_node.get("auth").or(inherited_auth);
    if let Some(auth) = auth {
        apply_auth(&mut request, auth);
    }
    request
}

fn apply_url(request: &mut Request, url: &Value) {
    match url {
        Value::String(raw) => request.set_url_lifting_query(raw),
        Value::Object(_) => {
            let raw = str_field(url, "raw")
                .map(str::to_string)
                .unwrap_or_else(|| assemble_url(url));
            match url.get("query").and_then(Value::as_array) {
                Some(query) => {
                    let (base, _) = split_query(&raw);
                    request.url = base;
                    for param in query {
                        if let Some(key) = str_field(param, "key") {
                            let value = param.get("value").map(scalar_text).unwrap_or_default();
                            request
                                .query_params
                                .push(KeyValue::with_enabled(key, value, !is_disabled(param)));
                        }
                    }
                }
                None => request.set_url_lifting_query(&raw),
            }
        }
        _ => {}
    }
}

/// Rebuild a URL from its `protocol`/`host`/`port`/`path` parts
fn assemble_url(url: &Value) -> String {
    let joined = |key: &str, separator: &str| match url.get(key) {
        Some(Value::Array(parts)) => parts
            .iter()
            .map(scalar_text)
            .collect::<Vec<_>>()
            .join(separator),
        Some(Value::String(part)) => part.trim_matches('/').to_string(),
        _ => String::new(),
    };
    let mut out = String::new();
    if let Some(protocol) = str_field(url, "protocol") {
        out.push_str(protocol);
        out.push_str("://");
    }
    out.push_str(&joined("host", "."));
    if let Some(port) = url.get("port") {
        out.push(':');
        out.push_str(&scalar_text(port));
    }
    let path = joined("path", "/");
    if !path.is_empty() {
        out.push('/');
        out.push_str(&path);
    }
    out
}

fn form_pairs(entries: Option<&Value>) -> Vec<KeyValue> {
    entries
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|entry| {
            let key = str_field(entry, "key")?;
            let value = if str_field(entry, "type") == Some("file") {
                match entry.get("src") {
                    Some(Value::Array(files)) => files.first().map(scalar_text).unwrap_or_default(),
                    Some(other) => scalar_text(other),
                    None => String::new(),
                }
            } else {
                entry.get("value").map(scalar_text).unwrap_or_default()
            };
            Some(KeyValue::with_enabled(key, value, !is_disabled(entry)))
        })
        .collect()
}

fn apply_body(request: &mut Request, body: &Value) {
    if body.get("disabled").and_then(Value::as_bool) == Some(true) {
        return;
    }
    let body = match str_field(body, "mode").unwrap_or("raw") {
        "raw" => {
            let raw = str_field(body, "raw").unwrap_or_default();
            if raw.is_empty() {
                return;
            }
            let language = body
                .get("options")
                .and_then(|o| o.get("raw"))
                .and_then(|r| str_field(r, "language"));
            let body_type = match language {
                Some("json") => BodyType::Json,
                Some("xml") | Some("html") => BodyType::Xml,
                Some(_) => BodyType::Raw,
                None => match request.header("Content-Type").map(BodyType::from_mime) {
                    Some(BodyType::Json) => BodyType::Json,
                    Some(BodyType::Xml) => BodyType::Xml,
                    _ => BodyType::Raw,
                },
            };
            RequestBody::new(body_type, raw)
        }
        "urlencoded" => {
            let pairs = form_pairs(body.get("urlencoded"));
            RequestBody::from_pairs(BodyType::UrlEncoded, &pairs)
        }
        "formdata" => {
            RequestBody::from_pairs(BodyType::FormData, &form_pairs(body.get("formdata")))
        }
        "graphql" => {
            let graphql = body.get("graphql").cloned().unwrap_or(Value::Null);
            let query = str_field(&graphql, "query").unwrap_or_default();
            let variables = match graphql.get("variables") {
                Some(Value::String(text)) if !text.trim().is_empty() => {
                    serde_json::from_str(text).unwrap_or_else(|_| json!({}))
                }
                Some(Value::Object(map)) => Value::Object(map.clone()),
                _ => json!({}),
            };
            request.protocol = Protocol::Graphql;
            RequestBody::graphql(query, variables)
        }
        _ => return,
    };
    request.body = Some(body);
}

/// Read an auth parameter from either the v2.1 `[{key, value}]` list or
/// the v2.0 `{key: value}` map
fn auth_param(auth: &Value, kind: &str, key: &str) -> Option<String> {
    match auth.get(kind)? {
        Value::Array(entries) => entries
            .iter()
            .find(|e| str_field(e, "key") == Some(key))
            .and_then(|e| e.get("value"))
            .map(scalar_text),
        Value::Object(map) => map.get(key).map(scalar_text),
        _ => None,
    }
}

fn apply_auth(request: &mut Request, auth: &Value) {
    match str_field(auth, "type").unwrap_or("noauth") {
        "bearer" => {
            let token = auth_param(auth, "bearer", "token").unwrap_or_default();
            request.add_header_if_missing("Authorization", format!("Bearer {}", token));
        }
        "basic" => {
            let username = auth_param(auth, "basic", "username").unwrap_or_default();
            let password = auth_param(auth, "basic", "password").unwrap_or_default();
            let encoded = STANDARD.encode(format!("{}:{}", username, password));
            request.add_header_if_missing("Authorization", format!("Basic {}", encoded));
        }
        "apikey" => {
            let key = auth_param(auth, "apikey", "key").unwrap_or_else(|| "X-API-Key".to_string());
            let value = auth_param(auth, "apikey", "value").unwrap_or_default();
            if auth_param(auth, "apikey", "in").as_deref() == Some("query") {
                request.query_params.push(KeyValue::new(key, value));
            } else {
                request.add_header_if_missing(&key, value);
            }
        }
        "noauth" => {}
        other => tracing::debug!(auth = other, "unsupported Postman auth type ignored"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLLECTION: &str = r#"{
  "info": {"_postman_id": "1", "name": "Shop", "schema": "https://schema.getpostman.com/json/collection/v2.1.0/collection.json"},
  "auth": {"type": "bearer", "bearer": [{"key": "token", "value": "{{token}}", "type": "string"}]},
  "variable": [{"key": "baseUrl", "value": "https://shop.test"}, {"key": "retries", "value": 3}],
  "item": [
    {"name": "Orders", "item": [
      {"name": "Create order", "request": {
        "method": "POST",
        "header": [{"key": "Content-Type", "value": "application/json"}, {"key": "X-Debug", "value": "1", "disabled": true}],
        "url": {"raw": "{{baseUrl}}/orders?dry=true", "host": ["{{baseUrl}}"], "path": ["orders"],
                "query": [{"key": "dry", "value": "true", "disabled": true}]},
        "body": {"mode": "raw", "raw": "{\"sku\": \"A1\"}", "options": {"raw": {"language": "json"}}}
      }},
      {"name": "Upload", "request": {
        "method": "PUT",
        "url": "{{baseUrl}}/orders/1/file",
        "auth": {"type": "basic", "basic": [{"key": "username", "value": "u"}, {"key": "password", "value": "p"}]},
        "body": {"mode": "formdata", "formdata": [{"key": "file", "type": "file", "src": "/tmp/a.pdf"}]}
      }}
    ]},
    {"name": "Search", "request": {"method": "POST", "url": "{{baseUrl}}/graphql",
      "body": {"mode": "graphql", "graphql": {"query": "{ orders { id } }", "variables": "{\"first\": 2}"}}}}
  ]
}"#;

    #[test]
    fn test_folders_become_child_collections() {
        let result = PostmanImporter::new().import(COLLECTION, &ImportOptions::default());
        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.collections.len(), 2);
        assert_eq!(
            result.collections[0].folders,
            vec![result.collections[1].id.clone()]
        );
        assert_eq!(result.collections[1].requests.len(), 2);
        assert_eq!(result.requests.len(), 3);
    }

    #[test]
    fn test_query_array_and_disabled_flags() {
        let result = PostmanImporter::new().import(COLLECTION, &ImportOptions::default());
        let create = &result.requests[0];
        assert_eq!(create.url, "{{baseUrl}}/orders");
        assert_eq!(
            create.query_params,
            vec![KeyValue::with_enabled("dry", "true", false)]
        );
        assert!(!create.headers[1].enabled);
        assert_eq!(create.body.as_ref().unwrap().body_type, BodyType::Json);
        assert_eq!(create.header("Authorization"), Some("Bearer {{token}}"));
    }

    #[test]
    fn test_request_auth_overrides_inherited() {
        let result = PostmanImporter::new().import(COLLECTION, &ImportOptions::default());
        let upload = &result.requests[1];
        assert_eq!(upload.header("Authorization"), Some("Basic dTpw"));
        let pairs = upload.body.as_ref().unwrap().pairs();
        assert_eq!(pairs, vec![KeyValue::new("file", "/tmp/a.pdf")]);
    }

    #[test]
    fn test_graphql_body() {
        let result = PostmanImporter::new().import(COLLECTION, &ImportOptions::default());
        let search = &result.requests[2];
        assert_eq!(search.protocol, Protocol::Graphql);
        let body: Value = serde_json::from_str(&search.body.as_ref().unwrap().content).unwrap();
        assert_eq!(body["variables"]["first"], 2);
    }

    #[test]
    fn test_collection_variables_respect_options() {
        let result = PostmanImporter::new().import(COLLECTION, &ImportOptions::default());
        assert_eq!(result.variables.len(), 2);
        assert_eq!(result.variables[1].var_type, VariableType::Number);

        let options = ImportOptions {
            include_variables: false,
            ..ImportOptions::default()
        };
        let result = PostmanImporter::new().import(COLLECTION, &options);
        assert!(result.variables.is_empty());
    }

    #[test]
    fn test_environment_export() {
        let env = r#"{"id": "e1", "name": "Staging", "_postman_variable_scope": "environment",
            "values": [{"key": "host", "value": "staging.test", "enabled": true},
                       {"key": "secret", "value": "s3", "type": "secret", "enabled": false}]}"#;
        assert!(PostmanImporter::new().can_import(env));
        let result = PostmanImporter::new().import(env, &ImportOptions::default());
        assert!(result.success);
        assert_eq!(result.environments.len(), 1);
        let vars = &result.environments[0].variables;
        assert_eq!(vars[1].var_type, VariableType::Secret);
        assert!(!vars[1].enabled);
    }
}
