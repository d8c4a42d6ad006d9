//! Insomnia v4 export importer
//!
//! The export is a flat `resources` list linked through `parentId`.
//! Workspaces and request groups become collections, the three request
//! resource kinds become requests and `environment` resources become
//! environments.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;

use super::{
    ImportContext, ImportError, ImportOptions, ImportResult, bool_field, parse_document,
    scalar_text, sniff_mapping, str_field, text_field,
};
use crate::formats::FormatId;
use crate::models::{
    BodyType, Collection, Environment, KeyValue, Protocol, Request, RequestBody, Variable,
    VariableScope, name_from_url,
};

/// Insomnia export importer
#[derive(Debug, Default)]
pub struct InsomniaImporter;

impl InsomniaImporter {
    pub fn new() -> Self {
        Self
    }

    pub fn can_import(&self, content: &str) -> bool {
        sniff_mapping(content).is_some_and(|doc| {
            str_field(&doc, "_type") == Some("export")
                && doc.get("resources").is_some_and(Value::is_array)
        })
    }

    pub fn import(&self, content: &str, options: &ImportOptions) -> ImportResult {
        match self.parse(content, options) {
            Ok(ctx) => ctx.finish(),
            Err(e) => ImportResult::failure(Some(FormatId::InsomniaV4), e),
        }
    }

    fn parse(&self, content: &str, options: &ImportOptions) -> Result<ImportContext, ImportError> {
        let doc = parse_document(content)?;
        let resources = doc
            .get("resources")
            .and_then(Value::as_array)
            .ok_or_else(|| ImportError::InvalidDocument("missing resources array".to_string()))?;
        if let Some(version) = doc.get("__export_format") {
            if version.as_u64() != Some(4) {
                return Err(ImportError::InvalidDocument(format!(
                    "unsupported Insomnia export format {}",
                    scalar_text(version)
                )));
            }
        }

        let mut ctx = ImportContext::new(FormatId::InsomniaV4);
        let containers = link_containers(resources, &mut ctx);

        for resource in resources {
            let kind = str_field(resource, "_type").unwrap_or_default();
            let request = match kind {
                "request" => http_request(resource),
                "grpc_request" => grpc_request(resource),
                "websocket_request" => websocket_request(resource),
                "environment" => {
                    if options.include_environments {
                        ctx.environments.push(environment(resource));
                    }
                    continue;
                }
                _ => continue,
            };
            let parent = str_field(resource, "parentId").and_then(|id| containers.get(id).copied());
            if parent.is_none() {
                tracing::debug!(
                    request = %request.name,
                    "request has no workspace or group parent"
                );
            }
            ctx.add_request(request, parent);
        }
        Ok(ctx)
    }
}

/// Create collections for workspaces and request groups, parents first.
///
/// Returns resource id → collection index.
fn link_containers(resources: &[Value], ctx: &mut ImportContext) -> HashMap<String, usize> {
    let mut indices = HashMap::new();
    let mut pending: Vec<&Value> = resources
        .iter()
        .filter(|r| matches!(str_field(r, "_type"), Some("workspace" | "request_group")))
        .collect();

    // Groups may be listed before their parents; place them as parents appear
    loop {
        let before = pending.len();
        pending.retain(|resource| {
            let parent_id = str_field(resource, "parentId");
            let is_workspace = str_field(resource, "_type") == Some("workspace");
            let parent = match parent_id.and_then(|id| indices.get(id).copied()) {
                Some(idx) => Some(idx),
                None if is_workspace => None,
                None => return true,
            };
            add_container(resource, parent, ctx, &mut indices);
            false
        });
        if pending.is_empty() || pending.len() == before {
            break;
        }
    }

    for orphan in pending {
        let name = str_field(orphan, "name").unwrap_or_default().to_string();
        ctx.warn(format!(
            "Request group '{}' has an unknown parent; imported at top level",
            name
        ));
        add_container(orphan, None, ctx, &mut indices);
    }
    indices
}

fn add_container(
    resource: &Value,
    parent: Option<usize>,
    ctx: &mut ImportContext,
    indices: &mut HashMap<String, usize>,
) {
    let default_name = match str_field(resource, "_type") {
        Some("workspace") => "Insomnia Workspace",
        _ => "Folder",
    };
    let name = text_field(resource, "name").unwrap_or_else(|| default_name.to_string());
    let collection = Collection::new(name).with_description(text_field(resource, "description"));
    let idx = ctx.add_collection(collection, parent);
    if let Some(id) = str_field(resource, "_id") {
        indices.insert(id.to_string(), idx);
    }
}

fn pairs(entries: Option<&Value>) -> Vec<KeyValue> {
    entries
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|entry| {
            let name = str_field(entry, "name")?;
            if name.is_empty() {
                return None;
            }
            let value = entry
                .get("value")
                .or_else(|| entry.get("fileName"))
                .map(scalar_text)
                .unwrap_or_default();
            let disabled = bool_field(entry, "disabled").unwrap_or(false);
            Some(KeyValue::with_enabled(name, value, !disabled))
        })
        .collect()
}

fn base_request(resource: &Value, method: &str, url: &str) -> Request {
    let name = text_field(resource, "name").unwrap_or_else(|| name_from_url(method, url));
    let mut request = Request::new(name, method, "");
    request.set_url_lifting_query(url);
    request.description = text_field(resource, "description");
    request
}

fn http_request(resource: &Value) -> Request {
    let method = str_field(resource, "method").unwrap_or("GET");
    let url = str_field(resource, "url").unwrap_or_default();
    let mut request = base_request(resource, method, url);
    let params = pairs(resource.get("parameters"));
    request.query_params.extend(params);
    request.headers = pairs(resource.get("headers"));

    if let Some(body) = resource.get("body").filter(|b| b.is_object()) {
        apply_body(&mut request, body);
    }
    if let Some(auth) = resource.get("authentication") {
        apply_auth(&mut request, auth);
    }
    request
}

fn apply_body(request: &mut Request, body: &Value) {
    let mime = str_field(body, "mimeType").unwrap_or_default();
    let body_type = BodyType::from_mime(mime);
    let content = match body_type {
        BodyType::UrlEncoded | BodyType::FormData => {
            RequestBody::from_pairs(body_type, &pairs(body.get("params")))
        }
        BodyType::Graphql => {
            let text = str_field(body, "text").unwrap_or_default();
            request.protocol = Protocol::Graphql;
            match serde_json::from_str::<Value>(text) {
                Ok(parsed) => {
                    let query = str_field(&parsed, "query").unwrap_or_default();
                    let variables = parsed.get("variables").cloned();
                    RequestBody::graphql(query, variables.unwrap_or_else(|| serde_json::json!({})))
                }
                Err(_) => RequestBody::graphql(text, serde_json::json!({})),
            }
        }
        _ => {
            let Some(text) = str_field(body, "text").filter(|t| !t.is_empty()) else {
                return;
            };
            RequestBody::new(body_type, text)
        }
    };
    request.body = Some(content);
    if !mime.is_empty() {
        request.add_header_if_missing("Content-Type", mime);
    }
}

fn apply_auth(request: &mut Request, auth: &Value) {
    if bool_field(auth, "disabled") == Some(true) {
        return;
    }
    match str_field(auth, "type") {
        Some("bearer") => {
            let prefix = text_field(auth, "prefix").unwrap_or_else(|| "Bearer".to_string());
            let token = str_field(auth, "token").unwrap_or_default();
            request.add_header_if_missing("Authorization", format!("{} {}", prefix, token));
        }
        Some("basic") => {
            let username = str_field(auth, "username").unwrap_or_default();
            let password = str_field(auth, "password").unwrap_or_default();
            let encoded = STANDARD.encode(format!("{}:{}", username, password));
            request.add_header_if_missing("Authorization", format!("Basic {}", encoded));
        }
        Some("apikey") => {
            let key = str_field(auth, "key").unwrap_or("X-API-Key");
            let value = str_field(auth, "value").unwrap_or_default();
            if str_field(auth, "addTo") == Some("queryParams") {
                request.query_params.push(KeyValue::new(key, value));
            } else {
                request.add_header_if_missing(key, value);
            }
        }
        _ => {}
    }
}

fn grpc_request(resource: &Value) -> Request {
    let host = str_field(resource, "url").unwrap_or("localhost:50051");
    let host = if host.contains("://") {
        host.to_string()
    } else {
        format!("grpc://{}", host)
    };
    let method_path = str_field(resource, "protoMethodName").unwrap_or_default();
    let url = format!(
        "{}/{}",
        host.trim_end_matches('/'),
        method_path.trim_start_matches('/')
    );
    let mut request = base_request(resource, "POST", &url);
    request.protocol = Protocol::Grpc;
    request.headers = pairs(resource.get("metadata"));
    if let Some(text) = resource
        .get("body")
        .and_then(|b| str_field(b, "text"))
        .filter(|t| !t.trim().is_empty())
    {
        request.body = Some(RequestBody::new(BodyType::Json, text));
    }
    request
}

fn websocket_request(resource: &Value) -> Request {
    let url = str_field(resource, "url").unwrap_or_default();
    let mut request = base_request(resource, "GET", url);
    request.protocol = Protocol::Websocket;
    let params = pairs(resource.get("parameters"));
    request.query_params.extend(params);
    request.headers = pairs(resource.get("headers"));
    request
}

fn environment(resource: &Value) -> Environment {
    let name = text_field(resource, "name").unwrap_or_else(|| "Environment".to_string());
    let variables = resource
        .get("data")
        .and_then(Value::as_object)
        .into_iter()
        .flatten()
        .map(|(key, value)| Variable::from_json(key.as_str(), value, VariableScope::Environment))
        .collect();
    Environment::new(name, variables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VariableType;

    const EXPORT: &str = r#"{
  "_type": "export", "__export_format": 4, "__export_source": "insomnia.desktop.app:v2023.5.8",
  "resources": [
    {"_id": "req_1", "_type": "request", "parentId": "fld_1", "name": "Create user", "method": "POST",
     "url": "{{ _.base_url }}/users?notify=true",
     "headers": [{"name": "Accept", "value": "application/json"}, {"name": "X-Off", "value": "1", "disabled": true}],
     "body": {"mimeType": "application/json", "text": "{\"name\": \"Ada\"}"},
     "authentication": {"type": "bearer", "token": "abc"}},
    {"_id": "fld_1", "_type": "request_group", "parentId": "wrk_1", "name": "Users"},
    {"_id": "wrk_1", "_type": "workspace", "parentId": null, "name": "My API"},
    {"_id": "req_2", "_type": "grpc_request", "parentId": "wrk_1", "name": "SayHello",
     "url": "localhost:50051", "protoMethodName": "/helloworld.Greeter/SayHello", "body": {"text": "{\"name\": \"x\"}"}},
    {"_id": "req_3", "_type": "websocket_request", "parentId": "wrk_1", "name": "Feed", "url": "wss://feed.test/live"},
    {"_id": "env_1", "_type": "environment", "parentId": "wrk_1", "name": "Base Environment",
     "data": {"base_url": "https://api.test", "port": 8080}}
  ]
}"#;

    #[test]
    fn test_groups_link_to_workspace_regardless_of_order() {
        let result = InsomniaImporter::new().import(EXPORT, &ImportOptions::default());
        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.collections.len(), 2);
        let workspace = &result.collections[0];
        let group = &result.collections[1];
        assert_eq!(workspace.name, "My API");
        assert_eq!(workspace.folders, vec![group.id.clone()]);
        assert_eq!(group.requests.len(), 1);
        assert_eq!(workspace.requests.len(), 2);
    }

    #[test]
    fn test_http_request_mapping() {
        let result = InsomniaImporter::new().import(EXPORT, &ImportOptions::default());
        let create = &result.requests[0];
        assert_eq!(create.url, "{{ _.base_url }}/users");
        assert_eq!(create.query_params, vec![KeyValue::new("notify", "true")]);
        assert!(!create.headers[1].enabled);
        assert_eq!(create.header("Authorization"), Some("Bearer abc"));
        assert_eq!(create.header("Content-Type"), Some("application/json"));
        assert_eq!(create.body.as_ref().unwrap().body_type, BodyType::Json);
    }

    #[test]
    fn test_grpc_and_websocket_requests() {
        let result = InsomniaImporter::new().import(EXPORT, &ImportOptions::default());
        let grpc = &result.requests[1];
        assert_eq!(grpc.protocol, Protocol::Grpc);
        assert_eq!(
            grpc.url,
            "grpc://localhost:50051/helloworld.Greeter/SayHello"
        );
        let ws = &result.requests[2];
        assert_eq!(ws.protocol, Protocol::Websocket);
        assert_eq!(ws.method, "GET");
    }

    #[test]
    fn test_environments() {
        let result = InsomniaImporter::new().import(EXPORT, &ImportOptions::default());
        assert_eq!(result.environments.len(), 1);
        let port = &result.environments[0].variables[1];
        assert_eq!(port.var_type, VariableType::Number);

        let options = ImportOptions {
            include_environments: false,
            ..ImportOptions::default()
        };
        let result = InsomniaImporter::new().import(EXPORT, &options);
        assert!(result.environments.is_empty());
    }
}
