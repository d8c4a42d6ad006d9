//! AsyncAPI importer
//!
//! Supports AsyncAPI 2.x (channel `publish`/`subscribe` operations) and 3.0
//! (top-level `operations` pointing at channels). Publishing operations map
//! to POST, consuming ones to GET; the URL is the first server joined with
//! the channel address.

use serde_json::Value;

use super::{
    ImportContext, ImportError, ImportOptions, ImportResult, join_url, parse_document,
    scalar_text, sniff_mapping, str_field, text_field,
};
use crate::formats::FormatId;
use crate::models::{BodyType, Collection, KeyValue, Protocol, Request, RequestBody};
use crate::schema::{generate_example, resolve_ref};

const DEFAULT_BROKER: &str = "mqtt://broker";

/// AsyncAPI importer
#[derive(Debug, Default)]
pub struct AsyncApiImporter;

impl AsyncApiImporter {
    pub fn new() -> Self {
        Self
    }

    pub fn can_import(&self, content: &str) -> bool {
        sniff_mapping(content).is_some_and(|doc| doc.get("asyncapi").is_some())
    }

    /// Import an AsyncAPI document.
    ///
    /// # Example
    ///
    /// ```rust
    /// use api_interchange_sdk::import::{ImportOptions, asyncapi::AsyncApiImporter};
    ///
    /// let doc = "asyncapi: 2.6.0\ninfo:\n  title: Events\nchannels:\n  user/signedup:\n    subscribe:\n      summary: Signed up\n";
    /// let result = AsyncApiImporter::new().import(doc, &ImportOptions::default());
    /// assert_eq!(result.requests[0].method, "GET");
    /// assert_eq!(result.requests[0].url, "mqtt://broker/user/signedup");
    /// ```
    pub fn import(&self, content: &str, options: &ImportOptions) -> ImportResult {
        match self.parse(content, options) {
            Ok(ctx) => ctx.finish(),
            Err(e) => ImportResult::failure(Some(FormatId::AsyncApi20), e),
        }
    }

    fn parse(&self, content: &str, _options: &ImportOptions) -> Result<ImportContext, ImportError> {
        let doc = parse_document(content)?;
        let version = doc
            .get("asyncapi")
            .map(scalar_text)
            .ok_or_else(|| ImportError::InvalidDocument("missing asyncapi version".to_string()))?;

        let format = if version.starts_with('3') {
            FormatId::AsyncApi30
        } else if version.starts_with('2') {
            FormatId::AsyncApi20
        } else {
            return Err(ImportError::InvalidDocument(format!(
                "unsupported AsyncAPI version {}",
                version
            )));
        };

        let mut ctx = ImportContext::new(format);
        let info = doc.get("info").cloned().unwrap_or(Value::Null);
        let title = text_field(&info, "title").unwrap_or_else(|| "AsyncAPI".to_string());
        let collection_idx = ctx.add_collection(
            Collection::new(title).with_description(text_field(&info, "description")),
            None,
        );

        let walker = Walker {
            doc: &doc,
            server: Server::first(&doc, format),
            default_content_type: str_field(&doc, "defaultContentType")
                .unwrap_or("application/json")
                .to_string(),
        };

        match format {
            FormatId::AsyncApi30 => walker.walk_v3(&mut ctx, collection_idx),
            _ => walker.walk_v2(&mut ctx, collection_idx),
        }

        Ok(ctx)
    }
}

struct Server {
    base: String,
    protocol: Protocol,
}

impl Server {
    fn first(doc: &Value, format: FormatId) -> Self {
        let server = doc
            .get("servers")
            .and_then(Value::as_object)
            .and_then(|servers| servers.values().next());
        let Some(server) = server else {
            return Server {
                base: DEFAULT_BROKER.to_string(),
                protocol: Protocol::Mqtt,
            };
        };

        let declared = str_field(server, "protocol").unwrap_or("mqtt");
        let mut address = if format == FormatId::AsyncApi30 {
            let host = str_field(server, "host").unwrap_or("broker");
            join_url(host, str_field(server, "pathname").unwrap_or_default())
        } else {
            str_field(server, "url").unwrap_or("broker").to_string()
        };
        if let Some(variables) = server.get("variables").and_then(Value::as_object) {
            for (name, variable) in variables {
                let default = variable.get("default").map(scalar_text).unwrap_or_default();
                address = address.replace(&format!("{{{}}}", name), &default);
            }
        }

        let base = if address.contains("://") {
            address
        } else {
            format!("{}://{}", declared.to_ascii_lowercase(), address)
        };
        let scheme = base.split("://").next().unwrap_or(declared);
        let protocol = match Protocol::from_scheme(declared) {
            Protocol::Rest => Protocol::from_scheme(scheme),
            other => other,
        };
        Server { base, protocol }
    }
}

struct Walker<'a> {
    doc: &'a Value,
    server: Server,
    default_content_type: String,
}

impl<'a> Walker<'a> {
    fn deref<'b>(&self, node: &'b Value) -> Option<&'b Value>
    where
        'a: 'b,
    {
        match node.get("$ref").and_then(Value::as_str) {
            Some(reference) => resolve_ref(self.doc, reference),
            None => Some(node),
        }
    }

    fn walk_v2(&self, ctx: &mut ImportContext, collection_idx: usize) {
        let Some(channels) = self.doc.get("channels").and_then(Value::as_object) else {
            ctx.warn("Document declares no channels");
            return;
        };
        for (address, channel) in channels {
            let Some(channel) = self.deref(channel) else {
                ctx.warn(format!("Skipped channel {}: unresolvable reference", address));
                continue;
            };
            for (action, method) in [("publish", "POST"), ("subscribe", "GET")] {
                let Some(operation) = channel.get(action) else {
                    continue;
                };
                let message = operation.get("message").and_then(|m| self.message(m));
                let name = text_field(operation, "summary")
                    .or_else(|| text_field(operation, "operationId"))
                    .unwrap_or_else(|| format!("{} {}", action, address));
                let request = self.build_request(name, method, address, operation, message);
                ctx.add_request(request, Some(collection_idx));
            }
        }
    }

    fn walk_v3(&self, ctx: &mut ImportContext, collection_idx: usize) {
        let Some(operations) = self.doc.get("operations").and_then(Value::as_object) else {
            ctx.warn("Document declares no operations");
            return;
        };
        for (key, operation) in operations {
            let Some(operation) = self.deref(operation) else {
                ctx.warn(format!("Skipped operation {}: unresolvable reference", key));
                continue;
            };
            let channel = operation.get("channel").and_then(|c| self.deref(c));
            let Some(channel) = channel else {
                ctx.warn(format!("Skipped operation {}: channel not found", key));
                continue;
            };
            let address = str_field(channel, "address")
                .map(str::to_string)
                .or_else(|| {
                    str_field(operation.get("channel").unwrap_or(&Value::Null), "$ref")
                        .and_then(|r| r.rsplit('/').next())
                        .map(str::to_string)
                })
                .unwrap_or_default();

            let method = match str_field(operation, "action") {
                Some("send") => "POST",
                Some("receive") => "GET",
                other => {
                    ctx.warn(format!(
                        "Skipped operation {}: unknown action {:?}",
                        key,
                        other.unwrap_or_default()
                    ));
                    continue;
                }
            };

            let message = operation
                .get("messages")
                .and_then(Value::as_array)
                .and_then(|m| m.first())
                .or_else(|| {
                    channel
                        .get("messages")
                        .and_then(Value::as_object)
                        .and_then(|m| m.values().next())
                })
                .and_then(|m| self.message(m));

            let name = text_field(operation, "summary")
                .or_else(|| text_field(operation, "title"))
                .unwrap_or_else(|| key.clone());
            let request = self.build_request(name, method, &address, operation, message);
            ctx.add_request(request, Some(collection_idx));
        }
    }

    /// Resolve a message, taking the first alternative of `oneOf`
    fn message<'b>(&self, node: &'b Value) -> Option<&'b Value>
    where
        'a: 'b,
    {
        let message = self.deref(node)?;
        match message.get("oneOf").and_then(Value::as_array) {
            Some(alternatives) => alternatives.first().and_then(|m| self.deref(m)),
            None => Some(message),
        }
    }

    fn build_request(
        &self,
        name: String,
        method: &str,
        address: &str,
        operation: &Value,
        message: Option<&Value>,
    ) -> Request {
        let mut request = Request::new(name, method, join_url(&self.server.base, address));
        request.protocol = self.server.protocol;
        request.description = text_field(operation, "description");

        if let Some(message) = message {
            let content_type = str_field(message, "contentType")
                .unwrap_or(&self.default_content_type)
                .to_string();
            if let Some(payload) = self.payload_example(message) {
                let body_type = match BodyType::from_mime(&content_type) {
                    BodyType::Raw => BodyType::Json,
                    other => other,
                };
                request.body = Some(RequestBody::from_value(body_type, &payload));
                request
                    .headers
                    .push(KeyValue::new("Content-Type", content_type));
            }
        }
        request
    }

    /// `examples[0].payload`, else generated from the payload schema
    fn payload_example(&self, message: &Value) -> Option<Value> {
        let example = message
            .get("examples")
            .and_then(Value::as_array)
            .and_then(|e| e.first())
            .and_then(|e| e.get("payload"));
        if let Some(example) = example {
            return Some(example.clone());
        }
        let payload = message.get("payload")?;
        // 3.0 multi-format schema objects wrap the schema
        let schema = payload
            .get("schema")
            .filter(|_| payload.get("schemaFormat").is_some())
            .unwrap_or(payload);
        Some(generate_example(schema, self.doc, 0))
    }
}
