//! Request model
//!
//! A `Request` is one invokable operation. Every importer produces these and
//! every exporter consumes them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::generate_id;

/// Wire protocol a request is meant to be executed with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Plain HTTP
    #[default]
    Rest,
    /// GraphQL over HTTP
    Graphql,
    /// SOAP envelope over HTTP
    Soap,
    /// gRPC
    Grpc,
    /// MQTT publish/subscribe
    Mqtt,
    /// WebSocket
    Websocket,
    /// Apache Kafka
    Kafka,
    /// AMQP
    Amqp,
}

impl Protocol {
    /// Map a protocol name as written in AsyncAPI server objects
    pub fn from_scheme(scheme: &str) -> Self {
        match scheme.to_ascii_lowercase().as_str() {
            "mqtt" | "mqtts" | "secure-mqtt" => Protocol::Mqtt,
            "ws" | "wss" => Protocol::Websocket,
            "kafka" | "kafka-secure" => Protocol::Kafka,
            "amqp" | "amqps" => Protocol::Amqp,
            "grpc" => Protocol::Grpc,
            _ => Protocol::Rest,
        }
    }

    /// Exchanged as a plain HTTP request and response
    pub fn is_http(&self) -> bool {
        matches!(self, Protocol::Rest | Protocol::Graphql | Protocol::Soap)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Protocol::Rest => "rest",
            Protocol::Graphql => "graphql",
            Protocol::Soap => "soap",
            Protocol::Grpc => "grpc",
            Protocol::Mqtt => "mqtt",
            Protocol::Websocket => "websocket",
            Protocol::Kafka => "kafka",
            Protocol::Amqp => "amqp",
        };
        write!(f, "{}", name)
    }
}

/// Header or query parameter entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl KeyValue {
    /// Create an enabled entry
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled: true,
        }
    }

    /// Create an entry with an explicit enabled flag
    pub fn with_enabled(key: impl Into<String>, value: impl Into<String>, enabled: bool) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled,
        }
    }
}

/// How `RequestBody::content` must be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyType {
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "raw")]
    Raw,
    #[serde(rename = "xml")]
    Xml,
    #[serde(rename = "graphql")]
    Graphql,
    #[serde(rename = "form-data")]
    FormData,
    #[serde(rename = "x-www-form-urlencoded")]
    UrlEncoded,
}

impl BodyType {
    /// Pick a body type from a MIME type
    ///
    /// Unknown MIME types map to `Raw`.
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if mime == "application/x-www-form-urlencoded" {
            BodyType::UrlEncoded
        } else if mime.starts_with("multipart/") {
            BodyType::FormData
        } else if mime == "application/graphql" {
            BodyType::Graphql
        } else if mime == "application/json" || mime.ends_with("+json") {
            BodyType::Json
        } else if mime.ends_with("/xml") || mime.ends_with("+xml") {
            BodyType::Xml
        } else {
            BodyType::Raw
        }
    }

    /// Default `Content-Type` for this body type
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            BodyType::Json | BodyType::Graphql => Some("application/json"),
            BodyType::Xml => Some("application/xml"),
            BodyType::UrlEncoded => Some("application/x-www-form-urlencoded"),
            BodyType::FormData => Some("multipart/form-data"),
            BodyType::Raw => None,
        }
    }
}

/// Request body. `content` is always serialized text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(rename = "type")]
    pub body_type: BodyType,
    pub content: String,
}

impl RequestBody {
    pub fn new(body_type: BodyType, content: impl Into<String>) -> Self {
        Self {
            body_type,
            content: content.into(),
        }
    }

    /// Body of the given type holding a JSON value. Strings are taken as
    /// already-serialized text; `Json` bodies are pretty-printed.
    pub fn from_value(body_type: BodyType, value: &serde_json::Value) -> Self {
        let content = match (body_type, value) {
            (_, serde_json::Value::String(s)) => s.clone(),
            (BodyType::Json, v) => serde_json::to_string_pretty(v).unwrap_or_default(),
            (_, v) => v.to_string(),
        };
        Self { body_type, content }
    }

    /// Form-data or urlencoded body from key/value pairs
    pub fn from_pairs(body_type: BodyType, pairs: &[KeyValue]) -> Self {
        let content = serde_json::to_string(pairs).unwrap_or_else(|_| "[]".to_string());
        Self { body_type, content }
    }

    /// GraphQL body carrying a query and its variables
    pub fn graphql(query: &str, variables: serde_json::Value) -> Self {
        let content = serde_json::json!({ "query": query, "variables": variables });
        Self {
            body_type: BodyType::Graphql,
            content: content.to_string(),
        }
    }

    /// Decode a form-data/urlencoded body back into pairs
    ///
    /// Returns an empty list for other body types or unparsable content.
    pub fn pairs(&self) -> Vec<KeyValue> {
        match self.body_type {
            BodyType::FormData | BodyType::UrlEncoded => {
                serde_json::from_str(&self.content).unwrap_or_default()
            }
            _ => Vec::new(),
        }
    }
}

/// One invokable operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub protocol: Protocol,
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: Vec<KeyValue>,
    #[serde(default)]
    pub query_params: Vec<KeyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<RequestBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Request {
    /// Create a REST request with a fresh identifier
    pub fn new(name: impl Into<String>, method: impl Into<String>, url: impl Into<String>) -> Self {
        let now = Utc::now();
        Request {
            id: generate_id(),
            name: name.into(),
            description: None,
            protocol: Protocol::Rest,
            method: method.into().to_ascii_uppercase(),
            url: url.into(),
            headers: Vec::new(),
            query_params: Vec::new(),
            body: None,
            collection_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the request satisfies the post-import invariant
    pub fn is_valid(&self) -> bool {
        !self.method.trim().is_empty() && !self.url.trim().is_empty()
    }

    /// Case-insensitive header lookup
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.key.eq_ignore_ascii_case(key))
            .map(|h| h.value.as_str())
    }

    pub fn has_header(&self, key: &str) -> bool {
        self.header(key).is_some()
    }

    /// Append a header unless one with the same name already exists
    pub fn add_header_if_missing(&mut self, key: &str, value: impl Into<String>) {
        if !self.has_header(key) {
            self.headers.push(KeyValue::new(key, value));
        }
    }

    /// Store `url`, lifting any query string into `query_params`.
    ///
    /// Lifted parameters are appended after existing ones.
    pub fn set_url_lifting_query(&mut self, url: &str) {
        let (base, params) = split_query(url);
        self.url = base;
        self.query_params.extend(params);
    }

    /// Full URL with enabled query parameters percent-encoded
    pub fn full_url(&self) -> String {
        let query: Vec<String> = self
            .query_params
            .iter()
            .filter(|p| p.enabled)
            .map(|p| {
                if p.value.is_empty() {
                    urlencoding::encode(&p.key).into_owned()
                } else {
                    format!(
                        "{}={}",
                        urlencoding::encode(&p.key),
                        urlencoding::encode(&p.value)
                    )
                }
            })
            .collect();
        if query.is_empty() {
            return self.url.clone();
        }
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.url, separator, query.join("&"))
    }
}

/// Split a URL into its origin+path and decoded query parameters.
///
/// The fragment is dropped. Parameters without `=` get an empty value.
pub fn split_query(url: &str) -> (String, Vec<KeyValue>) {
    let without_fragment = url.split('#').next().unwrap_or(url);
    match without_fragment.split_once('?') {
        Some((base, query)) => (base.to_string(), parse_query_string(query)),
        None => (without_fragment.to_string(), Vec::new()),
    }
}

/// Decode an `a=1&b=2` query string into key/value pairs
pub fn parse_query_string(query: &str) -> Vec<KeyValue> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            KeyValue::new(decode_component(key), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}

/// Derive a display name such as `GET /users` from a method and URL
pub fn name_from_url(method: &str, url: &str) -> String {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let path = match without_scheme.find('/') {
        Some(idx) => &without_scheme[idx..],
        None => "/",
    };
    let path = path.split(['?', '#']).next().unwrap_or(path);
    format!("{} {}", method.to_ascii_uppercase(), path)
}
