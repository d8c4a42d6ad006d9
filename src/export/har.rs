//! HAR 1.2 exporter
//!
//! Each request becomes one log entry with an empty response. Collections
//! have no HAR counterpart and are flattened away.

use chrono::Utc;
use serde_json::{Map, Value, json};

use super::{
    ExportBundle, ExportError, ExportOptions, ExportOutput, ExportResult, exportable_requests,
    finish, to_json_text,
};
use crate::formats::FormatId;
use crate::models::{BodyType, Request};

pub const HAR_VERSION: &str = "1.2";

/// HAR exporter
#[derive(Debug, Default)]
pub struct HarExporter;

impl HarExporter {
    pub fn new() -> Self {
        Self
    }

    pub fn export(&self, bundle: &ExportBundle, options: &ExportOptions) -> ExportResult {
        finish(FormatId::Har, self.render(bundle, options))
    }

    fn render(
        &self,
        bundle: &ExportBundle,
        options: &ExportOptions,
    ) -> Result<ExportOutput, ExportError> {
        let mut warnings = Vec::new();
        let requests = exportable_requests(bundle, &mut warnings);

        let started = Utc::now().to_rfc3339();
        let entries: Vec<Value> = requests
            .iter()
            .map(|request| {
                if !request.protocol.is_http() {
                    warnings.push(format!(
                        "Request '{}' uses {} which HAR cannot describe; written as plain HTTP",
                        request.name, request.protocol
                    ));
                }
                entry(request, &started)
            })
            .collect();

        let document = json!({
            "log": {
                "version": HAR_VERSION,
                "creator": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION"),
                },
                "entries": entries,
            }
        });
        Ok(ExportOutput {
            data: to_json_text(&document, options.prettify)?,
            item_count: requests.len(),
            warnings,
        })
    }
}

fn entry(request: &Request, started: &str) -> Value {
    let headers: Vec<Value> = request
        .headers
        .iter()
        .filter(|h| h.enabled)
        .map(|h| json!({"name": h.key, "value": h.value}))
        .collect();
    let query: Vec<Value> = request
        .query_params
        .iter()
        .filter(|q| q.enabled)
        .map(|q| json!({"name": q.key, "value": q.value}))
        .collect();

    let mut har_request = Map::new();
    har_request.insert("method".to_string(), json!(request.method));
    har_request.insert("url".to_string(), json!(request.full_url()));
    har_request.insert("httpVersion".to_string(), json!("HTTP/1.1"));
    har_request.insert("cookies".to_string(), json!([]));
    har_request.insert("headers".to_string(), Value::Array(headers));
    har_request.insert("queryString".to_string(), Value::Array(query));
    let body_size = match post_data(request) {
        Some((post_data, size)) => {
            har_request.insert("postData".to_string(), post_data);
            size as i64
        }
        None => 0,
    };
    har_request.insert("headersSize".to_string(), json!(-1));
    har_request.insert("bodySize".to_string(), json!(body_size));

    json!({
        "startedDateTime": started,
        "time": 0,
        "request": har_request,
        "response": {
            "status": 0,
            "statusText": "",
            "httpVersion": "HTTP/1.1",
            "cookies": [],
            "headers": [],
            "content": {"size": 0, "mimeType": ""},
            "redirectURL": "",
            "headersSize": -1,
            "bodySize": -1,
        },
        "cache": {},
        "timings": {"send": 0, "wait": 0, "receive": 0},
    })
}

/// `postData` object and body size in bytes
fn post_data(request: &Request) -> Option<(Value, usize)> {
    let body = request.body.as_ref()?;
    let mime = request
        .header("Content-Type")
        .or_else(|| body.body_type.content_type())
        .unwrap_or("text/plain");

    let mut post_data = Map::new();
    post_data.insert("mimeType".to_string(), json!(mime));
    let text = match body.body_type {
        BodyType::UrlEncoded | BodyType::FormData => {
            let pairs = body.pairs();
            let params: Vec<Value> = pairs
                .iter()
                .filter(|p| p.enabled)
                .map(|p| json!({"name": p.key, "value": p.value}))
                .collect();
            post_data.insert("params".to_string(), Value::Array(params));
            pairs
                .iter()
                .filter(|p| p.enabled)
                .map(|p| {
                    let key = urlencoding::encode(&p.key);
                    format!("{}={}", key, urlencoding::encode(&p.value))
                })
                .collect::<Vec<_>>()
                .join("&")
        }
        _ => body.content.clone(),
    };
    let size = text.len();
    post_data.insert("text".to_string(), json!(text));
    Some((Value::Object(post_data), size))
}
