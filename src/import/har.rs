//! HAR (HTTP Archive) importer
//!
//! Every `log.entries[].request` becomes one request. HAR has no folder
//! concept, so no collections are produced.

use serde_json::Value;

use super::{
    ImportContext, ImportError, ImportOptions, ImportResult, parse_json_document, scalar_text,
    sniff_mapping, str_field,
};
use crate::formats::FormatId;
use crate::models::{BodyType, KeyValue, Request, RequestBody, name_from_url, split_query};

/// HAR importer
#[derive(Debug, Default)]
pub struct HarImporter;

impl HarImporter {
    pub fn new() -> Self {
        Self
    }

    pub fn can_import(&self, content: &str) -> bool {
        sniff_mapping(content).is_some_and(|doc| {
            doc.get("log")
                .and_then(|log| log.get("entries"))
                .is_some_and(Value::is_array)
        })
    }

    pub fn import(&self, content: &str, options: &ImportOptions) -> ImportResult {
        match self.parse(content, options) {
            Ok(ctx) => ctx.finish(),
            Err(e) => ImportResult::failure(Some(FormatId::Har), e),
        }
    }

    fn parse(&self, content: &str, _options: &ImportOptions) -> Result<ImportContext, ImportError> {
        let doc = parse_json_document(content)?;
        let entries = doc
            .get("log")
            .and_then(|log| log.get("entries"))
            .and_then(Value::as_array)
            .ok_or_else(|| ImportError::InvalidDocument("missing log.entries".to_string()))?;

        let mut ctx = ImportContext::new(FormatId::Har);
        for (index, entry) in entries.iter().enumerate() {
            match entry.get("request").and_then(entry_request) {
                Some(request) => ctx.add_request(request, None),
                None => ctx.warn(format!("Skipped entry {}: request has no URL", index)),
            }
        }
        Ok(ctx)
    }
}

fn name_value_pairs(entries: Option<&Value>) -> Vec<KeyValue> {
    entries
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|entry| {
            let name = str_field(entry, "name")?;
            let value = entry.get("value").map(scalar_text).unwrap_or_default();
            Some(KeyValue::new(name, value))
        })
        .collect()
}

fn entry_request(source: &Value) -> Option<Request> {
    let url = str_field(source, "url").filter(|u| !u.is_empty())?;
    let method = str_field(source, "method").unwrap_or("GET");
    let mut request = Request::new(name_from_url(method, url), method, "");

    // queryString is authoritative when present
    let query = name_value_pairs(source.get("queryString"));
    if query.is_empty() {
        request.set_url_lifting_query(url);
    } else {
        request.url = split_query(url).0;
        request.query_params = query;
    }

    // HTTP/2 pseudo-headers (:authority, :path, ...) are not real headers
    request.headers = name_value_pairs(source.get("headers"))
        .into_iter()
        .filter(|h| !h.key.starts_with(':'))
        .collect();

    if let Some(post_data) = source.get("postData") {
        let mime = str_field(post_data, "mimeType").unwrap_or_default();
        let body_type = BodyType::from_mime(mime);
        let params = name_value_pairs(post_data.get("params"));
        let text = str_field(post_data, "text").unwrap_or_default();
        request.body = match body_type {
            BodyType::UrlEncoded | BodyType::FormData if !params.is_empty() => {
                Some(RequestBody::from_pairs(body_type, &params))
            }
            _ if !text.is_empty() => {
                let body_type = match body_type {
                    // Form bodies captured as text only stay raw
                    BodyType::UrlEncoded | BodyType::FormData => BodyType::Raw,
                    other => other,
                };
                Some(RequestBody::new(body_type, text))
            }
            _ => None,
        };
    }
    Some(request)
}
