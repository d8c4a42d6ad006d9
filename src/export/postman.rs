//! Postman Collection v2.1 exporter
//!
//! Rebuilds the folder tree from `Collection.folders`. A bundle with a
//! single root collection becomes that collection; several roots become
//! top-level folders of one exported collection. Requests whose collection
//! is not in the bundle are written at the top level.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value, json};

use super::{
    ExportBundle, ExportError, ExportOptions, ExportOutput, ExportResult, exportable_collections,
    exportable_requests, finish, to_json_text,
};
use crate::formats::FormatId;
use crate::models::{BodyType, Collection, KeyValue, Request, generate_id};

pub const POSTMAN_SCHEMA: &str =
    "https://schema.getpostman.com/json/collection/v2.1.0/collection.json";

/// Postman Collection v2.1 exporter
#[derive(Debug, Default)]
pub struct PostmanExporter;

impl PostmanExporter {
    pub fn new() -> Self {
        Self
    }

    pub fn export(&self, bundle: &ExportBundle, options: &ExportOptions) -> ExportResult {
        finish(FormatId::PostmanV21, self.render(bundle, options))
    }

    fn render(
        &self,
        bundle: &ExportBundle,
        options: &ExportOptions,
    ) -> Result<ExportOutput, ExportError> {
        let mut warnings = Vec::new();
        let collections = exportable_collections(bundle, &mut warnings);
        let requests = exportable_requests(bundle, &mut warnings);
        if options.include_environments && !bundle.environments.is_empty() {
            warnings.push(format!(
                "Postman collections carry no environments; {} not exported",
                bundle.environments.len()
            ));
        }

        let tree = Tree::new(&collections, &requests);
        let roots = tree.roots();
        let mut written = HashSet::new();

        let (name, description, mut items) = match roots.as_slice() {
            [root] => (
                root.name.clone(),
                root.description.clone(),
                tree.children(*root, &mut written),
            ),
            _ => {
                let items = roots
                    .iter()
                    .map(|root| tree.folder(*root, &mut written))
                    .collect();
                ("Exported Collection".to_string(), None, items)
            }
        };

        // Requests outside any exported collection
        for request in &requests {
            if !written.contains(request.id.as_str()) {
                items.push(request_item(request));
            }
        }

        let mut info = Map::new();
        info.insert("_postman_id".to_string(), json!(generate_id()));
        info.insert("name".to_string(), json!(name));
        if let Some(description) = description {
            info.insert("description".to_string(), json!(description));
        }
        info.insert("schema".to_string(), json!(POSTMAN_SCHEMA));

        let document = json!({ "info": info, "item": items });
        Ok(ExportOutput {
            data: to_json_text(&document, options.prettify)?,
            item_count: requests.len(),
            warnings,
        })
    }
}

/// Lookup tables over the exportable collections and requests
struct Tree<'a> {
    collections: HashMap<&'a str, &'a Collection>,
    requests: HashMap<&'a str, &'a Request>,
    order: Vec<&'a Collection>,
}

impl<'a> Tree<'a> {
    fn new(collections: &[&'a Collection], requests: &[&'a Request]) -> Self {
        Self {
            collections: collections.iter().map(|c| (c.id.as_str(), *c)).collect(),
            requests: requests.iter().map(|r| (r.id.as_str(), *r)).collect(),
            order: collections.to_vec(),
        }
    }

    /// Collections that are nobody's folder, in bundle order
    fn roots(&self) -> Vec<&'a Collection> {
        let nested: HashSet<&str> = self
            .order
            .iter()
            .flat_map(|c| c.folders.iter().map(String::as_str))
            .filter(|id| self.collections.contains_key(id))
            .collect();
        self.order
            .iter()
            .copied()
            .filter(|c| !nested.contains(c.id.as_str()))
            .collect()
    }

    fn folder(&self, collection: &'a Collection, written: &mut HashSet<&'a str>) -> Value {
        let mut folder = Map::new();
        folder.insert("name".to_string(), json!(collection.name));
        if let Some(description) = &collection.description {
            folder.insert("description".to_string(), json!(description));
        }
        let items = self.children(collection, written);
        folder.insert("item".to_string(), Value::Array(items));
        Value::Object(folder)
    }

    /// Sub-folders first, then requests. Each request is written once.
    fn children(&self, collection: &'a Collection, written: &mut HashSet<&'a str>) -> Vec<Value> {
        let mut items = Vec::new();
        if !written.insert(collection.id.as_str()) {
            // Folder cycle
            return items;
        }
        for folder_id in &collection.folders {
            if let Some(&folder) = self.collections.get(folder_id.as_str()) {
                if !written.contains(folder.id.as_str()) {
                    items.push(self.folder(folder, written));
                }
            }
        }
        for request_id in &collection.requests {
            if let Some(&request) = self.requests.get(request_id.as_str()) {
                if written.insert(request.id.as_str()) {
                    items.push(request_item(request));
                }
            }
        }
        items
    }
}

fn key_values(entries: &[KeyValue]) -> Vec<Value> {
    entries
        .iter()
        .map(|entry| {
            let mut object = Map::new();
            object.insert("key".to_string(), json!(entry.key));
            object.insert("value".to_string(), json!(entry.value));
            if !entry.enabled {
                object.insert("disabled".to_string(), json!(true));
            }
            Value::Object(object)
        })
        .collect()
}

fn request_item(request: &Request) -> Value {
    let mut url = Map::new();
    url.insert("raw".to_string(), json!(request.full_url()));
    if !request.query_params.is_empty() {
        let query = key_values(&request.query_params);
        url.insert("query".to_string(), Value::Array(query));
    }

    let mut inner = Map::new();
    inner.insert("method".to_string(), json!(request.method));
    let headers = key_values(&request.headers);
    inner.insert("header".to_string(), Value::Array(headers));
    if let Some(body) = request_body(request) {
        inner.insert("body".to_string(), body);
    }
    inner.insert("url".to_string(), Value::Object(url));
    if let Some(description) = &request.description {
        inner.insert("description".to_string(), json!(description));
    }

    json!({ "name": request.name, "request": inner })
}

fn request_body(request: &Request) -> Option<Value> {
    let body = request.body.as_ref()?;
    let value = match body.body_type {
        BodyType::Json => raw_body(&body.content, Some("json")),
        BodyType::Xml => raw_body(&body.content, Some("xml")),
        BodyType::Raw => raw_body(&body.content, None),
        BodyType::UrlEncoded => {
            json!({"mode": "urlencoded", "urlencoded": key_values(&body.pairs())})
        }
        BodyType::FormData => {
            let mut parts = key_values(&body.pairs());
            for part in &mut parts {
                if let Some(object) = part.as_object_mut() {
                    object.insert("type".to_string(), json!("text"));
                }
            }
            json!({"mode": "formdata", "formdata": parts})
        }
        BodyType::Graphql => {
            let parsed: Value = serde_json::from_str(&body.content).unwrap_or(Value::Null);
            let query = parsed
                .get("query")
                .and_then(Value::as_str)
                .unwrap_or(&body.content);
            let variables = parsed
                .get("variables")
                .map(|v| serde_json::to_string_pretty(v).unwrap_or_default())
                .unwrap_or_default();
            json!({"mode": "graphql", "graphql": {"query": query, "variables": variables}})
        }
    };
    Some(value)
}

fn raw_body(content: &str, language: Option<&str>) -> Value {
    let mut value = json!({"mode": "raw", "raw": content});
    if let Some(language) = language {
        value["options"] = json!({"raw": {"language": language}});
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{ImportOptions, postman::PostmanImporter};
    use crate::models::RequestBody;

    fn bundle() -> ExportBundle {
        let mut root = Collection::new("Shop");
        let mut orders = Collection::new("Orders");
        root.folders.push(orders.id.clone());

        let mut create = Request::new("Create order", "POST", "https://shop.test/orders");
        create.headers = vec![KeyValue::new("Content-Type", "application/json")];
        create.query_params = vec![KeyValue::with_enabled("dry", "true", false)];
        create.body = Some(RequestBody::new(BodyType::Json, "{\"sku\": \"A1\"}"));
        create.collection_id = Some(orders.id.clone());
        orders.requests.push(create.id.clone());

        let loose = Request::new("Health", "GET", "https://shop.test/health");
        ExportBundle::new(vec![root, orders], vec![create, loose])
    }

    #[test]
    fn test_single_root_becomes_collection() {
        let result = PostmanExporter::new().export(&bundle(), &ExportOptions::default());
        assert!(result.success);
        assert_eq!(result.metadata.item_count, 2);
        let doc: Value = serde_json::from_str(&result.data.unwrap()).unwrap();
        assert_eq!(doc["info"]["name"], "Shop");
        assert_eq!(doc["info"]["schema"], POSTMAN_SCHEMA);
        assert_eq!(doc["item"][0]["name"], "Orders");
        let create = &doc["item"][0]["item"][0]["request"];
        assert_eq!(create["body"]["options"]["raw"]["language"], "json");
        assert_eq!(doc["item"][1]["name"], "Health");
    }

    #[test]
    fn test_reimport_preserves_structure() {
        let result = PostmanExporter::new().export(&bundle(), &ExportOptions::default());
        let imported =
            PostmanImporter::new().import(&result.data.unwrap(), &ImportOptions::default());
        assert!(imported.success, "{:?}", imported.errors);
        assert_eq!(imported.collections.len(), 2);
        assert_eq!(imported.requests.len(), 2);

        let create = &imported.requests[0];
        assert_eq!(create.method, "POST");
        assert_eq!(create.url, "https://shop.test/orders");
        assert_eq!(
            create.query_params,
            vec![KeyValue::with_enabled("dry", "true", false)]
        );
        assert_eq!(create.body.as_ref().unwrap().body_type, BodyType::Json);
    }
}
