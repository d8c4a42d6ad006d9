//! Native JSON importer
//!
//! Reads the envelope written by the JSON exporter. Identifiers are
//! regenerated on import and every cross reference (folders, collection
//! membership, request owner) is remapped to the new values.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{
    ImportContext, ImportError, ImportOptions, ImportResult, array_field, parse_json_document,
};
use crate::formats::FormatId;
use crate::models::{Collection, Environment, Request, Variable, generate_id};

/// Native JSON envelope importer
#[derive(Debug, Default)]
pub struct JsonImporter;

impl JsonImporter {
    pub fn new() -> Self {
        Self
    }

    pub fn can_import(&self, content: &str) -> bool {
        let Ok(doc) = parse_json_document(content) else {
            return false;
        };
        doc.get("version").is_some()
            && doc.get("exportedAt").is_some()
            && (doc.get("collections").is_some_and(Value::is_array)
                || doc.get("requests").is_some_and(Value::is_array))
    }

    pub fn import(&self, content: &str, options: &ImportOptions) -> ImportResult {
        match self.parse(content, options) {
            Ok(ctx) => ctx.finish(),
            Err(e) => ImportResult::failure(Some(FormatId::Json), e),
        }
    }

    fn parse(&self, content: &str, options: &ImportOptions) -> Result<ImportContext, ImportError> {
        let doc = parse_json_document(content)?;
        if !doc.is_object() || (doc.get("collections").is_none() && doc.get("requests").is_none()) {
            return Err(ImportError::InvalidDocument(
                "expected an envelope with collections or requests".to_string(),
            ));
        }

        let mut ctx = ImportContext::new(FormatId::Json);
        let mut collections: Vec<Collection> = entries(&doc, "collections", &mut ctx);
        let mut requests: Vec<Request> = entries(&doc, "requests", &mut ctx);

        collections.retain(|c| !c.name.trim().is_empty());
        let collection_ids: HashMap<String, String> = collections
            .iter_mut()
            .map(|c| {
                let fresh = generate_id();
                (std::mem::replace(&mut c.id, fresh.clone()), fresh)
            })
            .collect();
        let request_ids: HashMap<String, String> = requests
            .iter_mut()
            .map(|r| {
                let fresh = generate_id();
                (std::mem::replace(&mut r.id, fresh.clone()), fresh)
            })
            .collect();

        for collection in &mut collections {
            collection.folders = remap(&collection.folders, &collection_ids);
            collection.requests = remap(&collection.requests, &request_ids);
        }
        for request in &mut requests {
            request.collection_id = request
                .collection_id
                .as_ref()
                .and_then(|id| collection_ids.get(id).cloned());
            if let Some(owner_id) = &request.collection_id {
                if let Some(owner) = collections.iter_mut().find(|c| &c.id == owner_id) {
                    if !owner.requests.contains(&request.id) {
                        owner.requests.push(request.id.clone());
                    }
                }
            }
        }

        ctx.collections = collections;
        ctx.requests = requests;

        if options.include_environments {
            let mut environments: Vec<Environment> = entries(&doc, "environments", &mut ctx);
            for environment in &mut environments {
                environment.id = generate_id();
            }
            ctx.environments = environments;
        }
        if options.include_variables {
            ctx.variables = entries::<Variable>(&doc, "variables", &mut ctx);
        }
        Ok(ctx)
    }
}

/// Deserialize each array element on its own so one bad entry only costs a warning
fn entries<T: DeserializeOwned>(doc: &Value, key: &str, ctx: &mut ImportContext) -> Vec<T> {
    let mut parsed = Vec::new();
    for (index, entry) in array_field(doc, key).iter().enumerate() {
        let mut entry = entry.clone();
        if let Some(object) = entry.as_object_mut() {
            object
                .entry("id")
                .or_insert_with(|| Value::String(String::new()));
        }
        match serde_json::from_value::<T>(entry) {
            Ok(value) => parsed.push(value),
            Err(e) => ctx.warn(format!("Skipped {} entry {}: {}", key, index, e)),
        }
    }
    parsed
}

fn remap(ids: &[String], mapping: &HashMap<String, String>) -> Vec<String> {
    ids.iter()
        .filter_map(|id| mapping.get(id).cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENVELOPE: &str = r#"{
  "version": "1.0",
  "exportedAt": "2024-01-01T00:00:00Z",
  "collections": [
    {"id": "c1", "name": "Root", "folders": ["c2"], "requests": ["r1"]},
    {"id": "c2", "name": "Child", "folders": [], "requests": ["r2"]},
    {"id": "c3", "name": ""}
  ],
  "requests": [
    {"id": "r1", "name": "List", "method": "GET", "url": "https://a.test/items", "collectionId": "c1"},
    {"id": "r2", "name": "Create", "method": "POST", "url": "https://a.test/items", "collectionId": "c2",
     "headers": [{"key": "Content-Type", "value": "application/json"}]},
    {"id": "r3", "name": "Broken", "method": "GET", "url": ""},
    {"name": "no method"}
  ]
}"#;

    #[test]
    fn test_identifiers_are_regenerated_and_remapped() {
        let result = JsonImporter::new().import(ENVELOPE, &ImportOptions::default());
        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.collections.len(), 2);
        assert_eq!(result.requests.len(), 2);

        let root = &result.collections[0];
        let child = &result.collections[1];
        assert_ne!(root.id, "c1");
        assert_eq!(root.folders, vec![child.id.clone()]);
        assert_eq!(root.requests, vec![result.requests[0].id.clone()]);
        let create = &result.requests[1];
        assert_eq!(create.collection_id.as_deref(), Some(child.id.as_str()));
        assert_eq!(result.requests[1].headers[0].key, "Content-Type");
    }

    #[test]
    fn test_bad_entries_become_warnings() {
        let result = JsonImporter::new().import(ENVELOPE, &ImportOptions::default());
        // one undeserializable request, one request without URL
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn test_rejects_non_envelope() {
        let result = JsonImporter::new().import("[1, 2]", &ImportOptions::default());
        assert!(!result.success);
        assert!(!JsonImporter::new().can_import("{\"openapi\": \"3.0.0\"}"));
    }
}
