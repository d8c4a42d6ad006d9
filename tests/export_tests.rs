//! Export module tests

use api_interchange_sdk::export::json::ENVELOPE_VERSION;
use api_interchange_sdk::import::{
    curl::CurlImporter, json::JsonImporter, openapi::OpenApiImporter, postman::PostmanImporter,
};
use api_interchange_sdk::{
    BodyType, Collection, CurlExporter, Environment, ExportBundle, ExportOptions, FormatId,
    HarExporter, ImportOptions, JsonExporter, KeyValue, PostmanExporter, Request, RequestBody,
    Variable, VariableScope,
};
use serde_json::Value;

const PETSTORE: &str = r#"{
  "openapi": "3.0.0",
  "info": {"title": "Petstore"},
  "servers": [{"url": "https://pets.test/v1"}],
  "paths": {
    "/pets": {
      "get": {"summary": "List pets", "parameters": [{"name": "X-Trace", "in": "header", "example": "abc"}]},
      "post": {
        "summary": "Create pet",
        "requestBody": {"content": {"application/json": {"example": {"name": "Rex"}}}}
      }
    },
    "/pets/{petId}": {
      "delete": {"summary": "Delete pet"}
    }
  }
}"#;

fn petstore_bundle() -> ExportBundle {
    let result = OpenApiImporter::new().import(PETSTORE, &ImportOptions::default());
    assert!(result.success, "{:?}", result.errors);
    ExportBundle::from(result)
}

mod json_export_tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let result = JsonExporter::new().export(&petstore_bundle(), &ExportOptions::default());
        assert!(result.success);
        assert_eq!(result.format, FormatId::Json);
        assert_eq!(result.metadata.item_count, 3);

        let data = result.data.unwrap();
        assert_eq!(result.metadata.size, data.len());
        let envelope: Value = serde_json::from_str(&data).unwrap();
        assert_eq!(envelope["version"], ENVELOPE_VERSION);
        assert!(envelope["exportedAt"].is_string());
        assert_eq!(envelope["collections"].as_array().unwrap().len(), 1);
        assert_eq!(envelope["requests"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_round_trip_preserves_requests() {
        let bundle = petstore_bundle();
        let exported = JsonExporter::new().export(&bundle, &ExportOptions::default());
        let reimported =
            JsonImporter::new().import(&exported.data.unwrap(), &ImportOptions::default());
        assert!(reimported.success, "{:?}", reimported.errors);
        assert_eq!(reimported.requests.len(), bundle.requests.len());

        for (original, copy) in bundle.requests.iter().zip(&reimported.requests) {
            assert_eq!(original.name, copy.name);
            assert_eq!(original.method, copy.method);
            assert_eq!(original.url, copy.url);
            assert_eq!(original.headers, copy.headers);
            assert_ne!(original.id, copy.id);
        }
        let collection = &reimported.collections[0];
        assert_eq!(collection.requests.len(), 3);
        assert!(
            reimported
                .requests
                .iter()
                .all(|r| r.collection_id.as_deref() == Some(collection.id.as_str()))
        );
    }

    #[test]
    fn test_invalid_entities_are_dropped() {
        let mut nameless = Collection::new("");
        nameless.description = Some("dropped".to_string());
        let mut no_url = Request::new("No URL", "GET", "");
        no_url.url = String::new();
        let bundle = ExportBundle::new(
            vec![nameless, Collection::new("Kept")],
            vec![no_url, Request::new("Ok", "GET", "https://a.test")],
        );

        let result = JsonExporter::new().export(&bundle, &ExportOptions::default());
        assert!(result.success);
        assert_eq!(result.warnings.len(), 2);
        assert_eq!(result.metadata.item_count, 1);
        let envelope: Value = serde_json::from_str(&result.data.unwrap()).unwrap();
        assert_eq!(envelope["collections"][0]["name"], "Kept");
    }

    #[test]
    fn test_environments_follow_option() {
        let base_url = Variable::new(
            "baseUrl",
            "https://staging.test",
            VariableScope::Environment,
        );
        let env = Environment::new("Staging", vec![base_url]);
        let bundle = petstore_bundle().with_environments(vec![env]);

        let with = JsonExporter::new().export(&bundle, &ExportOptions::default());
        let envelope: Value = serde_json::from_str(&with.data.unwrap()).unwrap();
        assert_eq!(envelope["environments"][0]["name"], "Staging");

        let options = ExportOptions {
            include_environments: false,
            ..ExportOptions::default()
        };
        let without = JsonExporter::new().export(&bundle, &options);
        let envelope: Value = serde_json::from_str(&without.data.unwrap()).unwrap();
        assert!(envelope.get("environments").is_none());
    }

    #[test]
    fn test_compact_output() {
        let options = ExportOptions {
            prettify: false,
            ..ExportOptions::default()
        };
        let result = JsonExporter::new().export(&petstore_bundle(), &options);
        assert!(!result.data.unwrap().contains('\n'));
    }
}

mod curl_export_tests {
    use super::*;

    #[test]
    fn test_commands_reimport() {
        let bundle = petstore_bundle();
        let result = CurlExporter::new().export(&bundle, &ExportOptions::default());
        assert!(result.success);
        let script = result.data.unwrap();
        assert!(script.starts_with("# List pets\ncurl"));

        let reimported = CurlImporter::new().import(&script, &ImportOptions::default());
        assert!(reimported.success, "{:?}", reimported.errors);
        assert_eq!(reimported.requests.len(), 3);

        let create = &reimported.requests[1];
        assert_eq!(create.method, "POST");
        assert_eq!(create.url, "https://pets.test/v1/pets");
        let original = &bundle.requests[1].body.as_ref().unwrap().content;
        let original: Value = serde_json::from_str(original).unwrap();
        let copied: Value = serde_json::from_str(&create.body.as_ref().unwrap().content).unwrap();
        assert_eq!(original, copied);

        let delete = &reimported.requests[2];
        assert_eq!(delete.method, "DELETE");
        assert_eq!(delete.url, "https://pets.test/v1/pets/{petId}");
    }
}

mod postman_export_tests {
    use super::*;

    #[test]
    fn test_bodies_map_to_modes() {
        let mut form = Request::new("Form", "POST", "https://a.test/form");
        form.body = Some(RequestBody::from_pairs(
            BodyType::FormData,
            &[KeyValue::new("file", "a.txt")],
        ));
        let mut graphql = Request::new("Query", "POST", "https://a.test/graphql");
        graphql.body = Some(RequestBody::graphql("{ me { id } }", serde_json::json!({"x": 1})));

        let bundle = ExportBundle::new(Vec::new(), vec![form, graphql]);
        let result = PostmanExporter::new().export(&bundle, &ExportOptions::default());
        let doc: Value = serde_json::from_str(&result.data.unwrap()).unwrap();

        assert_eq!(doc["info"]["name"], "Exported Collection");
        let form_body = &doc["item"][0]["request"]["body"];
        assert_eq!(form_body["mode"], "formdata");
        assert_eq!(form_body["formdata"][0]["type"], "text");
        let graphql_body = &doc["item"][1]["request"]["body"];
        assert_eq!(graphql_body["mode"], "graphql");
        assert_eq!(graphql_body["graphql"]["query"], "{ me { id } }");
    }

    #[test]
    fn test_several_roots_become_folders() {
        let roots = vec![Collection::new("A"), Collection::new("B")];
        let bundle = ExportBundle::new(roots, Vec::new());
        let result = PostmanExporter::new().export(&bundle, &ExportOptions::default());
        let doc: Value = serde_json::from_str(&result.data.unwrap()).unwrap();
        assert_eq!(doc["item"][0]["name"], "A");
        assert_eq!(doc["item"][1]["name"], "B");
    }

    #[test]
    fn test_postman_round_trip() {
        let exported =
            PostmanExporter::new().export(&petstore_bundle(), &ExportOptions::default());
        let reimported =
            PostmanImporter::new().import(&exported.data.unwrap(), &ImportOptions::default());
        assert!(reimported.success);
        assert_eq!(reimported.collections[0].name, "Petstore");
        assert_eq!(reimported.requests.len(), 3);
        assert_eq!(reimported.requests[0].header("X-Trace"), Some("abc"));
    }
}

mod har_export_tests {
    use super::*;

    #[test]
    fn test_one_entry_per_request() {
        let result = HarExporter::new().export(&petstore_bundle(), &ExportOptions::default());
        assert!(result.success);
        let doc: Value = serde_json::from_str(&result.data.unwrap()).unwrap();
        let entries = doc["log"]["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 3);
        let post_data = &entries[1]["request"]["postData"];
        assert_eq!(post_data["mimeType"], "application/json");
        assert_eq!(entries[1]["response"]["status"], 0);
        assert_eq!(doc["log"]["creator"]["name"], "api-interchange-sdk");
    }
}
