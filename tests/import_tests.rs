//! Import module tests

use api_interchange_sdk::import::{
    ImportOptions, api_gateway::ApiGatewayImporter, asyncapi::AsyncApiImporter,
    graphql::GraphqlImporter, har::HarImporter, openapi::OpenApiImporter, raml::RamlImporter,
};
use api_interchange_sdk::{BodyType, FormatId, KeyValue, Protocol};
use serde_json::{Value, json};

mod openapi_import_tests {
    use super::*;

    const USERS_API: &str = r#"
openapi: 3.0.3
info:
  title: Users API
servers:
  - url: https://api.example.com
paths:
  /users:
    get:
      summary: List users
      parameters:
        - name: limit
          in: query
          schema:
            type: integer
            default: 20
    post:
      summary: Create user
      requestBody:
        content:
          application/json:
            schema:
              $ref: '#/components/schemas/User'
components:
  schemas:
    User:
      type: object
      properties:
        name:
          type: string
        email:
          type: string
          format: email
"#;

    #[test]
    fn test_two_verbs_one_collection() {
        let importer = OpenApiImporter::new();
        assert!(importer.can_import(USERS_API));
        let result = importer.import(USERS_API, &ImportOptions::default());

        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.metadata.format, Some(FormatId::OpenApi30));
        assert_eq!(result.collections.len(), 1);
        assert_eq!(result.collections[0].name, "Users API");
        assert_eq!(result.requests.len(), 2);
        assert_eq!(result.metadata.item_count, 2);

        let get = &result.requests[0];
        let post = &result.requests[1];
        assert_eq!(get.method, "GET");
        assert_eq!(post.method, "POST");
        assert_eq!(get.url, "https://api.example.com/users");
        assert_eq!(post.url, "https://api.example.com/users");
        assert_eq!(get.query_params, vec![KeyValue::new("limit", "20")]);
        assert_eq!(
            result.collections[0].requests,
            vec![get.id.clone(), post.id.clone()]
        );
    }

    #[test]
    fn test_request_body_generated_from_ref() {
        let result = OpenApiImporter::new().import(USERS_API, &ImportOptions::default());
        let body = result.requests[1].body.as_ref().unwrap();
        assert_eq!(body.body_type, BodyType::Json);
        let parsed: Value = serde_json::from_str(&body.content).unwrap();
        assert_eq!(
            parsed,
            json!({"name": "string", "email": "user@example.com"})
        );
        let content_type = result.requests[1].header("Content-Type");
        assert_eq!(content_type, Some("application/json"));
    }

    #[test]
    fn test_swagger_base_url_and_security() {
        let doc = json!({
            "swagger": "2.0",
            "info": {"title": "Legacy"},
            "host": "legacy.test",
            "basePath": "/v1",
            "schemes": ["http"],
            "securityDefinitions": {"key": {"type": "apiKey", "in": "header", "name": "X-Key"}},
            "security": [{"key": []}],
            "paths": {
                "/login": {
                    "post": {
                        "consumes": ["application/x-www-form-urlencoded"],
                        "parameters": [
                            {"name": "user", "in": "formData", "type": "string", "default": "ada"}
                        ]
                    }
                }
            }
        })
        .to_string();
        let result = OpenApiImporter::new().import(&doc, &ImportOptions::default());
        assert!(result.success);
        assert_eq!(result.metadata.format, Some(FormatId::Swagger20));

        let login = &result.requests[0];
        assert_eq!(login.url, "http://legacy.test/v1/login");
        assert_eq!(login.name, "POST /login");
        assert_eq!(login.header("X-Key"), Some("{{apiKey}}"));
        let body = login.body.as_ref().unwrap();
        assert_eq!(body.body_type, BodyType::UrlEncoded);
        assert_eq!(body.pairs(), vec![KeyValue::new("user", "ada")]);
    }

    #[test]
    fn test_missing_servers_uses_placeholder_or_option() {
        let doc = "openapi: 3.1.0\ninfo:\n  title: T\npaths:\n  /ping:\n    get: {}\n";
        let result = OpenApiImporter::new().import(doc, &ImportOptions::default());
        assert_eq!(result.metadata.format, Some(FormatId::OpenApi31));
        assert_eq!(result.requests[0].url, "{{baseUrl}}/ping");

        let options = ImportOptions {
            base_url: Some("http://localhost:3000/".to_string()),
            ..ImportOptions::default()
        };
        let result = OpenApiImporter::new().import(doc, &options);
        assert_eq!(result.requests[0].url, "http://localhost:3000/ping");
    }

    #[test]
    fn test_missing_paths_is_a_warning() {
        let doc = "openapi: 3.0.0\ninfo:\n  title: Empty\n";
        let result = OpenApiImporter::new().import(doc, &ImportOptions::default());
        assert!(result.success);
        assert!(result.requests.is_empty());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_invalid_document_fails() {
        let result = OpenApiImporter::new().import("openapi: [unclosed", &ImportOptions::default());
        assert!(!result.success);
        assert!(result.collections.is_empty());
        assert!(result.requests.is_empty());
        assert!(!result.errors.is_empty());
    }

    #[test]
    fn test_broken_document_reports_declared_version() {
        let importer = OpenApiImporter::new();
        let unclosed = "swagger: '2.0'\ninfo: [unclosed\n";
        let swagger = importer.import(unclosed, &ImportOptions::default());
        assert!(!swagger.success);
        assert_eq!(swagger.metadata.format, Some(FormatId::Swagger20));

        let truncated = r#"{"openapi": "3.1.0", "paths": {"#;
        let openapi31 = importer.import(truncated, &ImportOptions::default());
        assert!(!openapi31.success);
        assert_eq!(openapi31.metadata.format, Some(FormatId::OpenApi31));
    }
}

mod asyncapi_import_tests {
    use super::*;

    #[test]
    fn test_v2_channels() {
        let doc = r#"
asyncapi: 2.6.0
info:
  title: Orders
servers:
  production:
    url: broker.test:1883
    protocol: mqtt
channels:
  orders/created:
    publish:
      summary: Publish order
      message:
        payload:
          type: object
          properties:
            id:
              type: integer
    subscribe:
      operationId: onOrder
"#;
        let importer = AsyncApiImporter::new();
        assert!(importer.can_import(doc));
        let result = importer.import(doc, &ImportOptions::default());
        assert!(result.success);
        assert_eq!(result.metadata.format, Some(FormatId::AsyncApi20));
        assert_eq!(result.requests.len(), 2);

        let publish = &result.requests[0];
        assert_eq!(publish.method, "POST");
        assert_eq!(publish.url, "mqtt://broker.test:1883/orders/created");
        assert_eq!(publish.protocol, Protocol::Mqtt);
        assert_eq!(publish.body.as_ref().unwrap().body_type, BodyType::Json);

        let subscribe = &result.requests[1];
        assert_eq!(subscribe.method, "GET");
        assert_eq!(subscribe.name, "onOrder");
    }

    #[test]
    fn test_v3_operations() {
        let doc = json!({
            "asyncapi": "3.0.0",
            "info": {"title": "Chat"},
            "servers": {"ws": {"host": "chat.test", "protocol": "wss"}},
            "channels": {"room": {"address": "rooms/general"}},
            "operations": {
                "sendMessage": {"action": "send", "channel": {"$ref": "#/channels/room"}},
                "readMessages": {"action": "receive", "channel": {"$ref": "#/channels/room"}}
            }
        })
        .to_string();
        let result = AsyncApiImporter::new().import(&doc, &ImportOptions::default());
        assert!(result.success);
        assert_eq!(result.metadata.format, Some(FormatId::AsyncApi30));
        assert_eq!(result.requests[0].name, "sendMessage");
        assert_eq!(result.requests[0].method, "POST");
        assert_eq!(result.requests[0].url, "wss://chat.test/rooms/general");
        assert_eq!(result.requests[0].protocol, Protocol::Websocket);
        assert_eq!(result.requests[1].method, "GET");
    }
}

mod graphql_import_tests {
    use super::*;

    #[test]
    fn test_query_selects_scalar_fields() {
        let sdl = "type Query { users: [User!]! }\ntype User { id: ID! name: String! }";
        let result = GraphqlImporter::new().import(sdl, &ImportOptions::default());
        assert!(result.success);
        assert_eq!(result.requests.len(), 1);

        let request = &result.requests[0];
        assert_eq!(request.method, "POST");
        assert_eq!(request.protocol, Protocol::Graphql);
        let body = request.body.as_ref().unwrap();
        assert_eq!(body.body_type, BodyType::Graphql);

        let parsed: Value = serde_json::from_str(&body.content).unwrap();
        let query = parsed["query"].as_str().unwrap();
        assert!(query.contains("users"));
        assert!(query.contains("id"));
        assert!(query.contains("name"));
    }
}

mod har_import_tests {
    use super::*;

    #[test]
    fn test_three_entries_no_collections() {
        let har = json!({
            "log": {
                "version": "1.2",
                "creator": {"name": "browser", "version": "1"},
                "entries": [
                    {"request": {"method": "GET", "url": "https://a.test/1", "headers": []}},
                    {"request": {"method": "GET", "url": "https://a.test/2", "headers": []}},
                    {"request": {"method": "DELETE", "url": "https://a.test/3", "headers": []}}
                ]
            }
        })
        .to_string();
        let result = HarImporter::new().import(&har, &ImportOptions::default());
        assert!(result.success);
        assert_eq!(result.requests.len(), 3);
        assert!(result.collections.is_empty());
        assert!(result.requests.iter().all(|r| r.collection_id.is_none()));
    }
}

mod raml_import_tests {
    use super::*;

    #[test]
    fn test_nested_resources() {
        let doc = r#"#%RAML 1.0
title: Books
version: v2
baseUri: https://books.test/{version}
/books:
  get:
    queryParameters:
      page:
        default: 1
  /{id}:
    delete:
      displayName: Remove book
"#;
        let importer = RamlImporter::new();
        assert!(importer.can_import(doc));
        let result = importer.import(doc, &ImportOptions::default());
        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.collections[0].name, "Books");
        assert_eq!(result.requests.len(), 2);
        assert_eq!(result.requests[0].url, "https://books.test/v2/books");
        let list = &result.requests[0];
        assert_eq!(list.query_params, vec![KeyValue::new("page", "1")]);
        assert_eq!(result.requests[1].name, "Remove book");
        assert_eq!(result.requests[1].url, "https://books.test/v2/books/{id}");
    }

    #[test]
    fn test_header_is_required() {
        let result = RamlImporter::new().import("title: Books\n", &ImportOptions::default());
        assert!(!result.success);
    }
}

mod api_gateway_import_tests {
    use super::*;

    #[test]
    fn test_aws_export_goes_through_openapi_walker() {
        let doc = json!({
            "openapi": "3.0.1",
            "info": {"title": "Gateway"},
            "servers": [{"url": "https://abc.execute-api.eu-west-1.amazonaws.com/prod"}],
            "paths": {
                "/items": {
                    "get": {
                        "x-amazon-apigateway-integration": {
                            "type": "aws_proxy",
                            "uri": "arn:aws:lambda:items"
                        }
                    }
                }
            }
        })
        .to_string();
        let importer = ApiGatewayImporter::new();
        assert!(importer.can_import(&doc));
        let result = importer.import(&doc, &ImportOptions::default());
        assert_eq!(result.metadata.format, Some(FormatId::AwsGateway));
        let request = &result.requests[0];
        assert_eq!(
            request.url,
            "https://abc.execute-api.eu-west-1.amazonaws.com/prod/items"
        );
        assert_eq!(
            request.description.as_deref(),
            Some("Integration: aws_proxy arn:aws:lambda:items")
        );
    }

    #[test]
    fn test_azure_apim_template() {
        let doc = json!({
            "resources": [
                {
                    "type": "Microsoft.ApiManagement/service/apis",
                    "name": "svc/petstore",
                    "properties": {"displayName": "Pet Store", "serviceUrl": "https://pets.test"}
                },
                {
                    "type": "Microsoft.ApiManagement/service/apis/operations",
                    "name": "svc/petstore/list-pets",
                    "properties": {
                        "displayName": "List pets",
                        "method": "GET",
                        "urlTemplate": "/pets",
                        "request": {"queryParameters": [{"name": "limit", "defaultValue": "10"}]}
                    }
                }
            ]
        })
        .to_string();
        let result = ApiGatewayImporter::new().import(&doc, &ImportOptions::default());
        assert!(result.success);
        assert_eq!(result.metadata.format, Some(FormatId::AzureApim));
        assert_eq!(result.collections[0].name, "Pet Store");

        let request = &result.requests[0];
        assert_eq!(request.name, "List pets");
        assert_eq!(request.url, "https://pets.test/pets");
        assert_eq!(request.query_params, vec![KeyValue::new("limit", "10")]);
        let key = request.header("Ocp-Apim-Subscription-Key");
        assert_eq!(key, Some("{{subscriptionKey}}"));
    }

    #[test]
    fn test_broken_apim_template_reports_azure() {
        let truncated =
            r#"{"resources": [{"type": "Microsoft.ApiManagement/service/apis", "name": "svc/pets""#;
        let result = ApiGatewayImporter::new().import(truncated, &ImportOptions::default());
        assert!(!result.success);
        assert_eq!(result.metadata.format, Some(FormatId::AzureApim));
    }
}
