//! Format registry tests

use api_interchange_sdk::{
    ExportBundle, ExportOptions, FormatId, FormatRegistry, ImportOptions, Importer, Request,
};
use serde_json::Value;

const SOAPUI_WITH_WSDL_MARKERS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<con:soapui-project name="Calc" soapui-version="5.7.0" xmlns:con="http://eviware.com/soapui/config">
  <!-- interface definitions generated from http://schemas.xmlsoap.org/wsdl/ -->
  <con:interface xsi:type="con:WsdlInterface" name="CalculatorSoap" soapVersion="1_1" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
    <con:endpoints><con:endpoint>http://calc.test/calculator.asmx</con:endpoint></con:endpoints>
    <con:operation name="Add" action="http://tempuri.org/Add">
      <con:call name="Request 1">
        <con:endpoint>http://calc.test/calculator.asmx</con:endpoint>
        <con:request><![CDATA[<soapenv:Envelope><soapenv:Body><tem:Add/></soapenv:Body></soapenv:Envelope>]]></con:request>
      </con:call>
    </con:operation>
  </con:interface>
</con:soapui-project>"#;

mod registry_tests {
    use super::*;

    #[test]
    fn test_detects_each_family() {
        let registry = FormatRegistry::new();
        let cases = [
            ("curl https://a.test", Importer::Curl),
            ("#%RAML 1.0\ntitle: T\n", Importer::Raml),
            ("type Query { ping: String }", Importer::Graphql),
            (
                "syntax = \"proto3\";\nservice Ping { rpc Ping(Empty) returns (Empty); }",
                Importer::Protobuf,
            ),
            (r#"{"log": {"version": "1.2", "entries": []}}"#, Importer::Har),
            ("openapi: 3.0.3\ninfo:\n  title: T\npaths: {}\n", Importer::OpenApi),
            ("asyncapi: 2.6.0\ninfo:\n  title: T\nchannels: {}\n", Importer::AsyncApi),
            (
                r#"{"info": {"name": "C", "schema": "https://schema.getpostman.com/json/collection/v2.1.0/collection.json"}, "item": []}"#,
                Importer::Postman,
            ),
        ];
        for (content, expected) in cases {
            assert_eq!(registry.detect(content), Some(expected), "{}", content);
        }
    }

    #[test]
    fn test_ambiguous_content_takes_priority_and_warns() {
        let registry = FormatRegistry::new();
        let candidates = registry.candidates(SOAPUI_WITH_WSDL_MARKERS);
        assert_eq!(candidates, vec![Importer::SoapUi, Importer::Wsdl]);

        let result = registry.import(SOAPUI_WITH_WSDL_MARKERS, None, &ImportOptions::default());
        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.metadata.format, Some(FormatId::SoapUi));
        assert!(
            result
                .warnings
                .iter()
                .any(|w| w.starts_with("Content was also recognised as"))
        );
    }

    #[test]
    fn test_explicit_format_skips_detection() {
        let registry = FormatRegistry::new();
        let result = registry.import(
            SOAPUI_WITH_WSDL_MARKERS,
            Some(FormatId::SoapUi),
            &ImportOptions::default(),
        );
        assert!(result.success);
        assert!(
            !result
                .warnings
                .iter()
                .any(|w| w.starts_with("Content was also recognised as"))
        );

        let forced = registry.import(
            "curl https://a.test",
            Some(FormatId::Har),
            &ImportOptions::default(),
        );
        assert!(!forced.success);
        assert_eq!(forced.metadata.format, Some(FormatId::Har));
    }

    #[test]
    fn test_unrecognised_content() {
        let registry = FormatRegistry::new();
        assert!(registry.detect("hello world").is_none());
        let result = registry.import("hello world", None, &ImportOptions::default());
        assert!(!result.success);
        assert!(result.requests.is_empty());
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_format_lists() {
        let registry = FormatRegistry::new();
        let imports = registry.import_formats();
        for format in FormatId::ALL {
            assert!(imports.contains(&format), "{}", format);
        }
        assert_eq!(
            registry.export_formats(),
            vec![FormatId::Json, FormatId::Curl, FormatId::PostmanV21, FormatId::Har]
        );
        assert!(registry.exporter_for(FormatId::OpenApi30).is_none());
    }

    #[test]
    fn test_export_rejects_import_only_formats() {
        let ping = Request::new("Ping", "GET", "https://a.test");
        let bundle = ExportBundle::new(Vec::new(), vec![ping]);
        let result =
            FormatRegistry::new().export(FormatId::Raml10, &bundle, &ExportOptions::default());
        assert!(!result.success);
        assert!(result.data.is_none());
        assert_eq!(result.format, FormatId::Raml10);
    }
}

mod convert_tests {
    use super::*;

    #[test]
    fn test_openapi_to_postman() {
        let doc = r#"{
          "openapi": "3.0.0",
          "info": {"title": "Pets"},
          "servers": [{"url": "https://pets.test"}],
          "paths": {"/pets": {"get": {"summary": "List pets"}}}
        }"#;
        let result = FormatRegistry::new().convert(
            doc,
            None,
            FormatId::PostmanV21,
            &ImportOptions::default(),
            &ExportOptions::default(),
        );
        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.metadata.item_count, 1);

        let collection: Value = serde_json::from_str(&result.data.unwrap()).unwrap();
        assert_eq!(collection["info"]["name"], "Pets");
        let url = &collection["item"][0]["request"]["url"];
        assert_eq!(url["raw"], "https://pets.test/pets");
    }

    #[test]
    fn test_import_warnings_are_carried() {
        let doc = "openapi: 3.0.0\ninfo:\n  title: Empty\n";
        let result = FormatRegistry::new().convert(
            doc,
            Some(FormatId::OpenApi30),
            FormatId::Json,
            &ImportOptions::default(),
            &ExportOptions::default(),
        );
        assert!(result.success, "{:?}", result.errors);
        assert!(
            result
                .warnings
                .iter()
                .any(|w| w == "Document declares no paths")
        );
    }

    #[test]
    fn test_failed_import_fails_conversion() {
        let result = FormatRegistry::new().convert(
            "{ not valid",
            Some(FormatId::PostmanV21),
            FormatId::Curl,
            &ImportOptions::default(),
            &ExportOptions::default(),
        );
        assert!(!result.success);
        assert!(result.data.is_none());
        assert!(!result.errors.is_empty());
    }
}
