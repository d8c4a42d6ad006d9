//! Format identifiers
//!
//! Closed enumeration of every supported format/version. The string forms
//! are part of the public contract and must round-trip through `FromStr`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatId {
    #[serde(rename = "openapi-3.0")]
    OpenApi30,
    #[serde(rename = "openapi-3.1")]
    OpenApi31,
    #[serde(rename = "swagger-2.0")]
    Swagger20,
    #[serde(rename = "postman-v2.1")]
    PostmanV21,
    #[serde(rename = "insomnia-v4")]
    InsomniaV4,
    #[serde(rename = "har")]
    Har,
    #[serde(rename = "curl")]
    Curl,
    #[serde(rename = "graphql-schema")]
    GraphqlSchema,
    #[serde(rename = "asyncapi-2.0")]
    AsyncApi20,
    #[serde(rename = "asyncapi-3.0")]
    AsyncApi30,
    #[serde(rename = "raml-1.0")]
    Raml10,
    #[serde(rename = "wadl")]
    Wadl,
    #[serde(rename = "wsdl-1.1")]
    Wsdl11,
    #[serde(rename = "soapui")]
    SoapUi,
    #[serde(rename = "aws-gateway")]
    AwsGateway,
    #[serde(rename = "azure-apim")]
    AzureApim,
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "protobuf-3")]
    Protobuf3,
}

impl FormatId {
    /// Every identifier, in declaration order
    pub const ALL: [FormatId; 18] = [
        FormatId::OpenApi30,
        FormatId::OpenApi31,
        FormatId::Swagger20,
        FormatId::PostmanV21,
        FormatId::InsomniaV4,
        FormatId::Har,
        FormatId::Curl,
        FormatId::GraphqlSchema,
        FormatId::AsyncApi20,
        FormatId::AsyncApi30,
        FormatId::Raml10,
        FormatId::Wadl,
        FormatId::Wsdl11,
        FormatId::SoapUi,
        FormatId::AwsGateway,
        FormatId::AzureApim,
        FormatId::Json,
        FormatId::Protobuf3,
    ];

    /// Wire identifier, e.g. `openapi-3.0`
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatId::OpenApi30 => "openapi-3.0",
            FormatId::OpenApi31 => "openapi-3.1",
            FormatId::Swagger20 => "swagger-2.0",
            FormatId::PostmanV21 => "postman-v2.1",
            FormatId::InsomniaV4 => "insomnia-v4",
            FormatId::Har => "har",
            FormatId::Curl => "curl",
            FormatId::GraphqlSchema => "graphql-schema",
            FormatId::AsyncApi20 => "asyncapi-2.0",
            FormatId::AsyncApi30 => "asyncapi-3.0",
            FormatId::Raml10 => "raml-1.0",
            FormatId::Wadl => "wadl",
            FormatId::Wsdl11 => "wsdl-1.1",
            FormatId::SoapUi => "soapui",
            FormatId::AwsGateway => "aws-gateway",
            FormatId::AzureApim => "azure-apim",
            FormatId::Json => "json",
            FormatId::Protobuf3 => "protobuf-3",
        }
    }

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            FormatId::OpenApi30 => "OpenAPI 3.0",
            FormatId::OpenApi31 => "OpenAPI 3.1",
            FormatId::Swagger20 => "Swagger 2.0",
            FormatId::PostmanV21 => "Postman Collection v2.1",
            FormatId::InsomniaV4 => "Insomnia Export v4",
            FormatId::Har => "HTTP Archive",
            FormatId::Curl => "cURL",
            FormatId::GraphqlSchema => "GraphQL SDL",
            FormatId::AsyncApi20 => "AsyncAPI 2.x",
            FormatId::AsyncApi30 => "AsyncAPI 3.0",
            FormatId::Raml10 => "RAML 1.0",
            FormatId::Wadl => "WADL",
            FormatId::Wsdl11 => "WSDL 1.1",
            FormatId::SoapUi => "SoapUI Project",
            FormatId::AwsGateway => "AWS API Gateway",
            FormatId::AzureApim => "Azure API Management",
            FormatId::Json => "Native JSON",
            FormatId::Protobuf3 => "Protocol Buffers 3",
        }
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FormatId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        FormatId::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == normalized)
            .or(match normalized.as_str() {
                "openapi" | "openapi3" => Some(FormatId::OpenApi30),
                "swagger" => Some(FormatId::Swagger20),
                "postman" => Some(FormatId::PostmanV21),
                "insomnia" => Some(FormatId::InsomniaV4),
                "graphql" => Some(FormatId::GraphqlSchema),
                "asyncapi" => Some(FormatId::AsyncApi20),
                "raml" => Some(FormatId::Raml10),
                "wsdl" => Some(FormatId::Wsdl11),
                "protobuf" | "proto" => Some(FormatId::Protobuf3),
                _ => None,
            })
            .ok_or_else(|| format!("Unknown format: {}", s))
    }
}
