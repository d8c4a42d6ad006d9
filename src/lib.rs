//! API Interchange SDK - bidirectional translation between API formats
//!
//! Provides unified interfaces for:
//! - Importing API descriptions (OpenAPI, AsyncAPI, GraphQL, Protobuf, RAML,
//!   WADL, WSDL, SoapUI) and request collections (Postman, Insomnia, HAR,
//!   cURL) into one canonical model
//! - Exporting the canonical model as native JSON, cURL, Postman or HAR
//! - Format auto-detection through a fixed-priority registry
//!
//! The engine performs no I/O: callers hand it text and receive
//! [`ImportResult`]/[`ExportResult`] values.
//!
//! # Example
//!
//! ```rust
//! use api_interchange_sdk::{FormatId, FormatRegistry, ImportOptions};
//!
//! let registry = FormatRegistry::new();
//! let result = registry.import(
//!     "curl https://api.example.com/health",
//!     None,
//!     &ImportOptions::default(),
//! );
//! assert!(result.success);
//! assert_eq!(result.metadata.format, Some(FormatId::Curl));
//! ```

pub mod curl;
pub mod export;
pub mod formats;
pub mod import;
pub mod models;
pub mod registry;
pub mod schema;
pub mod xml;

#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "cli")]
pub mod config;

pub use export::{
    CurlExporter, ExportBundle, ExportError, ExportOptions, ExportResult, HarExporter,
    JsonExporter, PostmanExporter,
};
pub use formats::FormatId;
pub use import::{ImportError, ImportOptions, ImportResult};
pub use registry::{Exporter, FormatRegistry, Importer};

// Re-export models
pub use models::{
    BodyType, Collection, Environment, KeyValue, Protocol, Request, RequestBody, Variable,
    VariableScope, VariableType,
};
