//! Canonical model shared by every importer and exporter
//!
//! Collections, requests, environments and variables. Entities are built
//! fresh on every import call and carry no behaviour beyond small
//! construction helpers.

pub mod collection;
pub mod environment;
pub mod request;

pub use collection::Collection;
pub use environment::{Environment, Variable, VariableScope, VariableType};
pub use request::{
    BodyType, KeyValue, Protocol, Request, RequestBody, name_from_url, parse_query_string,
    split_query,
};

/// Generate a fresh entity identifier (UUID v4)
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
