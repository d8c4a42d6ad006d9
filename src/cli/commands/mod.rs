//! CLI command implementations

pub mod convert;
pub mod detect;
pub mod export;
pub mod import;
