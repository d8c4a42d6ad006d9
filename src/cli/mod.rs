//! Command line interface support (feature `cli`)

pub mod commands;
pub mod error;
