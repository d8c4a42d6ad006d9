//! cURL command engine
//!
//! Parses shell-style cURL invocations into [`Request`]s and generates
//! commands back from them.
//!
//! [`Request`]: crate::models::Request

mod generate;
mod parse;

pub use generate::generate_curl;
pub use parse::{parse_curl, split_commands};
pub(crate) use parse::is_curl_token;

use thiserror::Error;

/// Failure to turn a command into a request
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CurlError {
    #[error("Not a cURL command")]
    NotCurl,
    #[error("Unbalanced quotes in cURL command")]
    Tokenize,
    #[error("No URL found in cURL command")]
    MissingUrl,
}
