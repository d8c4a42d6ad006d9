//! cURL command importer
//!
//! A document may hold several commands. Each is parsed independently; a
//! command that cannot be parsed is skipped with a warning.

use super::{ImportContext, ImportError, ImportOptions, ImportResult};
use crate::curl::{is_curl_token, parse_curl, split_commands};
use crate::formats::FormatId;

/// cURL command importer
#[derive(Debug, Default)]
pub struct CurlImporter;

impl CurlImporter {
    pub fn new() -> Self {
        Self
    }

    /// The first non-comment line must invoke `curl`
    pub fn can_import(&self, content: &str) -> bool {
        content
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.starts_with('#'))
            .and_then(|line| line.split_whitespace().next())
            .is_some_and(|token| is_curl_token(token.trim_matches(|c| c == '\'' || c == '"')))
    }

    /// Import one or more cURL commands.
    ///
    /// # Example
    ///
    /// ```rust
    /// use api_interchange_sdk::import::{ImportOptions, curl::CurlImporter};
    ///
    /// let commands = "curl https://a.test/one\ncurl -X DELETE https://a.test/two\n";
    /// let result = CurlImporter::new().import(commands, &ImportOptions::default());
    /// assert_eq!(result.requests.len(), 2);
    /// assert!(result.collections.is_empty());
    /// ```
    pub fn import(&self, content: &str, options: &ImportOptions) -> ImportResult {
        match self.parse(content, options) {
            Ok(ctx) => ctx.finish(),
            Err(e) => ImportResult::failure(Some(FormatId::Curl), e),
        }
    }

    fn parse(&self, content: &str, _options: &ImportOptions) -> Result<ImportContext, ImportError> {
        let commands = split_commands(content);
        if commands.is_empty() {
            return Err(ImportError::ParseError("no cURL command found".to_string()));
        }

        let mut ctx = ImportContext::new(FormatId::Curl);
        let mut first_error = None;
        for (index, command) in commands.iter().enumerate() {
            match parse_curl(command) {
                Ok(request) => ctx.add_request(request, None),
                Err(e) => {
                    ctx.warn(format!("Skipped command {}: {}", index + 1, e));
                    first_error.get_or_insert(e);
                }
            }
        }

        if ctx.requests.is_empty() {
            let reason = first_error.map(|e| e.to_string()).unwrap_or_default();
            return Err(ImportError::ParseError(format!(
                "no parsable cURL command: {}",
                reason
            )));
        }
        Ok(ctx)
    }
}
