//! CLI configuration file support
//!
//! Handles parsing of `.api-interchange.toml` configuration files and
//! environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::export::ExportOptions;
use crate::formats::FormatId;
use crate::import::ImportOptions;

/// Default configuration filename
pub const CONFIG_FILENAME: &str = ".api-interchange.toml";

/// Environment variable for pretty-printed export output
pub const ENV_PRETTIFY: &str = "API_INTERCHANGE_PRETTIFY";

/// Environment variable for the base URL substituted into imported requests
pub const ENV_BASE_URL: &str = "API_INTERCHANGE_BASE_URL";

/// Environment variable for the default export format
pub const ENV_EXPORT_FORMAT: &str = "API_INTERCHANGE_EXPORT_FORMAT";

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    IoError(String),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
    #[error("Failed to serialize config: {0}")]
    SerializationError(String),
}

fn default_true() -> bool {
    true
}

fn default_export_format() -> FormatId {
    FormatId::Json
}

/// Import configuration section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSection {
    /// Emit environments for formats that carry them
    #[serde(default = "default_true")]
    pub include_environments: bool,

    /// Emit variables for formats that carry them
    #[serde(default = "default_true")]
    pub include_variables: bool,

    /// Base URL used instead of the `{{baseUrl}}` placeholder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for ImportSection {
    fn default() -> Self {
        Self {
            include_environments: true,
            include_variables: true,
            base_url: None,
        }
    }
}

/// Export configuration section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSection {
    /// Pretty-print structured output
    #[serde(default = "default_true")]
    pub prettify: bool,

    /// Write environments for formats that can hold them
    #[serde(default = "default_true")]
    pub include_environments: bool,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            prettify: true,
            include_environments: true,
        }
    }
}

/// Main configuration structure
///
/// Represents the `.api-interchange.toml` configuration file format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterchangeConfig {
    /// Target format for `convert` and `export` when none is given
    #[serde(default = "default_export_format")]
    pub default_export_format: FormatId,

    #[serde(default)]
    pub import: ImportSection,

    #[serde(default)]
    pub export: ExportSection,
}

impl Default for InterchangeConfig {
    fn default() -> Self {
        Self {
            default_export_format: default_export_format(),
            import: ImportSection::default(),
            export: ExportSection::default(),
        }
    }
}

impl InterchangeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a directory
    ///
    /// A missing file yields the defaults. Environment overrides are applied
    /// in both cases.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let config_path = dir.join(CONFIG_FILENAME);

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            Self::parse(&content)?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to a directory
    pub fn save(&self, dir: &Path) -> Result<(), ConfigError> {
        let content = self.to_toml()?;
        std::fs::write(dir.join(CONFIG_FILENAME), content)
            .map_err(|e| ConfigError::IoError(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::SerializationError(e.to_string()))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup; unparsable values are ignored
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(prettify) = lookup(ENV_PRETTIFY)
            && let Some(prettify) = parse_flag(&prettify)
        {
            self.export.prettify = prettify;
        }

        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.import.base_url = Some(base_url).filter(|u| !u.trim().is_empty());
        }

        if let Some(format) = lookup(ENV_EXPORT_FORMAT)
            && let Ok(format) = format.parse()
        {
            self.default_export_format = format;
        }
    }

    pub fn import_options(&self) -> ImportOptions {
        ImportOptions {
            include_environments: self.import.include_environments,
            include_variables: self.import.include_variables,
            base_url: self.import.base_url.clone(),
        }
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            prettify: self.export.prettify,
            include_environments: self.export.include_environments,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Generate a sample configuration file content
pub fn sample_config() -> &'static str {
    r#"# API interchange configuration

# Target format for `export` and `convert` when --format/--to is omitted
default_export_format = "postman-v2.1"

[import]
include_environments = true
include_variables = true
# Replaces {{baseUrl}} in documents that declare no server
# base_url = "https://api.example.com"

[export]
prettify = true
include_environments = true
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = InterchangeConfig::new();
        assert_eq!(config.default_export_format, FormatId::Json);
        assert!(config.import.include_environments);
        assert!(config.export.prettify);
        assert_eq!(config.import_options(), ImportOptions::default());
        assert_eq!(config.export_options(), ExportOptions::default());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
default_export_format = "har"

[import]
include_variables = false
base_url = "https://api.test"

[export]
prettify = false
"#;
        let config = InterchangeConfig::parse(toml).unwrap();
        assert_eq!(config.default_export_format, FormatId::Har);
        assert!(config.import.include_environments);
        assert!(!config.import.include_variables);
        let options = config.import_options();
        assert_eq!(options.base_url.as_deref(), Some("https://api.test"));
        assert!(!config.export_options().prettify);
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let result = InterchangeConfig::parse("default_export_format = \"yaml\"");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_PRETTIFY, "false"),
            (ENV_BASE_URL, "http://localhost:8080"),
            (ENV_EXPORT_FORMAT, "postman"),
        ]);
        let mut config = InterchangeConfig::new();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert!(!config.export.prettify);
        let base_url = config.import.base_url.as_deref();
        assert_eq!(base_url, Some("http://localhost:8080"));
        assert_eq!(config.default_export_format, FormatId::PostmanV21);
    }

    #[test]
    fn test_invalid_overrides_are_ignored() {
        let mut config = InterchangeConfig::new();
        config.apply_overrides(|key| match key {
            ENV_PRETTIFY => Some("maybe".to_string()),
            ENV_EXPORT_FORMAT => Some("yaml".to_string()),
            _ => None,
        });
        assert_eq!(config, InterchangeConfig::new());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let mut config = InterchangeConfig::new();
        config.default_export_format = FormatId::Curl;
        config.export.include_environments = false;

        config.save(dir.path()).unwrap();
        assert!(dir.path().join(CONFIG_FILENAME).exists());

        let text = std::fs::read_to_string(dir.path().join(CONFIG_FILENAME)).unwrap();
        let loaded = InterchangeConfig::parse(&text).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_sample_config_is_valid() {
        let config = InterchangeConfig::parse(sample_config()).unwrap();
        assert_eq!(config.default_export_format, FormatId::PostmanV21);
    }
}
