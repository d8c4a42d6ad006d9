//! Environment and variable models
//!
//! Only formats with their own variable concept (Postman, Insomnia) produce
//! these.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::generate_id;

/// Value type of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    #[default]
    String,
    Number,
    Boolean,
    Secret,
}

impl VariableType {
    /// Infer the type of a JSON value
    pub fn infer(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Number(_) => VariableType::Number,
            serde_json::Value::Bool(_) => VariableType::Boolean,
            _ => VariableType::String,
        }
    }
}

/// Where a variable applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableScope {
    Global,
    #[default]
    Environment,
    Collection,
}

/// A single variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(rename = "type", default)]
    pub var_type: VariableType,
    #[serde(default)]
    pub scope: VariableScope,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Variable {
    pub fn new(key: impl Into<String>, value: impl Into<String>, scope: VariableScope) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            var_type: VariableType::String,
            scope,
            enabled: true,
        }
    }

    /// Build a variable from a JSON value, inferring its type.
    ///
    /// Non-string values are stored in their JSON text form.
    pub fn from_json(
        key: impl Into<String>,
        value: &serde_json::Value,
        scope: VariableScope,
    ) -> Self {
        let text = match value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        };
        Self {
            key: key.into(),
            value: text,
            var_type: VariableType::infer(value),
            scope,
            enabled: true,
        }
    }
}

/// Named, ordered set of variables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Environment {
    pub fn new(name: impl Into<String>, variables: Vec<Variable>) -> Self {
        let now = Utc::now();
        Environment {
            id: generate_id(),
            name: name.into(),
            variables,
            is_active: false,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_variable_from_json_infers_type() {
        let number = Variable::from_json("port", &json!(8080), VariableScope::Environment);
        assert_eq!(number.value, "8080");
        assert_eq!(number.var_type, VariableType::Number);

        let flag = Variable::from_json("debug", &json!(false), VariableScope::Collection);
        assert_eq!(flag.value, "false");
        assert_eq!(flag.var_type, VariableType::Boolean);

        let text = Variable::from_json("host", &json!("api.test"), VariableScope::Global);
        assert_eq!(text.value, "api.test");
        assert_eq!(text.var_type, VariableType::String);
    }

    #[test]
    fn test_variable_serializes_type_key() {
        let var = Variable::new("token", "abc", VariableScope::Environment);
        let value = serde_json::to_value(&var).unwrap();
        assert_eq!(value["type"], "string");
        assert_eq!(value["scope"], "environment");
        assert_eq!(value["enabled"], true);
    }
}
