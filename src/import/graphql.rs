//! GraphQL SDL importer
//!
//! There is no GraphQL grammar here: type blocks are found with patterns,
//! and each Query/Mutation field becomes a POST request carrying a generated
//! operation. Selection sets include only scalar (and enum) fields of the
//! return type so generated queries stay valid without deep recursion.

use anyhow::{Result, bail};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value, json};
use std::collections::{HashMap, HashSet};
use tracing::info;

use super::{ImportContext, ImportError, ImportOptions, ImportResult};
use crate::formats::FormatId;
use crate::models::{Collection, KeyValue, Protocol, Request, RequestBody};

static RE_BLOCK_STRING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)""".*?""""#).expect("Invalid regex"));
static RE_STRING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""(?:[^"\\\n]|\\.)*""#).expect("Invalid regex"));
static RE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"#[^\n]*").expect("Invalid regex"));
static RE_DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@\w+(?:\s*\([^)]*\))?").expect("Invalid regex"));
static RE_TYPE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\bextend\s+)?\b(type|interface|input)\s+(\w+)[^{}]*\{([^}]*)\}")
        .expect("Invalid regex")
});
static RE_ENUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\benum\s+(\w+)[^{}]*\{[^}]*\}").expect("Invalid regex"));
static RE_SCALAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bscalar\s+(\w+)").expect("Invalid regex"));
static RE_SCHEMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bschema\s*\{([^}]*)\}").expect("Invalid regex"));
static RE_ROOT_BINDING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(query|mutation|subscription)\s*:\s*(\w+)").expect("Invalid regex")
});
static RE_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\w+)\s*(?:\(([^)]*)\))?\s*:\s*([\[\]\w!]+)").expect("Invalid regex")
});
static RE_ARGUMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\w+)\s*:\s*([\[\]\w!]+)(?:\s*=\s*([^,\s)]+))?").expect("Invalid regex")
});
static RE_SNIFF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:(?:extend\s+)?type\s+\w+[^{]*\{|schema\s*\{)").expect("Invalid regex")
});

const BUILTIN_SCALARS: &[&str] = &["Int", "Float", "String", "Boolean", "ID"];

/// GraphQL SDL importer
#[derive(Debug, Default)]
pub struct GraphqlImporter;

impl GraphqlImporter {
    pub fn new() -> Self {
        Self
    }

    /// Whether the content looks like SDL with at least one type or schema block
    pub fn can_import(&self, content: &str) -> bool {
        let trimmed = content.trim_start();
        !trimmed.starts_with('{') && !trimmed.starts_with('<') && RE_SNIFF.is_match(content)
    }

    /// Import a GraphQL schema.
    ///
    /// # Example
    ///
    /// ```rust
    /// use api_interchange_sdk::import::{ImportOptions, graphql::GraphqlImporter};
    ///
    /// let sdl = "type Query { users: [User!]! }\ntype User { id: ID! name: String! }";
    /// let result = GraphqlImporter::new().import(sdl, &ImportOptions::default());
    /// let body = result.requests[0].body.as_ref().unwrap();
    /// assert!(body.content.contains("users"));
    /// ```
    pub fn import(&self, content: &str, options: &ImportOptions) -> ImportResult {
        match self.parse(content, options) {
            Ok(ctx) => ctx.finish(),
            Err(e) => ImportResult::failure(Some(FormatId::GraphqlSchema), e),
        }
    }

    fn parse(&self, content: &str, options: &ImportOptions) -> Result<ImportContext, ImportError> {
        let schema = parse_schema(content)?;
        let mut ctx = ImportContext::new(FormatId::GraphqlSchema);
        let collection_idx = ctx.add_collection(Collection::new("GraphQL API"), None);
        let endpoint = format!("{}/graphql", options.base_url_or_placeholder());

        for (kind, root) in [("query", &schema.query), ("mutation", &schema.mutation)] {
            let Some(fields) = schema.types.get(root) else {
                continue;
            };
            for field in fields {
                let request = schema.build_request(kind, field, &endpoint);
                ctx.add_request(request, Some(collection_idx));
            }
        }

        let subscriptions = schema
            .types
            .get(&schema.subscription)
            .map(Vec::len)
            .unwrap_or_default();
        if subscriptions > 0 {
            ctx.warn(format!(
                "Skipped {} subscription field(s): subscriptions are not imported",
                subscriptions
            ));
        }

        Ok(ctx)
    }
}

#[derive(Debug, Clone)]
struct Argument {
    name: String,
    type_ref: String,
    default: Option<String>,
}

#[derive(Debug, Clone)]
struct Field {
    name: String,
    args: Vec<Argument>,
    type_ref: String,
}

#[derive(Debug, Default)]
struct Schema {
    /// Object, interface and input types with their fields, extensions merged
    types: HashMap<String, Vec<Field>>,
    /// Enums and custom scalars; selectable as leaves
    leaves: HashSet<String>,
    inputs: HashSet<String>,
    query: String,
    mutation: String,
    subscription: String,
}

/// Named type of a reference: `[User!]!` → `User`
fn named_type(type_ref: &str) -> &str {
    type_ref.trim_matches(|c| c == '[' || c == ']' || c == '!')
}

fn is_list(type_ref: &str) -> bool {
    type_ref.starts_with('[')
}

fn parse_schema(content: &str) -> Result<Schema> {
    let cleaned = RE_BLOCK_STRING.replace_all(content, " ");
    let cleaned = RE_STRING.replace_all(&cleaned, "\"\"");
    let cleaned = RE_COMMENT.replace_all(&cleaned, "");
    let cleaned = RE_DIRECTIVE.replace_all(&cleaned, "");

    let mut schema = Schema {
        query: "Query".to_string(),
        mutation: "Mutation".to_string(),
        subscription: "Subscription".to_string(),
        ..Default::default()
    };

    for caps in RE_SCHEMA.captures_iter(&cleaned) {
        for binding in RE_ROOT_BINDING.captures_iter(&caps[1]) {
            let target = binding[2].to_string();
            match &binding[1] {
                "query" => schema.query = target,
                "mutation" => schema.mutation = target,
                _ => schema.subscription = target,
            }
        }
    }

    for caps in RE_ENUM.captures_iter(&cleaned) {
        schema.leaves.insert(caps[1].to_string());
    }
    for caps in RE_SCALAR.captures_iter(&cleaned) {
        schema.leaves.insert(caps[1].to_string());
    }

    for caps in RE_TYPE_BLOCK.captures_iter(&cleaned) {
        let name = caps[2].to_string();
        if &caps[1] == "input" {
            schema.inputs.insert(name.clone());
        }
        let fields = parse_fields(&caps[3]);
        schema.types.entry(name).or_default().extend(fields);
    }

    let has_root = [&schema.query, &schema.mutation]
        .iter()
        .any(|root| schema.types.contains_key(root.as_str()));
    if !has_root && !schema.types.contains_key(&schema.subscription) {
        bail!("No Query or Mutation type found in schema");
    }

    info!(
        "Parsed GraphQL schema with {} types and {} leaf types",
        schema.types.len(),
        schema.leaves.len()
    );
    Ok(schema)
}

fn parse_fields(body: &str) -> Vec<Field> {
    RE_FIELD
        .captures_iter(body)
        .map(|caps| Field {
            name: caps[1].to_string(),
            args: caps
                .get(2)
                .map(|args| {
                    RE_ARGUMENT
                        .captures_iter(args.as_str())
                        .map(|a| Argument {
                            name: a[1].to_string(),
                            type_ref: a[2].to_string(),
                            default: a.get(3).map(|d| d.as_str().to_string()),
                        })
                        .collect()
                })
                .unwrap_or_default(),
            type_ref: caps[3].to_string(),
        })
        .collect()
}

impl Schema {
    fn is_leaf(&self, type_name: &str) -> bool {
        BUILTIN_SCALARS.contains(&type_name) || self.leaves.contains(type_name)
    }

    /// Scalar-only selection for `type_name`, `None` when it is itself a leaf
    fn selection(&self, type_name: &str) -> Option<Vec<String>> {
        if self.is_leaf(type_name) {
            return None;
        }
        let selected: Vec<String> = self
            .types
            .get(type_name)
            .into_iter()
            .flatten()
            .filter(|f| !is_list(&f.type_ref) && self.is_leaf(named_type(&f.type_ref)))
            .map(|f| f.name.clone())
            .collect();
        if selected.is_empty() {
            Some(vec!["__typename".to_string()])
        } else {
            Some(selected)
        }
    }

    fn default_variable(&self, arg: &Argument) -> Value {
        if let Some(literal) = &arg.default {
            return serde_json::from_str(literal).unwrap_or_else(|_| json!(literal));
        }
        if is_list(&arg.type_ref) {
            return json!([]);
        }
        match named_type(&arg.type_ref) {
            "Int" | "Float" => json!(0),
            "Boolean" => json!(false),
            "String" | "ID" => json!(""),
            other if self.inputs.contains(other) => json!({}),
            _ => Value::Null,
        }
    }

    fn build_request(&self, kind: &str, field: &Field, endpoint: &str) -> Request {
        let operation_name = capitalize(&field.name);
        let mut variables = Map::new();
        let mut declarations = Vec::new();
        let mut call_args = Vec::new();
        for arg in &field.args {
            declarations.push(format!("${}: {}", arg.name, arg.type_ref));
            call_args.push(format!("{}: ${}", arg.name, arg.name));
            variables.insert(arg.name.clone(), self.default_variable(arg));
        }

        let mut query = format!("{} {}", kind, operation_name);
        if !declarations.is_empty() {
            query.push_str(&format!("({})", declarations.join(", ")));
        }
        query.push_str(" {\n  ");
        query.push_str(&field.name);
        if !call_args.is_empty() {
            query.push_str(&format!("({})", call_args.join(", ")));
        }
        if let Some(selection) = self.selection(named_type(&field.type_ref)) {
            query.push_str(" {\n");
            for name in selection {
                query.push_str(&format!("    {}\n", name));
            }
            query.push_str("  }");
        }
        query.push_str("\n}");

        let mut request = Request::new(field.name.clone(), "POST", endpoint);
        request.protocol = Protocol::Graphql;
        request.description = Some(format!("GraphQL {} returning {}", kind, field.type_ref));
        request
            .headers
            .push(KeyValue::new("Content-Type", "application/json"));
        request.body = Some(RequestBody::graphql(&query, Value::Object(variables)));
        request
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_schema_with_extend_and_schema_block() {
        let sdl = r#"
            schema { query: RootQuery }
            """Root"""
            type RootQuery { me: User }
            extend type RootQuery { user(id: ID!): User @deprecated(reason: "x") }
            type User { id: ID! friends: [User] role: Role }
            enum Role { ADMIN USER }
        "#;
        let schema = parse_schema(sdl).unwrap();
        assert_eq!(schema.query, "RootQuery");
        let root = &schema.types["RootQuery"];
        let fields: Vec<&str> = root.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(fields, vec!["me", "user"]);
        assert_eq!(
            schema.selection("User"),
            Some(vec!["id".to_string(), "role".to_string()])
        );
    }

    #[test]
    fn test_selection_falls_back_to_typename() {
        let schema =
            parse_schema("type Query { feed: Feed }\ntype Feed { items: [Item] }").unwrap();
        assert_eq!(
            schema.selection("Feed"),
            Some(vec!["__typename".to_string()])
        );
        assert_eq!(schema.selection("String"), None);
    }

    #[test]
    fn test_arguments_become_variables() {
        let sdl =
            "type Query { users(first: Int = 10, name: String): [User] }\ntype User { id: ID }";
        let schema = parse_schema(sdl).unwrap();
        let field = &schema.types["Query"][0];
        let request = schema.build_request("query", field, "{{baseUrl}}/graphql");
        let body: Value = serde_json::from_str(&request.body.unwrap().content).unwrap();
        assert_eq!(body["variables"], json!({"first": 10, "name": ""}));
        let query = body["query"].as_str().unwrap();
        assert!(query.starts_with("query Users($first: Int, $name: String)"));
        assert!(query.contains("users(first: $first, name: $name)"));
    }

    #[test]
    fn test_rejects_schema_without_roots() {
        assert!(parse_schema("type User { id: ID }").is_err());
    }
}
