//! Schema example generator
//!
//! Walks a JSON-Schema-like node (`$ref`, `type`, `properties`, `items`,
//! `enum`, `format`) and produces a representative instance. Shared by every
//! importer whose source format describes bodies with schemas.
//!
//! There is no visited-set: recursion through `$ref` cycles is bounded only
//! by [`MAX_DEPTH`].

use serde_json::{Map, Value, json};

/// Recursion ceiling. Beyond it the generator returns an empty object.
pub const MAX_DEPTH: usize = 5;

/// Generate an example instance for `schema`.
///
/// `root` is the document `$ref` pointers are resolved against.
///
/// # Example
///
/// ```rust
/// use api_interchange_sdk::schema::generate_example;
/// use serde_json::json;
///
/// let schema = json!({"type": "object", "properties": {"id": {"type": "integer"}}});
/// assert_eq!(generate_example(&schema, &json!({}), 0), json!({"id": 0}));
/// ```
pub fn generate_example(schema: &Value, root: &Value, depth: usize) -> Value {
    if depth > MAX_DEPTH {
        return Value::Object(Map::new());
    }

    let Some(node) = schema.as_object() else {
        return Value::Null;
    };

    if let Some(example) = node.get("example") {
        return example.clone();
    }

    if let Some(reference) = node.get("$ref").and_then(Value::as_str) {
        return match resolve_ref(root, reference) {
            Some(target) => generate_example(target, root, depth + 1),
            None => {
                tracing::debug!("Unresolvable schema reference: {}", reference);
                Value::Null
            }
        };
    }

    match schema_type(node).as_deref() {
        Some("object") => {
            let mut object = Map::new();
            if let Some(properties) = node.get("properties").and_then(Value::as_object) {
                for (name, property) in properties {
                    object.insert(name.clone(), generate_example(property, root, depth + 1));
                }
            }
            Value::Object(object)
        }
        Some("array") => {
            let item = node
                .get("items")
                .map(|items| generate_example(items, root, depth + 1))
                .unwrap_or(Value::Null);
            Value::Array(vec![item])
        }
        Some("string") => string_example(node),
        Some("number") | Some("integer") => json!(0),
        Some("boolean") => json!(true),
        Some(_) => Value::Null,
        None => composed_example(node, root, depth),
    }
}

/// Resolve a local `#/a/b/c` pointer against `root`.
///
/// Segments are JSON-pointer unescaped (`~1` → `/`, `~0` → `~`) and
/// percent-decoded.
pub fn resolve_ref<'a>(root: &'a Value, reference: &str) -> Option<&'a Value> {
    let pointer = reference.strip_prefix('#')?;
    if pointer.is_empty() {
        return Some(root);
    }
    let mut current = root;
    for raw in pointer.trim_start_matches('/').split('/') {
        let decoded = urlencoding::decode(raw)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| raw.to_string());
        let segment = decoded.replace("~1", "/").replace("~0", "~");
        current = match current {
            Value::Object(map) => map.get(&segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Declared type, tolerating OpenAPI 3.1 type arrays and untyped nodes
/// that still carry `properties` or `items`.
fn schema_type(node: &Map<String, Value>) -> Option<String> {
    match node.get("type") {
        Some(Value::String(t)) => Some(t.clone()),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null")
            .map(str::to_string),
        _ if node.contains_key("properties") => Some("object".to_string()),
        _ if node.contains_key("items") => Some("array".to_string()),
        _ => None,
    }
}

fn string_example(node: &Map<String, Value>) -> Value {
    let shaped = match node.get("format").and_then(Value::as_str) {
        Some("email") => Some("user@example.com"),
        Some("date") => Some("2024-01-01"),
        Some("date-time") => Some("2024-01-01T00:00:00Z"),
        Some("uuid") => Some("123e4567-e89b-12d3-a456-426614174000"),
        _ => None,
    };
    if let Some(value) = shaped {
        return json!(value);
    }
    if let Some(first) = node
        .get("enum")
        .and_then(Value::as_array)
        .and_then(|values| values.first())
    {
        return first.clone();
    }
    json!("string")
}

/// Untyped nodes composed with `allOf`/`oneOf`/`anyOf`.
///
/// `allOf` members are merged when they produce objects; `oneOf`/`anyOf`
/// take the first alternative.
fn composed_example(node: &Map<String, Value>, root: &Value, depth: usize) -> Value {
    if let Some(all_of) = node.get("allOf").and_then(Value::as_array) {
        let mut merged = Map::new();
        let mut last = Value::Null;
        for member in all_of {
            match generate_example(member, root, depth + 1) {
                Value::Object(fields) => merged.extend(fields),
                other => last = other,
            }
        }
        return if merged.is_empty() {
            last
        } else {
            Value::Object(merged)
        };
    }
    for key in ["oneOf", "anyOf"] {
        if let Some(first) = node
            .get(key)
            .and_then(Value::as_array)
            .and_then(|alternatives| alternatives.first())
        {
            return generate_example(first, root, depth + 1);
        }
    }
    Value::Null
}
