//! Protobuf parser for importing gRPC service definitions.
//!
//! Understands proto3 (and most proto2) syntax:
//! - `package`, top-level and nested `message` / `enum` definitions
//! - `repeated`, `optional`, `map<K, V>` and `oneof` fields
//! - `service` blocks with unary and streaming `rpc`s
//!
//! Each rpc becomes a gRPC request whose JSON body is synthesized from the
//! input message using proto3 default values.

use anyhow::{Context, Result, anyhow, bail};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use tracing::{debug, info};

use super::{ImportContext, ImportError, ImportOptions, ImportResult};
use crate::formats::FormatId;
use crate::models::{BodyType, Collection, Protocol, Request, RequestBody};
use crate::schema::MAX_DEPTH;

const GRPC_ENDPOINT: &str = "grpc://localhost:50051";

static RE_PROTO_SNIFF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*(?:syntax\s*=\s*["']proto[23]["']|service\s+\w+\s*\{|message\s+\w+\s*\{)"#)
        .expect("Invalid regex")
});

/// Parser for Protobuf format.
#[derive(Debug, Default)]
pub struct ProtobufImporter;

impl ProtobufImporter {
    /// Create a new Protobuf parser instance.
    ///
    /// # Example
    ///
    /// ```rust
    /// use api_interchange_sdk::import::protobuf::ProtobufImporter;
    ///
    /// let importer = ProtobufImporter::new();
    /// ```
    pub fn new() -> Self {
        Self
    }

    pub fn can_import(&self, content: &str) -> bool {
        RE_PROTO_SNIFF.is_match(content)
    }

    /// Import `.proto` content.
    ///
    /// # Example
    ///
    /// ```rust
    /// use api_interchange_sdk::import::{ImportOptions, protobuf::ProtobufImporter};
    ///
    /// let proto = r#"
    /// syntax = "proto3";
    /// package users.v1;
    /// message GetUserRequest { int64 id = 1; }
    /// message User { int64 id = 1; string name = 2; }
    /// service UserService {
    ///   rpc GetUser(GetUserRequest) returns (User);
    /// }
    /// "#;
    /// let result = ProtobufImporter::new().import(proto, &ImportOptions::default());
    /// assert_eq!(
    ///     result.requests[0].url,
    ///     "grpc://localhost:50051/users.v1.UserService/GetUser"
    /// );
    /// ```
    pub fn import(&self, proto_content: &str, options: &ImportOptions) -> ImportResult {
        match self.parse(proto_content, options) {
            Ok(ctx) => ctx.finish(),
            Err(e) => ImportResult::failure(Some(FormatId::Protobuf3), e),
        }
    }

    fn parse(
        &self,
        proto_content: &str,
        _options: &ImportOptions,
    ) -> Result<ImportContext, ImportError> {
        let file = parse_proto(proto_content)?;
        let mut ctx = ImportContext::new(FormatId::Protobuf3);

        if file.services.is_empty() {
            ctx.warn("No service definitions found");
        }

        for service in &file.services {
            let qualified = file.qualify(&service.name);
            let collection_idx = ctx.add_collection(Collection::new(qualified.clone()), None);

            for rpc in &service.rpcs {
                let mut request = Request::new(
                    rpc.name.clone(),
                    "POST",
                    format!("{}/{}/{}", GRPC_ENDPOINT, qualified, rpc.name),
                );
                request.protocol = Protocol::Grpc;
                request.description = Some(rpc.describe());

                match file.find_message(&rpc.input) {
                    Some(message) => {
                        let example = file.message_example(message, 0);
                        request.body = Some(RequestBody::from_value(BodyType::Json, &example));
                    }
                    None => {
                        ctx.warn(format!(
                            "{}.{}: input message {} not found, body left empty",
                            qualified, rpc.name, rpc.input
                        ));
                        request.body = Some(RequestBody::new(BodyType::Json, "{}"));
                    }
                }
                ctx.add_request(request, Some(collection_idx));
            }
        }

        Ok(ctx)
    }
}

/// Parsed `.proto` file
#[derive(Debug, Default)]
struct ProtoFile {
    package: Option<String>,
    /// Messages keyed by dotted name relative to the package (`Outer.Inner`)
    messages: HashMap<String, Message>,
    enums: HashMap<String, Vec<String>>,
    services: Vec<Service>,
}

/// Protobuf message structure.
#[derive(Debug, Clone)]
struct Message {
    fields: Vec<ProtobufField>,
}

/// Protobuf field structure.
#[derive(Debug, Clone)]
struct ProtobufField {
    name: String,
    field_type: String,
    repeated: bool,
    /// `map<K, V>` fields keep the value type in `field_type`
    map: bool,
}

#[derive(Debug, Clone)]
struct Service {
    name: String,
    rpcs: Vec<Rpc>,
}

#[derive(Debug, Clone)]
struct Rpc {
    name: String,
    input: String,
    output: String,
    client_streaming: bool,
    server_streaming: bool,
}

impl Rpc {
    fn describe(&self) -> String {
        let signature = format!(
            "rpc {}({}{}) returns ({}{})",
            self.name,
            if self.client_streaming { "stream " } else { "" },
            self.input,
            if self.server_streaming { "stream " } else { "" },
            self.output
        );
        match (self.client_streaming, self.server_streaming) {
            (true, true) => format!("{}\nBidirectional streaming", signature),
            (true, false) => format!("{}\nClient streaming", signature),
            (false, true) => format!("{}\nServer streaming", signature),
            (false, false) => signature,
        }
    }
}

impl ProtoFile {
    fn qualify(&self, name: &str) -> String {
        match &self.package {
            Some(package) => format!("{}.{}", package, name),
            None => name.to_string(),
        }
    }

    /// Strip a leading `.` and the own package prefix from a type reference
    fn relative<'a>(&self, type_name: &'a str) -> &'a str {
        let type_name = type_name.trim_start_matches('.');
        match &self.package {
            Some(package) => type_name
                .strip_prefix(package.as_str())
                .and_then(|rest| rest.strip_prefix('.'))
                .unwrap_or(type_name),
            None => type_name,
        }
    }

    fn find_message(&self, type_name: &str) -> Option<&Message> {
        let relative = self.relative(type_name);
        self.messages.get(relative).or_else(|| {
            let simple = relative.rsplit('.').next().unwrap_or(relative);
            self.messages
                .iter()
                .find(|(key, _)| key.rsplit('.').next() == Some(simple))
                .map(|(_, message)| message)
        })
    }

    fn find_enum(&self, type_name: &str) -> Option<&Vec<String>> {
        let relative = self.relative(type_name);
        self.enums.get(relative).or_else(|| {
            let simple = relative.rsplit('.').next().unwrap_or(relative);
            self.enums
                .iter()
                .find(|(key, _)| key.rsplit('.').next() == Some(simple))
                .map(|(_, values)| values)
        })
    }

    /// proto3 JSON default instance of `message`, bounded by [`MAX_DEPTH`]
    fn message_example(&self, message: &Message, depth: usize) -> Value {
        if depth > MAX_DEPTH {
            return json!({});
        }
        let mut object = Map::new();
        for field in &message.fields {
            let value = if field.map {
                json!({})
            } else {
                let single = self.field_default(&field.field_type, depth);
                if field.repeated {
                    json!([single])
                } else {
                    single
                }
            };
            object.insert(field.name.clone(), value);
        }
        Value::Object(object)
    }

    fn field_default(&self, field_type: &str, depth: usize) -> Value {
        match map_proto_type(field_type) {
            Some(value) => value,
            None => {
                if let Some(values) = self.find_enum(field_type) {
                    return values.first().map(|v| json!(v)).unwrap_or(Value::Null);
                }
                if let Some(nested) = self.find_message(field_type) {
                    return self.message_example(nested, depth + 1);
                }
                debug!("Unknown protobuf type {}", field_type);
                Value::Null
            }
        }
    }
}

/// Default JSON value for scalar and well-known types
fn map_proto_type(proto_type: &str) -> Option<Value> {
    let value = match proto_type.trim_start_matches('.') {
        "int32" | "uint32" | "sint32" | "fixed32" | "sfixed32" => json!(0),
        // 64-bit integers are strings in proto3 JSON
        "int64" | "uint64" | "sint64" | "fixed64" | "sfixed64" => json!("0"),
        "float" | "double" => json!(0.0),
        "bool" => json!(false),
        "string" | "bytes" => json!(""),
        "google.protobuf.Timestamp" => json!("1970-01-01T00:00:00Z"),
        "google.protobuf.Duration" => json!("0s"),
        "google.protobuf.StringValue" | "google.protobuf.BytesValue" => json!(""),
        "google.protobuf.BoolValue" => json!(false),
        "google.protobuf.Int32Value"
        | "google.protobuf.UInt32Value"
        | "google.protobuf.FloatValue"
        | "google.protobuf.DoubleValue" => json!(0),
        "google.protobuf.Int64Value" | "google.protobuf.UInt64Value" => json!("0"),
        "google.protobuf.Empty" | "google.protobuf.Struct" | "google.protobuf.Any" => json!({}),
        "google.protobuf.Value" => Value::Null,
        "google.protobuf.ListValue" => json!([]),
        _ => return None,
    };
    Some(value)
}

/// Remove `//` and `/* */` comments, keeping string literals intact
fn strip_comments(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    let mut quote: Option<char> = None;
    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match (c, chars.peek()) {
            ('/', Some('/')) => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut previous = ' ';
                for skipped in chars.by_ref() {
                    if previous == '*' && skipped == '/' {
                        break;
                    }
                    previous = skipped;
                }
                out.push(' ');
            }
            ('"', _) | ('\'', _) => {
                quote = Some(c);
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

fn tokenize(content: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut chars = content.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '"' || c == '\'' {
            chars.next();
            let mut literal = String::new();
            let mut closed = false;
            while let Some(ch) = chars.next() {
                if ch == '\\' {
                    if let Some(escaped) = chars.next() {
                        literal.push(escaped);
                    }
                } else if ch == c {
                    closed = true;
                    break;
                } else {
                    literal.push(ch);
                }
            }
            if !closed {
                bail!("Unterminated string literal");
            }
            tokens.push(format!("\"{}\"", literal));
        } else if "{}()<>;=,[]".contains(c) {
            tokens.push(c.to_string());
            chars.next();
        } else {
            let mut word = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() || "{}()<>;=,[]\"'".contains(ch) {
                    break;
                }
                word.push(ch);
                chars.next();
            }
            tokens.push(word);
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<String>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn next(&mut self) -> Result<String> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| anyhow!("Unexpected end of file"))?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, expected: &str) -> Result<()> {
        let token = self.next()?;
        if token != expected {
            bail!("Expected '{}' but found '{}'", expected, token);
        }
        Ok(())
    }

    /// Skip to and past the next `;` at the current nesting level
    fn skip_statement(&mut self) -> Result<()> {
        let mut depth = 0usize;
        loop {
            match self.next()?.as_str() {
                "{" | "[" | "(" => depth += 1,
                "}" | "]" | ")" => depth = depth.saturating_sub(1),
                ";" if depth == 0 => return Ok(()),
                _ => {}
            }
        }
    }

    /// Skip a `{ ... }` block, the opening brace not yet consumed
    fn skip_block(&mut self) -> Result<()> {
        while self.peek() != Some("{") {
            self.next()?;
        }
        let mut depth = 0usize;
        loop {
            match self.next()?.as_str() {
                "{" => depth += 1,
                "}" => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
    }

    fn parse_file(&mut self) -> Result<ProtoFile> {
        let mut file = ProtoFile::default();
        while let Some(token) = self.peek() {
            match token {
                "package" => {
                    self.next()?;
                    file.package = Some(self.next()?);
                    self.expect(";")?;
                }
                "message" => {
                    self.next()?;
                    self.parse_message(&mut file, None)?;
                }
                "enum" => {
                    self.next()?;
                    self.parse_enum(&mut file, None)?;
                }
                "service" => {
                    self.next()?;
                    let service = self.parse_service()?;
                    file.services.push(service);
                }
                "extend" => self.skip_block()?,
                ";" => {
                    self.next()?;
                }
                _ => self.skip_statement()?,
            }
        }
        Ok(file)
    }

    fn parse_message(&mut self, file: &mut ProtoFile, parent: Option<&str>) -> Result<()> {
        let name = self.next()?;
        let qualified = match parent {
            Some(parent) => format!("{}.{}", parent, name),
            None => name,
        };
        self.expect("{")?;
        let mut fields = Vec::new();

        loop {
            let token = self
                .peek()
                .ok_or_else(|| anyhow!("Unclosed message {}", qualified))?
                .to_string();
            match token.as_str() {
                "}" => {
                    self.next()?;
                    break;
                }
                "message" => {
                    self.next()?;
                    self.parse_message(file, Some(&qualified))?;
                }
                "enum" => {
                    self.next()?;
                    self.parse_enum(file, Some(&qualified))?;
                }
                "oneof" => {
                    self.next()?;
                    self.next()?;
                    self.expect("{")?;
                    while self.peek() != Some("}") {
                        if self.peek() == Some("option") {
                            self.skip_statement()?;
                            continue;
                        }
                        fields.push(self.parse_field()?);
                    }
                    self.next()?;
                }
                "option" | "reserved" | "extensions" => self.skip_statement()?,
                "extend" => self.skip_block()?,
                ";" => {
                    self.next()?;
                }
                _ => fields.push(self.parse_field()?),
            }
        }

        info!(
            "Parsed Protobuf message: {} with {} fields",
            qualified,
            fields.len()
        );
        file.messages.insert(qualified, Message { fields });
        Ok(())
    }

    /// Parse a field: `[repeated|optional|required] type name = number [options];`
    /// or `map<K, V> name = number;`
    fn parse_field(&mut self) -> Result<ProtobufField> {
        let mut repeated = false;
        let mut token = self.next()?;
        while matches!(token.as_str(), "repeated" | "optional" | "required") {
            repeated |= token == "repeated";
            token = self.next()?;
        }

        let (field_type, map) = if token == "map" {
            self.expect("<")?;
            let _key = self.next()?;
            self.expect(",")?;
            let value = self.next()?;
            self.expect(">")?;
            (value, true)
        } else {
            (token, false)
        };

        let name = self.next().context("Missing field name")?;
        if self.peek() != Some("=") {
            bail!("Invalid field syntax near '{} {}'", field_type, name);
        }
        self.skip_statement()?;

        Ok(ProtobufField {
            name,
            field_type,
            repeated,
            map,
        })
    }

    fn parse_enum(&mut self, file: &mut ProtoFile, parent: Option<&str>) -> Result<()> {
        let name = self.next()?;
        let qualified = match parent {
            Some(parent) => format!("{}.{}", parent, name),
            None => name,
        };
        self.expect("{")?;
        let mut values = Vec::new();
        loop {
            let token = self.next()?;
            match token.as_str() {
                "}" => break,
                ";" => {}
                "option" | "reserved" => self.skip_statement()?,
                _ => {
                    values.push(token);
                    self.skip_statement()?;
                }
            }
        }
        file.enums.insert(qualified, values);
        Ok(())
    }

    fn parse_service(&mut self) -> Result<Service> {
        let name = self.next()?;
        self.expect("{")?;
        let mut rpcs = Vec::new();
        loop {
            let token = self.next()?;
            match token.as_str() {
                "}" => break,
                ";" => {}
                "rpc" => rpcs.push(self.parse_rpc()?),
                _ => {
                    self.pos -= 1;
                    self.skip_statement()?;
                }
            }
        }
        Ok(Service { name, rpcs })
    }

    /// `rpc Name ([stream] In) returns ([stream] Out) (; | { ... })`
    fn parse_rpc(&mut self) -> Result<Rpc> {
        let name = self.next()?;
        let (input, client_streaming) = self.parse_rpc_type()?;
        self.expect("returns")?;
        let (output, server_streaming) = self.parse_rpc_type()?;
        match self.peek() {
            Some("{") => self.skip_block()?,
            Some(";") => {
                self.next()?;
            }
            _ => bail!("Expected ';' or '{{' after rpc {}", name),
        }
        Ok(Rpc {
            name,
            input,
            output,
            client_streaming,
            server_streaming,
        })
    }

    fn parse_rpc_type(&mut self) -> Result<(String, bool)> {
        self.expect("(")?;
        let mut token = self.next()?;
        let streaming = token == "stream";
        if streaming {
            token = self.next()?;
        }
        self.expect(")")?;
        Ok((token, streaming))
    }
}

fn parse_proto(content: &str) -> Result<ProtoFile> {
    let tokens = tokenize(&strip_comments(content))?;
    if tokens.is_empty() {
        bail!("Empty proto file");
    }
    let mut parser = Parser { tokens, pos: 0 };
    let file = parser.parse_file()?;
    if file.messages.is_empty() && file.services.is_empty() {
        bail!("No message or service definitions found");
    }
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROTO: &str = r#"
        syntax = "proto3";
        package shop.v1;
        import "google/protobuf/timestamp.proto";

        /* Orders */
        message Order {
            string id = 1; // identifier
            repeated Item items = 2;
            map<string, string> labels = 3;
            Status status = 4;
            google.protobuf.Timestamp created_at = 5;
            oneof payment {
                Card card = 6;
                string voucher = 7;
            }
            message Item { int32 quantity = 1; }
            enum Status { STATUS_UNSPECIFIED = 0; PAID = 1; }
        }
        message Card { string number = 1 [json_name = "num"]; }
        message Node { Node next = 1; }

        service OrderService {
            rpc CreateOrder(Order) returns (Order);
            rpc Watch(Node) returns (stream Order) {
                option (google.api.http) = { get: "/v1/watch" };
            }
        }
    "#;

    #[test]
    fn test_parse_messages_and_services() {
        let file = parse_proto(PROTO).unwrap();
        assert_eq!(file.package.as_deref(), Some("shop.v1"));
        assert!(file.messages.contains_key("Order.Item"));
        assert_eq!(file.enums["Order.Status"][1], "PAID");
        let order = &file.messages["Order"];
        let names: Vec<&str> = order.fields.iter().map(|f| f.name.as_str()).collect();
        let expected = "id items labels status created_at card voucher";
        assert_eq!(names.join(" "), expected);
        assert_eq!(file.services[0].rpcs.len(), 2);
        assert!(file.services[0].rpcs[1].server_streaming);
    }

    #[test]
    fn test_message_example() {
        let file = parse_proto(PROTO).unwrap();
        let example = file.message_example(&file.messages["Order"], 0);
        assert_eq!(example["id"], json!(""));
        assert_eq!(example["items"], json!([{"quantity": 0}]));
        assert_eq!(example["labels"], json!({}));
        assert_eq!(example["status"], json!("STATUS_UNSPECIFIED"));
        assert_eq!(example["created_at"], json!("1970-01-01T00:00:00Z"));
        assert_eq!(example["card"], json!({"number": ""}));
    }

    #[test]
    fn test_recursive_message_is_bounded() {
        let file = parse_proto(PROTO).unwrap();
        let example = file.message_example(&file.messages["Node"], 0);
        let mut depth = 0;
        let mut current = &example;
        while let Some(next) = current.get("next") {
            depth += 1;
            current = next;
        }
        assert!(depth <= MAX_DEPTH + 1);
    }

    #[test]
    fn test_malformed_proto() {
        assert!(parse_proto("message Broken { string = ; }").is_err());
        assert!(parse_proto("message Open { string a = 1;").is_err());
    }
}
