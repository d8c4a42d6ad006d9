//! cURL command parser

use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::CurlError;
use crate::models::{BodyType, KeyValue, Protocol, Request, RequestBody, name_from_url};

/// Any `scheme://` URL, for the mqtt/ws/kafka/grpc addresses written by exporters
static RE_SCHEME_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i)([a-z][a-z0-9+.-]*)://").expect("Invalid regex"));

/// Short options that consume the following argument
const SHORT_WITH_VALUE: &[char] = &[
    'X', 'H', 'd', 'F', 'u', 'A', 'e', 'b', 'o', 'm', 'x', 'U', 'w', 'E', 'T', 'r', 'c', 'K', 'y',
    'Y', 'z', 'D', 'Q', 't', 'C',
];

/// Long options that consume the following argument but carry nothing the
/// canonical model can hold
const LONG_IGNORED_WITH_VALUE: &[&str] = &[
    "output",
    "max-time",
    "connect-timeout",
    "proxy",
    "proxy-user",
    "write-out",
    "cacert",
    "capath",
    "cert",
    "cert-type",
    "key",
    "key-type",
    "upload-file",
    "range",
    "cookie-jar",
    "config",
    "retry",
    "retry-delay",
    "retry-max-time",
    "speed-time",
    "speed-limit",
    "limit-rate",
    "resolve",
    "connect-to",
    "interface",
    "max-redirs",
    "proto",
    "proto-redir",
    "dns-servers",
    "unix-socket",
    "abstract-unix-socket",
    "time-cond",
    "dump-header",
    "trace",
    "trace-ascii",
    "stderr",
    "ciphers",
    "aws-sigv4",
    "quote",
    "telnet-option",
    "netrc-file",
    "local-port",
    "continue-at",
    "request-target",
    "variable",
    "pass",
    "engine",
];

/// Split a document into individual cURL commands.
///
/// Line continuations (`\`, `` ` ``, `^`) are removed, quoted strings may
/// span lines, and text outside any command (comments, blank lines, stray
/// output) is dropped.
pub fn split_commands(content: &str) -> Vec<String> {
    let mut commands = Vec::new();
    let mut current: Option<String> = None;

    for line in content.lines() {
        let inside_quote = current.as_deref().is_some_and(has_open_quote);
        let trimmed = line.trim();

        if !inside_quote {
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if starts_with_curl(trimmed) {
                if let Some(done) = current.take() {
                    commands.push(done);
                }
                let mut command = String::new();
                push_line(&mut command, trimmed);
                current = Some(command);
                continue;
            }
        }

        if let Some(command) = current.as_mut() {
            push_line(command, if inside_quote { line } else { trimmed });
        }
    }

    if let Some(done) = current {
        commands.push(done);
    }
    commands
}

/// Parse a single cURL command into a request.
///
/// # Example
///
/// ```rust
/// use api_interchange_sdk::curl::parse_curl;
///
/// let request = parse_curl("curl -X DELETE 'https://api.example.com/users/1?force=true'").unwrap();
/// assert_eq!(request.method, "DELETE");
/// assert_eq!(request.url, "https://api.example.com/users/1");
/// assert_eq!(request.query_params[0].key, "force");
/// ```
pub fn parse_curl(command: &str) -> Result<Request, CurlError> {
    let joined = {
        let mut normalized = String::new();
        for line in command.lines() {
            push_line(&mut normalized, line);
        }
        normalized
    };
    let tokens = shlex::split(&joined).ok_or(CurlError::Tokenize)?;
    let mut tokens = tokens.into_iter();

    match tokens.next() {
        Some(first) if is_curl_token(&first) => {}
        _ => return Err(CurlError::NotCurl),
    }

    let mut parsed = ParsedCommand::default();
    let rest: Vec<String> = tokens.collect();
    let mut idx = 0;
    while idx < rest.len() {
        let token = &rest[idx];
        idx += 1;

        if token == "--" {
            continue;
        }

        if let Some(long) = token.strip_prefix("--") {
            let (name, inline) = match long.split_once('=') {
                Some((name, value)) => (name, Some(value.to_string())),
                None => (long, None),
            };
            if takes_value_long(name) {
                let value = match inline {
                    Some(v) => v,
                    None => match rest.get(idx) {
                        Some(v) => {
                            idx += 1;
                            v.clone()
                        }
                        None => break,
                    },
                };
                parsed.apply_long(name, value);
            } else {
                parsed.apply_flag_long(name);
            }
            continue;
        }

        if token.starts_with('-') && token.len() > 1 {
            let mut chars = token[1..].chars();
            let flag = chars.next().unwrap_or_default();
            if SHORT_WITH_VALUE.contains(&flag) {
                let attached: String = chars.collect();
                let value = if attached.is_empty() {
                    match rest.get(idx) {
                        Some(v) => {
                            idx += 1;
                            v.clone()
                        }
                        None => break,
                    }
                } else {
                    attached
                };
                parsed.apply_short(flag, value);
            } else {
                for flag in token[1..].chars() {
                    parsed.apply_flag_short(flag);
                }
            }
            continue;
        }

        parsed.positional.push(token.clone());
    }

    parsed.into_request()
}

#[derive(Default)]
struct ParsedCommand {
    method: Option<String>,
    url_flag: Option<String>,
    positional: Vec<String>,
    headers: Vec<KeyValue>,
    data: Vec<String>,
    url_encoded: Vec<KeyValue>,
    form: Vec<KeyValue>,
    json: Vec<String>,
    url_query: Vec<String>,
    user: Option<String>,
    head: bool,
    get: bool,
}

impl ParsedCommand {
    fn apply_short(&mut self, flag: char, value: String) {
        match flag {
            'X' => self.method = Some(value),
            'H' => self.push_header(&value),
            'd' => self.data.push(value),
            'F' => self.form.push(split_pair(&value)),
            'u' => self.user = Some(value),
            'A' => self.headers.push(KeyValue::new("User-Agent", value)),
            'e' => self.headers.push(KeyValue::new("Referer", value)),
            'b' => self.push_cookie(value),
            _ => debug!("Ignoring cURL option -{}", flag),
        }
    }

    fn apply_long(&mut self, name: &str, value: String) {
        match name {
            "request" => self.method = Some(value),
            "url" => self.url_flag = Some(value),
            "header" => self.push_header(&value),
            "data" | "data-raw" | "data-binary" | "data-ascii" => self.data.push(value),
            "data-urlencode" => self.url_encoded.push(split_pair(&value)),
            "form" | "form-string" => self.form.push(split_pair(&value)),
            "json" => self.json.push(value),
            "url-query" => self.url_query.push(value),
            "user" => self.user = Some(value),
            "user-agent" => self.headers.push(KeyValue::new("User-Agent", value)),
            "referer" => self.headers.push(KeyValue::new("Referer", value)),
            "cookie" => self.push_cookie(value),
            "oauth2-bearer" => self
                .headers
                .push(KeyValue::new("Authorization", format!("Bearer {}", value))),
            _ => debug!("Ignoring cURL option --{}", name),
        }
    }

    fn apply_flag_long(&mut self, name: &str) {
        match name {
            "head" => self.head = true,
            "get" => self.get = true,
            _ => {}
        }
    }

    fn apply_flag_short(&mut self, flag: char) {
        match flag {
            'I' => self.head = true,
            'G' => self.get = true,
            _ => {}
        }
    }

    fn push_header(&mut self, raw: &str) {
        if raw.starts_with('@') {
            debug!("Ignoring header file reference {}", raw);
            return;
        }
        if let Some((key, value)) = raw.split_once(':') {
            let value = value.trim();
            // `-H 'Name:'` removes a header in cURL
            if !value.is_empty() {
                self.headers.push(KeyValue::new(key.trim(), value));
            }
        } else if let Some(key) = raw.trim().strip_suffix(';') {
            self.headers.push(KeyValue::new(key.trim(), ""));
        }
    }

    fn push_cookie(&mut self, value: String) {
        // Without `=` the argument names a cookie file
        if value.contains('=') {
            self.headers.push(KeyValue::new("Cookie", value));
        }
    }

    fn has_body(&self) -> bool {
        !self.data.is_empty()
            || !self.url_encoded.is_empty()
            || !self.form.is_empty()
            || !self.json.is_empty()
    }

    fn into_request(self) -> Result<Request, CurlError> {
        let url = self
            .url_flag
            .clone()
            .or_else(|| {
                self.positional
                    .iter()
                    .find(|t| is_http_url(t))
                    .or_else(|| self.positional.iter().find(|t| RE_SCHEME_URL.is_match(t)))
                    .or_else(|| self.positional.iter().find(|t| t.starts_with("{{")))
                    .cloned()
            })
            .ok_or(CurlError::MissingUrl)?;

        let method = match &self.method {
            Some(m) => m.to_ascii_uppercase(),
            None if self.head => "HEAD".to_string(),
            None if self.get => "GET".to_string(),
            None if self.has_body() => "POST".to_string(),
            None => "GET".to_string(),
        };

        let mut request = Request::new(name_from_url(&method, &url), method, "");
        request.set_url_lifting_query(&url);
        if let Some(scheme) = RE_SCHEME_URL.captures(&url).and_then(|c| c.get(1)) {
            request.protocol = Protocol::from_scheme(scheme.as_str());
        }
        for query in &self.url_query {
            let pair = split_pair(query);
            request.query_params.push(pair);
        }
        request.headers = self.headers;

        if let Some(user) = &self.user {
            if !request.has_header("Authorization") {
                let encoded = base64::engine::general_purpose::STANDARD.encode(user.as_bytes());
                request
                    .headers
                    .push(KeyValue::new("Authorization", format!("Basic {}", encoded)));
            }
        }

        if self.get {
            for chunk in &self.data {
                request
                    .query_params
                    .extend(crate::models::parse_query_string(chunk));
            }
            request.query_params.extend(self.url_encoded);
        } else if !self.form.is_empty() {
            request.body = Some(RequestBody::from_pairs(BodyType::FormData, &self.form));
        } else if !self.json.is_empty() {
            request.add_header_if_missing("Content-Type", "application/json");
            request.add_header_if_missing("Accept", "application/json");
            request.body = Some(RequestBody::new(BodyType::Json, self.json.join("")));
        } else if !self.data.is_empty() {
            let mut chunks = self.data;
            chunks.extend(self.url_encoded.iter().map(encode_pair));
            request.body = Some(RequestBody::new(BodyType::Raw, chunks.join("&")));
        } else if !self.url_encoded.is_empty() {
            request.body = Some(RequestBody::from_pairs(
                BodyType::UrlEncoded,
                &self.url_encoded,
            ));
        }

        Ok(request)
    }
}

fn takes_value_long(name: &str) -> bool {
    matches!(
        name,
        "request"
            | "url"
            | "header"
            | "data"
            | "data-raw"
            | "data-binary"
            | "data-ascii"
            | "data-urlencode"
            | "form"
            | "form-string"
            | "json"
            | "url-query"
            | "user"
            | "user-agent"
            | "referer"
            | "cookie"
            | "oauth2-bearer"
    ) || LONG_IGNORED_WITH_VALUE.contains(&name)
}

fn split_pair(raw: &str) -> KeyValue {
    match raw.split_once('=') {
        Some((key, value)) => KeyValue::new(key, value),
        None => KeyValue::new(raw, ""),
    }
}

fn encode_pair(pair: &KeyValue) -> String {
    if pair.key.is_empty() {
        urlencoding::encode(&pair.value).into_owned()
    } else {
        format!("{}={}", pair.key, urlencoding::encode(&pair.value))
    }
}

fn is_http_url(token: &str) -> bool {
    let lower = token.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

pub(crate) fn is_curl_token(token: &str) -> bool {
    let lower = token.to_ascii_lowercase();
    let name = lower.rsplit(['/', '\\']).next().unwrap_or(&lower);
    name == "curl" || name == "curl.exe"
}

fn starts_with_curl(line: &str) -> bool {
    line.split_whitespace().next().is_some_and(is_curl_token)
}

/// Append a line, dropping a trailing continuation marker when it sits
/// outside any quoted string.
fn push_line(command: &mut String, line: &str) {
    if !command.is_empty() {
        command.push('\n');
    }
    command.push_str(line.trim_end());
    if !has_open_quote(command) {
        for marker in ['\\', '`', '^'] {
            if command.ends_with(marker) {
                command.pop();
                break;
            }
        }
    }
}

/// Whether `text` ends inside an unterminated shell quote
fn has_open_quote(text: &str) -> bool {
    let mut single = false;
    let mut double = false;
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '\'' if !double => single = !single,
            '"' if !single => double = !double,
            '\\' if !single => {
                chars.next();
            }
            _ => {}
        }
    }
    single || double
}
