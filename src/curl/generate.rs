//! cURL command generator

use crate::models::{BodyType, Request};

const LINE_BREAK: &str = " \\\n  ";

/// Render a request as a multi-line cURL command.
///
/// `-X` is omitted for GET. Disabled headers and parameters are skipped.
pub fn generate_curl(request: &Request) -> String {
    let mut first = String::from("curl");
    if !request.method.eq_ignore_ascii_case("GET") {
        first.push_str(" -X ");
        first.push_str(&request.method.to_ascii_uppercase());
    }

    let mut parts = vec![first, shell_quote(&request.full_url())];

    for header in request.headers.iter().filter(|h| h.enabled) {
        // `Name:` would remove the header, `Name;` sends it empty
        let line = if header.value.is_empty() {
            format!("{};", header.key)
        } else {
            format!("{}: {}", header.key, header.value)
        };
        parts.push(format!("-H {}", shell_quote(&line)));
    }

    if let Some(body) = &request.body {
        match body.body_type {
            BodyType::FormData => {
                for pair in body.pairs().iter().filter(|p| p.enabled) {
                    parts.push(format!(
                        "-F {}",
                        shell_quote(&format!("{}={}", pair.key, pair.value))
                    ));
                }
            }
            BodyType::UrlEncoded => {
                for pair in body.pairs().iter().filter(|p| p.enabled) {
                    parts.push(format!(
                        "--data-urlencode {}",
                        shell_quote(&format!("{}={}", pair.key, pair.value))
                    ));
                }
            }
            _ if body.content.is_empty() => {}
            _ => parts.push(format!("-d {}", shell_quote(&body.content))),
        }
    }

    parts.join(LINE_BREAK)
}

/// Single-quote a shell word, escaping embedded quotes as `'\''`
fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "'\\''"))
}
