//! Generic XML tree
//!
//! Parses XML into a plain element tree and offers namespace-agnostic
//! lookups. WSDL, WADL and SoapUI importers walk this tree with their own
//! path knowledge; there is no schema binding.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;

/// XML parsing failure
#[derive(Debug, Error)]
pub enum XmlError {
    #[error("XML parse error at position {position}: {message}")]
    Syntax { position: u64, message: String },
    #[error("XML document has no root element")]
    Empty,
    #[error("Unbalanced XML: unexpected closing tag")]
    Unbalanced,
}

/// One XML element with its attributes, children and text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    /// Qualified tag name as written (e.g. `wsdl:operation`)
    pub name: String,
    /// Attributes as `(qualified name, unescaped value)`, in document order
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    /// Concatenated text and CDATA content directly inside this element
    pub text: String,
}

impl XmlElement {
    /// Tag name without namespace prefix
    pub fn local_name(&self) -> &str {
        local(&self.name)
    }

    /// Attribute value, matched on local name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name || local(key) == name)
            .map(|(_, value)| value.as_str())
    }

    /// First direct child with the given local name
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.local_name() == name)
    }

    /// Direct children with the given local name
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.local_name() == name)
    }

    /// All descendants (depth-first, document order) with the given local name
    pub fn descendants(&self, name: &str) -> Vec<&XmlElement> {
        let mut found = Vec::new();
        self.collect_descendants(name, &mut found);
        found
    }

    fn collect_descendants<'a>(&'a self, name: &str, found: &mut Vec<&'a XmlElement>) {
        for child in &self.children {
            if child.local_name() == name {
                found.push(child);
            }
            child.collect_descendants(name, found);
        }
    }

    /// Trimmed text of the first child with the given local name
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name)
            .map(|c| c.text.trim())
            .filter(|t| !t.is_empty())
    }

    /// Namespace URI bound to `prefix` on this element (`""` for the default namespace)
    pub fn namespace_for(&self, prefix: &str) -> Option<&str> {
        let key = if prefix.is_empty() {
            "xmlns".to_string()
        } else {
            format!("xmlns:{}", prefix)
        };
        self.attributes
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Strip a namespace prefix: `wsdl:operation` → `operation`, `tns:Foo` → `Foo`
pub fn local(qualified: &str) -> &str {
    qualified.rsplit(':').next().unwrap_or(qualified)
}

/// Parse a document and return its root element.
///
/// Declarations, comments, processing instructions and doctype are ignored.
pub fn parse(content: &str) -> Result<XmlElement, XmlError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                stack.push(start_element(e));
            }
            Ok(Event::Empty(ref e)) => {
                let element = start_element(e);
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::End(_)) => {
                let element = stack.pop().ok_or(XmlError::Unbalanced)?;
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::Text(e)) => {
                if let Some(current) = stack.last_mut() {
                    let text = e
                        .unescape()
                        .map(|t| t.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());
                    current.text.push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(XmlError::Syntax {
                    position: reader.error_position() as u64,
                    message: e.to_string(),
                });
            }
        }
    }

    if !stack.is_empty() {
        return Err(XmlError::Syntax {
            position: reader.buffer_position() as u64,
            message: format!("unclosed element <{}>", stack[stack.len() - 1].name),
        });
    }
    root.ok_or(XmlError::Empty)
}

fn start_element(e: &BytesStart<'_>) -> XmlElement {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let attributes = e
        .attributes()
        .flatten()
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
            (key, value)
        })
        .collect();
    XmlElement {
        name,
        attributes,
        children: Vec::new(),
        text: String::new(),
    }
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

/// Escape text for inclusion in generated XML
pub fn escape(text: &str) -> String {
    quick_xml::escape::escape(text).into_owned()
}

/// Render a JSON example as an indented XML fragment rooted at `name`.
///
/// Arrays repeat the element once per item; `null` and empty objects
/// become self-closing elements.
pub fn render_value(name: &str, value: &serde_json::Value) -> String {
    let mut out = String::new();
    write_value(&mut out, name, value, 0);
    out.trim_end().to_string()
}

fn write_value(out: &mut String, name: &str, value: &serde_json::Value, indent: usize) {
    use serde_json::Value;

    let pad = "  ".repeat(indent);
    match value {
        Value::Object(fields) if !fields.is_empty() => {
            out.push_str(&format!("{}<{}>\n", pad, name));
            for (key, child) in fields {
                write_value(out, key, child, indent + 1);
            }
            out.push_str(&format!("{}</{}>\n", pad, name));
        }
        Value::Array(items) => {
            for item in items {
                write_value(out, name, item, indent);
            }
        }
        Value::Object(_) | Value::Null => out.push_str(&format!("{}<{}/>\n", pad, name)),
        Value::String(text) => {
            out.push_str(&format!("{}<{}>{}</{}>\n", pad, name, escape(text), name))
        }
        other => out.push_str(&format!("{}<{}>{}</{}>\n", pad, name, other, name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_elements_with_prefixes() {
        let xml = r#"<?xml version="1.0"?>
            <wsdl:definitions xmlns:wsdl="http://schemas.xmlsoap.org/wsdl/" name="Calc">
              <wsdl:portType name="CalcPort">
                <wsdl:operation name="Add"/>
                <wsdl:operation name="Subtract"/>
              </wsdl:portType>
            </wsdl:definitions>"#;
        let root = parse(xml).unwrap();
        assert_eq!(root.local_name(), "definitions");
        assert_eq!(root.attr("name"), Some("Calc"));
        assert_eq!(
            root.namespace_for("wsdl"),
            Some("http://schemas.xmlsoap.org/wsdl/")
        );
        let port_type = root.child("portType").unwrap();
        let names: Vec<&str> = port_type
            .children_named("operation")
            .filter_map(|op| op.attr("name"))
            .collect();
        assert_eq!(names, vec!["Add", "Subtract"]);
        assert_eq!(root.descendants("operation").len(), 2);
    }

    #[test]
    fn test_text_and_cdata() {
        let xml = "<a><b>hello &amp; bye</b><c><![CDATA[<raw/>]]></c></a>";
        let root = parse(xml).unwrap();
        assert_eq!(root.child_text("b"), Some("hello & bye"));
        assert_eq!(root.child_text("c"), Some("<raw/>"));
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        assert!(parse("<a><b></a>").is_err());
        assert!(parse("<a>").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn test_render_value() {
        let value = serde_json::json!({"id": 0, "name": "a&b", "tags": ["x", "y"], "meta": {}});
        assert_eq!(
            render_value("user", &value),
            "<user>\n  <id>0</id>\n  <name>a&amp;b</name>\n  <tags>x</tags>\n  <tags>y</tags>\n  <meta/>\n</user>"
        );
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local("tns:User"), "User");
        assert_eq!(local("User"), "User");
    }
}
