//! WADL importer
//!
//! Walks `resources/resource/method` in the generic XML tree. Resource paths
//! are joined onto `resources@base`; `param` elements with style `query` or
//! `header` declared on a resource apply to every method beneath it.

use super::{ImportContext, ImportError, ImportOptions, ImportResult, join_url};
use crate::formats::FormatId;
use crate::models::{BodyType, Collection, KeyValue, Request, RequestBody};
use crate::xml::{self, XmlElement};

/// WADL importer
#[derive(Debug, Default)]
pub struct WadlImporter;

impl WadlImporter {
    pub fn new() -> Self {
        Self
    }

    pub fn can_import(&self, content: &str) -> bool {
        content.trim_start().starts_with('<')
            && content.contains("<resources")
            && (content.contains("wadl") || content.contains("<application"))
    }

    /// Import a WADL document.
    ///
    /// # Example
    ///
    /// ```rust
    /// use api_interchange_sdk::import::{ImportOptions, wadl::WadlImporter};
    ///
    /// let wadl = r#"<application xmlns="http://wadl.dev.java.net/2009/02">
    ///   <resources base="https://api.test/v1/">
    ///     <resource path="users"><method name="GET" id="listUsers"/></resource>
    ///   </resources>
    /// </application>"#;
    /// let result = WadlImporter::new().import(wadl, &ImportOptions::default());
    /// assert_eq!(result.requests[0].url, "https://api.test/v1/users");
    /// ```
    pub fn import(&self, content: &str, options: &ImportOptions) -> ImportResult {
        match self.parse(content, options) {
            Ok(ctx) => ctx.finish(),
            Err(e) => ImportResult::failure(Some(FormatId::Wadl), e),
        }
    }

    fn parse(&self, content: &str, options: &ImportOptions) -> Result<ImportContext, ImportError> {
        let root = xml::parse(content)?;
        if root.local_name() != "application" {
            return Err(ImportError::InvalidDocument(format!(
                "expected <application> root, found <{}>",
                root.name
            )));
        }

        let mut ctx = ImportContext::new(FormatId::Wadl);
        let title = root
            .child("doc")
            .and_then(|doc| doc.attr("title"))
            .unwrap_or("WADL API")
            .to_string();
        let collection_idx = ctx.add_collection(Collection::new(title), None);

        let walker = Walker { root: &root };
        for resources in root.children_named("resources") {
            let base = resources
                .attr("base")
                .map(str::to_string)
                .unwrap_or_else(|| options.base_url_or_placeholder());
            for resource in resources.children_named("resource") {
                walker.walk_resource(resource, &base, &[], &mut ctx, collection_idx);
            }
        }
        if ctx.requests.is_empty() {
            ctx.warn("Document declares no resource methods");
        }
        Ok(ctx)
    }
}

struct Walker<'a> {
    root: &'a XmlElement,
}

impl<'a> Walker<'a> {
    fn walk_resource(
        &self,
        resource: &'a XmlElement,
        parent_url: &str,
        inherited: &[&'a XmlElement],
        ctx: &mut ImportContext,
        collection_idx: usize,
    ) {
        let url = join_url(parent_url, resource.attr("path").unwrap_or_default());
        let mut params: Vec<&XmlElement> = inherited.to_vec();
        params.extend(resource.children_named("param"));

        for method in resource.children_named("method") {
            let Some(method) = self.resolve_method(method) else {
                ctx.warn(format!(
                    "Skipped method reference {} under {}",
                    method.attr("href").unwrap_or_default(),
                    url
                ));
                continue;
            };
            let request = self.build_request(method, &url, &params);
            ctx.add_request(request, Some(collection_idx));
        }

        for child in resource.children_named("resource") {
            self.walk_resource(child, &url, &params, ctx, collection_idx);
        }
    }

    /// Follow `<method href="#id"/>` to the application-level definition
    fn resolve_method(&self, method: &'a XmlElement) -> Option<&'a XmlElement> {
        match method.attr("href") {
            Some(href) => {
                let id = href.trim_start_matches('#');
                self.root
                    .children_named("method")
                    .find(|m| m.attr("id") == Some(id))
            }
            None => Some(method),
        }
    }

    fn build_request<'e>(
        &self,
        method: &'e XmlElement,
        url: &str,
        inherited: &[&'e XmlElement],
    ) -> Request {
        let verb = method.attr("name").unwrap_or("GET").to_ascii_uppercase();
        let name = method
            .attr("id")
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} {}", verb, url));
        let mut request = Request::new(name, &verb, url);
        request.description = method
            .child("doc")
            .map(|d| d.text.trim().to_string())
            .filter(|d| !d.is_empty());

        let request_el = method.child("request");
        let own_params = request_el
            .into_iter()
            .flat_map(|r| r.children_named("param"));
        for param in inherited.iter().copied().chain(own_params) {
            let Some(name) = param.attr("name") else {
                continue;
            };
            let value = param
                .attr("default")
                .or_else(|| param.attr("fixed"))
                .unwrap_or_default();
            match param.attr("style").unwrap_or_default() {
                "query" => request.query_params.push(KeyValue::new(name, value)),
                "header" => request.headers.push(KeyValue::new(name, value)),
                _ => {}
            }
        }

        if let Some(representation) = request_el.and_then(|r| r.child("representation")) {
            let media = representation
                .attr("mediaType")
                .unwrap_or("application/xml");
            let body_type = BodyType::from_mime(media);
            let body = match body_type {
                BodyType::Json => RequestBody::new(BodyType::Json, "{}"),
                BodyType::UrlEncoded | BodyType::FormData => {
                    let pairs: Vec<KeyValue> = representation
                        .children_named("param")
                        .filter_map(|p| {
                            p.attr("name")
                                .map(|n| KeyValue::new(n, p.attr("default").unwrap_or_default()))
                        })
                        .collect();
                    RequestBody::from_pairs(body_type, &pairs)
                }
                _ => {
                    let element = representation
                        .attr("element")
                        .map(xml::local)
                        .unwrap_or("request");
                    RequestBody::new(
                        BodyType::Xml,
                        xml::render_value(element, &serde_json::Value::Null),
                    )
                }
            };
            request.body = Some(body);
            request.add_header_if_missing("Content-Type", media);
        }

        request
    }
}
