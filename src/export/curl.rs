//! cURL exporter
//!
//! One command per request, each preceded by a `# name` comment line.

use super::{
    ExportBundle, ExportError, ExportOptions, ExportOutput, ExportResult, exportable_requests,
    finish,
};
use crate::curl::generate_curl;
use crate::formats::FormatId;

/// cURL command exporter
#[derive(Debug, Default)]
pub struct CurlExporter;

impl CurlExporter {
    pub fn new() -> Self {
        Self
    }

    pub fn export(&self, bundle: &ExportBundle, options: &ExportOptions) -> ExportResult {
        finish(FormatId::Curl, self.render(bundle, options))
    }

    fn render(
        &self,
        bundle: &ExportBundle,
        _options: &ExportOptions,
    ) -> Result<ExportOutput, ExportError> {
        let mut warnings = Vec::new();
        let requests = exportable_requests(bundle, &mut warnings);
        if !bundle.environments.is_empty() {
            warnings.push(format!(
                "cURL output carries no environments; {} not exported",
                bundle.environments.len()
            ));
        }

        let commands: Vec<String> = requests
            .iter()
            .map(|request| {
                let comment = comment_text(&request.name);
                format!("# {}\n{}", comment, generate_curl(request))
            })
            .collect();
        let mut data = commands.join("\n\n");
        if !data.is_empty() {
            data.push('\n');
        }
        Ok(ExportOutput {
            data,
            item_count: requests.len(),
            warnings,
        })
    }
}

/// Keep a name on its single comment line
fn comment_text(name: &str) -> String {
    name.split(['\r', '\n'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{ImportOptions, curl::CurlImporter};
    use crate::models::{BodyType, KeyValue, Request, RequestBody};

    #[test]
    fn test_commands_read_back() {
        let mut create = Request::new("Create", "POST", "https://a.test/items");
        create.headers = vec![KeyValue::new("Content-Type", "application/json")];
        create.body = Some(RequestBody::new(BodyType::Raw, "{\"it's\": 1}"));
        let list = Request::new("List", "GET", "https://a.test/items");
        let bundle = ExportBundle::new(Vec::new(), vec![create, list]);

        let result = CurlExporter::new().export(&bundle, &ExportOptions::default());
        assert!(result.success);
        let data = result.data.unwrap();
        assert!(data.starts_with("# Create\ncurl -X POST"));

        let imported = CurlImporter::new().import(&data, &ImportOptions::default());
        assert_eq!(imported.requests.len(), 2);
        assert_eq!(imported.requests[0].method, "POST");
        let body = &imported.requests[0].body.as_ref().unwrap().content;
        assert_eq!(body, "{\"it's\": 1}");
        assert_eq!(imported.requests[1].method, "GET");
    }

    #[test]
    fn test_multiline_names_stay_in_comment() {
        let request = Request::new("List\nall items\r\n", "GET", "https://a.test/items");
        let bundle = ExportBundle::new(Vec::new(), vec![request]);

        let data = CurlExporter::new()
            .export(&bundle, &ExportOptions::default())
            .data
            .unwrap();
        assert!(data.starts_with("# List all items\ncurl"));
        let comments = data.lines().filter(|line| line.starts_with('#'));
        assert_eq!(comments.count(), 1);
    }
}
