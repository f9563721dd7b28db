use recon_domain::{Asset, Finding, Severity};
use serde::Deserialize;
use serde_json::json;

use crate::contract::{ScanOptions, ToolAdapter, ToolCategory, ToolConfig, ToolResult};

pub struct Httpx {
    config: ToolConfig,
}

impl Httpx {
    pub fn new() -> Self {
        Self {
            config: ToolConfig::new("httpx", "httpx", ToolCategory::WebProbe, "HTTP service probing and fingerprinting")
                .consumes(&["subdomain"])
                .produces(&["http_service"]),
        }
    }
}

#[derive(Deserialize)]
struct HttpxLine {
    url: String,
    status_code: Option<i64>,
    title: Option<String>,
    #[serde(default)]
    tech: Vec<String>,
}

const SENSITIVE_TITLE_KEYWORDS: &[&str] = &["admin", "login", "dashboard", "panel", "console"];

fn parse(tool_name: &str, output: &str) -> ToolResult {
    let mut assets = Vec::new();
    let mut findings = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(parsed) = serde_json::from_str::<HttpxLine>(line) else {
            continue;
        };

        let title = parsed.title.clone().unwrap_or_default();
        let mut meta = recon_domain::Metadata::new();
        meta.insert("status_code".into(), json!(parsed.status_code));
        meta.insert("title".into(), json!(title));
        meta.insert("technologies".into(), json!(parsed.tech));
        assets.push(Asset::new("http_service", parsed.url.clone(), tool_name).with_metadata(meta));

        if matches!(parsed.status_code, Some(401) | Some(403)) {
            findings.push(Finding::new(
                Severity::Medium,
                "Protected Resource",
                parsed.url.clone(),
                format!("{} responded with status {}", parsed.url, parsed.status_code.unwrap()),
                tool_name,
            ));
        }

        let lower_title = title.to_ascii_lowercase();
        if SENSITIVE_TITLE_KEYWORDS.iter().any(|k| lower_title.contains(k)) {
            findings.push(Finding::new(
                Severity::Medium,
                "Sensitive Page Detected",
                parsed.url.clone(),
                format!("page title '{title}' suggests an administrative or sensitive surface"),
                tool_name,
            ));
        }
    }

    ToolResult {
        tool_name: tool_name.to_string(),
        success: true,
        raw_output: output.to_string(),
        assets,
        findings,
        ..Default::default()
    }
}

impl ToolAdapter for Httpx {
    fn config(&self) -> &ToolConfig {
        &self.config
    }

    fn build_command(&self, target: &str, _opts: &ScanOptions) -> Vec<String> {
        vec!["httpx".into(), "-u".into(), target.into(), "-json".into(), "-silent".into()]
    }

    fn parse_output(&self, output: &str) -> ToolResult {
        parse(&self.config.name, output)
    }

    fn parse_partial(&self, accumulated: &str) -> ToolResult {
        parse(&self.config.name, accumulated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_http_service_asset() {
        let adapter = Httpx::new();
        let line = r#"{"url":"https://a.example.com","status_code":200,"title":"Welcome","tech":["nginx"]}"#;
        let result = adapter.parse_output(line);
        assert_eq!(result.assets.len(), 1);
        assert_eq!(result.findings.len(), 0);
    }

    #[test]
    fn flags_protected_resource_on_401_and_403() {
        let adapter = Httpx::new();
        let line = r#"{"url":"https://a.example.com","status_code":403,"title":"Forbidden"}"#;
        let result = adapter.parse_output(line);
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].title, "Protected Resource");
    }

    #[test]
    fn flags_sensitive_titles_case_insensitively() {
        let adapter = Httpx::new();
        let line = r#"{"url":"https://a.example.com","status_code":200,"title":"Admin Dashboard"}"#;
        let result = adapter.parse_output(line);
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].title, "Sensitive Page Detected");
    }
}
