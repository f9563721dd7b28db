use recon_domain::{Finding, Severity};
use serde_json::Value;

use crate::contract::{ScanOptions, ToolAdapter, ToolCategory, ToolConfig, ToolResult};

pub struct WpScan {
    config: ToolConfig,
}

impl WpScan {
    pub fn new() -> Self {
        Self {
            config: ToolConfig::new("wpscan", "wpscan", ToolCategory::Vulnerability, "WordPress vulnerability scanner")
                .consumes(&["http_service"]),
        }
    }
}

fn vulnerabilities_of(entry: &Value) -> Vec<&Value> {
    entry
        .get("vulnerabilities")
        .and_then(Value::as_array)
        .map(|v| v.iter().collect())
        .unwrap_or_default()
}

fn parse(tool_name: &str, output: &str) -> ToolResult {
    let Ok(root) = serde_json::from_str::<Value>(output) else {
        return ToolResult::failure(tool_name, "wpscan output is not valid JSON");
    };

    let mut findings = Vec::new();

    if let Some(version) = root.get("version") {
        let number = version.get("number").and_then(Value::as_str).unwrap_or("unknown");
        let insecure = version
            .get("status")
            .and_then(Value::as_str)
            .map(|s| s == "insecure")
            .unwrap_or(false);
        if insecure {
            findings.push(Finding::new(
                Severity::High,
                "Outdated WordPress Version",
                "",
                format!("WordPress {number} is flagged as insecure"),
                tool_name,
            ));
        }
    }

    if let Some(plugins) = root.get("plugins").and_then(Value::as_object) {
        for (name, entry) in plugins {
            for vuln in vulnerabilities_of(entry) {
                let title = vuln.get("title").and_then(Value::as_str).unwrap_or("Vulnerable Plugin");
                findings.push(Finding::new(
                    Severity::High,
                    format!("Vulnerable Plugin: {name}"),
                    "",
                    title.to_string(),
                    tool_name,
                ));
            }
        }
    }

    if let Some(themes) = root.get("themes").and_then(Value::as_object) {
        for (name, entry) in themes {
            for vuln in vulnerabilities_of(entry) {
                let title = vuln.get("title").and_then(Value::as_str).unwrap_or("Vulnerable Theme");
                findings.push(Finding::new(
                    Severity::Medium,
                    format!("Vulnerable Theme: {name}"),
                    "",
                    title.to_string(),
                    tool_name,
                ));
            }
        }
    }

    ToolResult {
        tool_name: tool_name.to_string(),
        success: true,
        raw_output: output.to_string(),
        findings,
        ..Default::default()
    }
}

impl ToolAdapter for WpScan {
    fn config(&self) -> &ToolConfig {
        &self.config
    }

    fn build_command(&self, target: &str, _opts: &ScanOptions) -> Vec<String> {
        vec!["wpscan".into(), "--url".into(), target.into(), "--format".into(), "json".into(), "--no-banner".into()]
    }

    fn parse_output(&self, output: &str) -> ToolResult {
        parse(&self.config.name, output)
    }

    // wpscan emits one JSON document at the end of the run; there is
    // nothing meaningful to report before then.
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_insecure_wordpress_version() {
        let adapter = WpScan::new();
        let output = r#"{"version":{"number":"5.1","status":"insecure"}}"#;
        let result = adapter.parse_output(output);
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].title, "Outdated WordPress Version");
        assert_eq!(result.findings[0].severity, Severity::High);
    }

    #[test]
    fn collects_plugin_and_theme_vulnerabilities() {
        let adapter = WpScan::new();
        let output = r#"{
            "plugins": {"contact-form-7": {"vulnerabilities": [{"title": "CSRF in CF7"}]}},
            "themes": {"twentyseventeen": {"vulnerabilities": [{"title": "XSS in theme"}]}}
        }"#;
        let result = adapter.parse_output(output);
        assert_eq!(result.findings.len(), 2);
        assert!(result.findings.iter().any(|f| f.severity == Severity::High && f.title.contains("contact-form-7")));
        assert!(result.findings.iter().any(|f| f.severity == Severity::Medium && f.title.contains("twentyseventeen")));
    }

    #[test]
    fn invalid_json_reports_failure() {
        let adapter = WpScan::new();
        let result = adapter.parse_output("not json");
        assert!(!result.success);
    }
}
