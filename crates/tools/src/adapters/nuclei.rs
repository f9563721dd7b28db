use recon_domain::{Finding, Severity};
use serde_json::Value;

use crate::contract::{ScanOptions, ToolAdapter, ToolCategory, ToolConfig, ToolResult};

pub struct Nuclei {
    config: ToolConfig,
}

impl Nuclei {
    pub fn new() -> Self {
        Self {
            config: ToolConfig::new("nuclei", "nuclei", ToolCategory::Vulnerability, "template-driven vulnerability scanner")
                .consumes(&["http_service"]),
        }
    }
}

fn severity_from_str(s: &str) -> Severity {
    match s.to_ascii_lowercase().as_str() {
        "critical" => Severity::Critical,
        "high" => Severity::High,
        "medium" => Severity::Medium,
        "low" => Severity::Low,
        _ => Severity::Info,
    }
}

fn parse(tool_name: &str, output: &str) -> ToolResult {
    let mut findings = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(value) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        let severity_str = value
            .get("info")
            .and_then(|i| i.get("severity"))
            .and_then(Value::as_str)
            .unwrap_or("info");
        let name = value
            .get("info")
            .and_then(|i| i.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("nuclei finding");
        let host = value.get("host").and_then(Value::as_str).unwrap_or_default();
        let evidence = serde_json::to_string_pretty(&value).unwrap_or_default();

        let mut finding = Finding::new(
            severity_from_str(severity_str),
            name.to_string(),
            host.to_string(),
            format!("nuclei template matched on {host}"),
            tool_name,
        );
        finding.evidence = Some(evidence);
        finding.recommendations = vec![
            "Review the matched template for remediation guidance".to_string(),
            "Patch or reconfigure the affected service".to_string(),
        ];
        findings.push(finding);
    }

    ToolResult {
        tool_name: tool_name.to_string(),
        success: true,
        raw_output: output.to_string(),
        findings,
        ..Default::default()
    }
}

impl ToolAdapter for Nuclei {
    fn config(&self) -> &ToolConfig {
        &self.config
    }

    fn build_command(&self, target: &str, _opts: &ScanOptions) -> Vec<String> {
        vec!["nuclei".into(), "-u".into(), target.into(), "-jsonl".into(), "-silent".into()]
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
    fn maps_nuclei_severity_strings() {
        let adapter = Nuclei::new();
        let line = r#"{"host":"https://a.example.com","info":{"name":"exposed-panel","severity":"high"}}"#;
        let result = adapter.parse_output(line);
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].severity, Severity::High);
        assert!(result.findings[0].evidence.is_some());
        assert!(!result.findings[0].recommendations.is_empty());
    }
}
