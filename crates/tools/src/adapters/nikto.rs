use recon_domain::{Finding, Severity};
use regex::Regex;

use crate::contract::{ScanOptions, ToolAdapter, ToolCategory, ToolConfig, ToolResult};

pub struct Nikto {
    config: ToolConfig,
}

impl Nikto {
    pub fn new() -> Self {
        Self {
            config: ToolConfig::new("nikto", "nikto", ToolCategory::Vulnerability, "web server vulnerability scanner")
                .consumes(&["http_service"]),
        }
    }
}

fn severity_for(lower: &str) -> Severity {
    if lower.contains("vulnerable") || lower.contains("exploit") || lower.contains("exposed") {
        Severity::High
    } else if lower.contains("outdated") || lower.contains("deprecated") || lower.contains("old") {
        Severity::Medium
    } else if lower.contains("missing") || lower.contains("weak") {
        Severity::Low
    } else {
        Severity::Info
    }
}

fn parse(tool_name: &str, output: &str) -> ToolResult {
    let osvdb_re = Regex::new(r"OSVDB-\d+").unwrap();
    let mut findings = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        if !line.starts_with('+') || line.len() < 10 {
            continue;
        }
        let lower = line.to_ascii_lowercase();
        let body = line.trim_start_matches('+').trim();

        let mut finding = Finding::new(severity_for(&lower), body.to_string(), "", body.to_string(), tool_name);
        if let Some(m) = osvdb_re.find(line) {
            finding.evidence = Some(m.as_str().to_string());
        }
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

impl ToolAdapter for Nikto {
    fn config(&self) -> &ToolConfig {
        &self.config
    }

    fn build_command(&self, target: &str, _opts: &ScanOptions) -> Vec<String> {
        vec!["nikto".into(), "-h".into(), target.into(), "-ask".into(), "no".into()]
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
    fn classifies_severity_by_keyword() {
        let adapter = Nikto::new();
        let output = "+ Server may be vulnerable to XST\n+ Outdated version of OpenSSL detected\n+ /admin/: Missing X-Frame-Options header\n+ Cookie set without HttpOnly flag\n";
        let result = adapter.parse_output(output);
        assert_eq!(result.findings.len(), 4);
        assert_eq!(result.findings[0].severity, Severity::High);
        assert_eq!(result.findings[1].severity, Severity::Medium);
        assert_eq!(result.findings[2].severity, Severity::Low);
        assert_eq!(result.findings[3].severity, Severity::Info);
    }

    #[test]
    fn extracts_osvdb_reference() {
        let adapter = Nikto::new();
        let result = adapter.parse_output("+ OSVDB-3092: /admin/: This might be interesting\n");
        assert_eq!(result.findings[0].evidence.as_deref(), Some("OSVDB-3092"));
    }

    #[test]
    fn skips_short_and_non_plus_lines() {
        let adapter = Nikto::new();
        let result = adapter.parse_output("- Nikto v2.5.0\n+ ok\n");
        assert!(result.findings.is_empty());
    }
}
