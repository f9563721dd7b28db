use recon_domain::{Asset, Finding, Severity};
use regex::Regex;
use serde_json::json;

use crate::contract::{ScanOptions, ToolAdapter, ToolCategory, ToolConfig, ToolResult};

pub struct Whois {
    config: ToolConfig,
}

impl Whois {
    pub fn new() -> Self {
        Self {
            config: ToolConfig::new("whois", "whois", ToolCategory::Osint, "domain registration lookup")
                .consumes(&["domain"])
                .produces(&["whois_info", "nameserver"]),
        }
    }
}

fn parse(tool_name: &str, output: &str) -> ToolResult {
    let registrar_re = Regex::new(r"(?mi)^Registrar:\s*(.+)$").unwrap();
    let created_re = Regex::new(r"(?mi)^Creation Date:\s*(.+)$").unwrap();
    let ns_re = Regex::new(r"(?mi)^Name Server:\s*(.+)$").unwrap();

    let registrar = registrar_re.captures(output).map(|c| c[1].trim().to_string());
    let created = created_re.captures(output).map(|c| c[1].trim().to_string());

    let mut assets = Vec::new();
    if registrar.is_some() || created.is_some() {
        let mut meta = recon_domain::Metadata::new();
        if let Some(r) = &registrar {
            meta.insert("registrar".into(), json!(r));
        }
        if let Some(c) = &created {
            meta.insert("creation_date".into(), json!(c));
        }
        assets.push(Asset::new("whois_info", registrar.clone().unwrap_or_default(), tool_name).with_metadata(meta));
    }

    for cap in ns_re.captures_iter(output) {
        assets.push(Asset::new("nameserver", cap[1].trim().to_string(), tool_name));
    }

    let mut findings = Vec::new();
    let lower = output.to_ascii_lowercase();
    if lower.contains("redacted") || lower.contains("privacy") {
        findings.push(Finding::new(
            Severity::Info,
            "Domain Privacy Enabled",
            "",
            "WHOIS registration details are redacted by a privacy service",
            tool_name,
        ));
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

impl ToolAdapter for Whois {
    fn config(&self) -> &ToolConfig {
        &self.config
    }

    fn build_command(&self, target: &str, _opts: &ScanOptions) -> Vec<String> {
        vec!["whois".into(), target.into()]
    }

    fn parse_output(&self, output: &str) -> ToolResult {
        parse(&self.config.name, output)
    }

    // whois's output is not line-delimited; the default `parse_partial`
    // (no discoveries until the final parse) is correct here.
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_registrar_and_nameservers() {
        let adapter = Whois::new();
        let output = "Registrar: Example Registrar LLC\nCreation Date: 1999-01-01T00:00:00Z\nName Server: ns1.example.com\nName Server: ns2.example.com\n";
        let result = adapter.parse_output(output);
        assert_eq!(result.assets.iter().filter(|a| a.kind == "whois_info").count(), 1);
        assert_eq!(result.assets.iter().filter(|a| a.kind == "nameserver").count(), 2);
    }

    #[test]
    fn detects_privacy_redaction() {
        let adapter = Whois::new();
        let result = adapter.parse_output("Registrant Name: REDACTED FOR PRIVACY\n");
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].title, "Domain Privacy Enabled");
    }
}
