use recon_domain::{Asset, Finding, Severity};
use regex::Regex;

use crate::contract::{ScanOptions, ToolAdapter, ToolCategory, ToolConfig, ToolResult};

pub struct Wafw00f {
    config: ToolConfig,
}

impl Wafw00f {
    pub fn new() -> Self {
        Self {
            config: ToolConfig::new("wafw00f", "wafw00f", ToolCategory::Technology, "web application firewall detection")
                .consumes(&["http_service"])
                .produces(&["waf"]),
        }
    }
}

fn parse(tool_name: &str, output: &str) -> ToolResult {
    let paren_re = Regex::new(r"\(([^)]+)\)").unwrap();
    let mut assets = Vec::new();
    let mut findings = Vec::new();

    for line in output.lines() {
        let lower = line.to_ascii_lowercase();
        if !lower.contains("is behind") && !lower.contains("detected") {
            continue;
        }
        let name = paren_re
            .captures(line)
            .map(|c| c[1].trim().to_string())
            .unwrap_or_else(|| line.trim().to_string());

        assets.push(Asset::new("waf", name.clone(), tool_name));
        findings.push(Finding::new(
            Severity::Info,
            format!("WAF Detected: {name}"),
            "",
            line.trim(),
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

impl ToolAdapter for Wafw00f {
    fn config(&self) -> &ToolConfig {
        &self.config
    }

    fn build_command(&self, target: &str, _opts: &ScanOptions) -> Vec<String> {
        vec!["wafw00f".into(), target.into()]
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
    fn extracts_waf_name_from_parens() {
        let adapter = Wafw00f::new();
        let result = adapter.parse_output("The site https://a.example.com is behind Cloudflare (Cloudflare Inc.) WAF.\n");
        assert_eq!(result.assets.len(), 1);
        assert_eq!(result.assets[0].value, "Cloudflare Inc.");
        assert_eq!(result.findings[0].title, "WAF Detected: Cloudflare Inc.");
    }
}
