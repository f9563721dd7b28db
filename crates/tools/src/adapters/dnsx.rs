use recon_domain::Asset;
use serde::Deserialize;
use serde_json::json;

use crate::contract::{ScanOptions, ToolAdapter, ToolCategory, ToolConfig, ToolResult};

pub struct Dnsx {
    config: ToolConfig,
}

impl Dnsx {
    pub fn new() -> Self {
        Self {
            config: ToolConfig::new("dnsx", "dnsx", ToolCategory::Dns, "fast DNS resolution and record lookup")
                .consumes(&["subdomain"])
                .produces(&["ip"]),
        }
    }
}

#[derive(Deserialize)]
struct DnsxLine {
    host: Option<String>,
    a: Option<Vec<String>>,
    aaaa: Option<Vec<String>>,
}

fn parse(tool_name: &str, output: &str) -> ToolResult {
    let mut assets = Vec::new();
    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(parsed) = serde_json::from_str::<DnsxLine>(line) else {
            continue;
        };
        let host = parsed.host.clone().unwrap_or_default();
        for ip in parsed.a.unwrap_or_default() {
            assets.push(
                Asset::new("ip", ip, tool_name)
                    .with_metadata([("hostname".to_string(), json!(host.clone()))].into()),
            );
        }
        for ip in parsed.aaaa.unwrap_or_default() {
            assets.push(Asset::new("ip", ip, tool_name).with_metadata(
                [
                    ("hostname".to_string(), json!(host.clone())),
                    ("ipv6".to_string(), json!(true)),
                ]
                .into(),
            ));
        }
    }
    ToolResult {
        tool_name: tool_name.to_string(),
        success: true,
        raw_output: output.to_string(),
        assets,
        ..Default::default()
    }
}

impl ToolAdapter for Dnsx {
    fn config(&self) -> &ToolConfig {
        &self.config
    }

    fn build_command(&self, target: &str, _opts: &ScanOptions) -> Vec<String> {
        vec![
            "dnsx".into(),
            "-d".into(),
            target.into(),
            "-a".into(),
            "-aaaa".into(),
            "-json".into(),
            "-silent".into(),
        ]
    }

    fn parse_output(&self, output: &str) -> ToolResult {
        parse(&self.config.name, output)
    }

    fn parse_partial(&self, accumulated: &str) -> ToolResult {
        parse(&self.config.name, accumulated)
    }
}
