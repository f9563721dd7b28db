use recon_domain::{Asset, Metadata};
use serde::Deserialize;
use serde_json::json;

use crate::contract::{ScanOptions, ToolAdapter, ToolCategory, ToolConfig, ToolResult};

pub struct Masscan {
    config: ToolConfig,
}

impl Masscan {
    pub fn new() -> Self {
        Self {
            config: ToolConfig::new("masscan", "masscan", ToolCategory::PortScan, "internet-scale port scanner")
                .consumes(&["ip"])
                .produces(&["port"])
                .requires_root(),
        }
    }
}

#[derive(Deserialize)]
struct PortEntry {
    port: u32,
    proto: Option<String>,
}

#[derive(Deserialize)]
struct MasscanLine {
    ip: String,
    #[serde(default)]
    ports: Vec<PortEntry>,
}

fn parse(tool_name: &str, output: &str) -> ToolResult {
    let mut assets = Vec::new();

    for raw_line in output.lines() {
        let line = raw_line.trim().trim_end_matches(',');
        if line.is_empty() || line.starts_with('#') || line == "[" || line == "]" {
            continue;
        }
        let Ok(parsed) = serde_json::from_str::<MasscanLine>(line) else {
            continue;
        };
        for port in &parsed.ports {
            let mut meta = Metadata::new();
            meta.insert("port".into(), json!(port.port));
            meta.insert("protocol".into(), json!(port.proto.clone().unwrap_or_default()));
            assets.push(
                Asset::new("port", format!("{}:{}", parsed.ip, port.port), tool_name).with_metadata(meta),
            );
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

impl ToolAdapter for Masscan {
    fn config(&self) -> &ToolConfig {
        &self.config
    }

    fn build_command(&self, target: &str, _opts: &ScanOptions) -> Vec<String> {
        vec!["masscan".into(), target.into(), "-p0-65535".into(), "--rate".into(), "1000".into(), "-oJ".into(), "-".into()]
    }

    fn parse_output(&self, output: &str) -> ToolResult {
        parse(&self.config.name, output)
    }

    fn parse_partial(&self, accumulated: &str) -> ToolResult {
        parse(&self.config.name, accumulated)
    }
}
