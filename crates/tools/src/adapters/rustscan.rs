use recon_domain::Asset;
use regex::Regex;

use crate::contract::{ScanOptions, ToolAdapter, ToolCategory, ToolConfig, ToolResult};

pub struct RustScan {
    config: ToolConfig,
}

impl RustScan {
    pub fn new() -> Self {
        Self {
            config: ToolConfig::new("rustscan", "rustscan", ToolCategory::PortScan, "fast port scanner")
                .consumes(&["ip"])
                .produces(&["port"]),
        }
    }
}

fn parse(tool_name: &str, output: &str) -> ToolResult {
    let line_re = Regex::new(r"(\S+)\s*->\s*\[(.+)\]").unwrap();
    let mut assets = Vec::new();

    for line in output.lines() {
        let Some(caps) = line_re.captures(line) else {
            continue;
        };
        let ip = caps[1].to_string();
        for port in caps[2].split(',') {
            let port = port.trim();
            if port.is_empty() {
                continue;
            }
            assets.push(Asset::new("port", format!("{ip}:{port}"), tool_name));
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

impl ToolAdapter for RustScan {
    fn config(&self) -> &ToolConfig {
        &self.config
    }

    fn build_command(&self, target: &str, _opts: &ScanOptions) -> Vec<String> {
        vec!["rustscan".into(), "-a".into(), target.into(), "-g".into()]
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
    fn parses_greppable_output() {
        let adapter = RustScan::new();
        let result = adapter.parse_output("10.0.0.1 -> [22,80,443]\n");
        assert_eq!(result.assets.len(), 3);
        assert_eq!(result.assets[0].value, "10.0.0.1:22");
    }
}
