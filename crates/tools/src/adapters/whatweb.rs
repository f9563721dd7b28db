use recon_domain::Asset;
use serde_json::Value;

use crate::contract::{ScanOptions, ToolAdapter, ToolCategory, ToolConfig, ToolResult};

pub struct WhatWeb {
    config: ToolConfig,
}

impl WhatWeb {
    pub fn new() -> Self {
        Self {
            config: ToolConfig::new("whatweb", "whatweb", ToolCategory::Technology, "web technology fingerprinting")
                .consumes(&["http_service"])
                .produces(&["technology"]),
        }
    }
}

fn parse(tool_name: &str, output: &str) -> ToolResult {
    let mut assets = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(value) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        let Some(plugins) = value.get("plugins").and_then(Value::as_object) else {
            continue;
        };
        for (name, detail) in plugins {
            let version = detail
                .get("version")
                .and_then(Value::as_array)
                .and_then(|v| v.first())
                .and_then(Value::as_str)
                .unwrap_or_default();
            let value = if version.is_empty() {
                name.clone()
            } else {
                format!("{name} {version}")
            };
            assets.push(Asset::new("technology", value, tool_name));
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

impl ToolAdapter for WhatWeb {
    fn config(&self) -> &ToolConfig {
        &self.config
    }

    fn build_command(&self, target: &str, _opts: &ScanOptions) -> Vec<String> {
        vec!["whatweb".into(), target.into(), "--log-json=/dev/stdout".into()]
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
    fn extracts_plugin_name_and_version() {
        let adapter = WhatWeb::new();
        let line = r#"{"target":"https://a.example.com","plugins":{"nginx":{"version":["1.18.0"]},"WordPress":{}}}"#;
        let result = adapter.parse_output(line);
        assert_eq!(result.assets.len(), 2);
        assert!(result.assets.iter().any(|a| a.value == "nginx 1.18.0"));
        assert!(result.assets.iter().any(|a| a.value == "WordPress"));
    }
}
