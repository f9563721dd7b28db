use crate::adapters::parse_subdomain_lines;
use crate::contract::{ScanOptions, ToolAdapter, ToolCategory, ToolConfig, ToolResult};

pub struct Subfinder {
    config: ToolConfig,
}

impl Subfinder {
    pub fn new() -> Self {
        Self {
            config: ToolConfig::new(
                "subfinder",
                "subfinder",
                ToolCategory::Subdomain,
                "passive subdomain enumeration",
            )
            .consumes(&["domain"])
            .produces(&["subdomain"]),
        }
    }
}

impl ToolAdapter for Subfinder {
    fn config(&self) -> &ToolConfig {
        &self.config
    }

    fn build_command(&self, target: &str, _opts: &ScanOptions) -> Vec<String> {
        vec!["subfinder".into(), "-d".into(), target.into(), "-silent".into()]
    }

    fn parse_output(&self, output: &str) -> ToolResult {
        parse_subdomain_lines(&self.config.name, output)
    }

    fn parse_partial(&self, accumulated: &str) -> ToolResult {
        self.parse_output(accumulated)
    }
}
