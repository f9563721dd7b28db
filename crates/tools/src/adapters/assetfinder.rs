use crate::adapters::parse_subdomain_lines;
use crate::contract::{ScanOptions, ToolAdapter, ToolCategory, ToolConfig, ToolResult};

pub struct AssetFinder {
    config: ToolConfig,
}

impl AssetFinder {
    pub fn new() -> Self {
        Self {
            config: ToolConfig::new(
                "assetfinder",
                "assetfinder",
                ToolCategory::Subdomain,
                "find related domains and subdomains",
            )
            .consumes(&["domain"])
            .produces(&["subdomain"]),
        }
    }
}

impl ToolAdapter for AssetFinder {
    fn config(&self) -> &ToolConfig {
        &self.config
    }

    fn build_command(&self, target: &str, _opts: &ScanOptions) -> Vec<String> {
        vec!["assetfinder".into(), "--subs-only".into(), target.into()]
    }

    fn parse_output(&self, output: &str) -> ToolResult {
        parse_subdomain_lines(&self.config.name, output)
    }

    fn parse_partial(&self, accumulated: &str) -> ToolResult {
        self.parse_output(accumulated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subdomains() {
        let adapter = AssetFinder::new();
        let result = adapter.parse_output("api.example.com\n");
        assert_eq!(result.assets.len(), 1);
    }
}
