use crate::adapters::parse_subdomain_lines;
use crate::contract::{ScanOptions, ToolAdapter, ToolCategory, ToolConfig, ToolResult};

pub struct Amass {
    config: ToolConfig,
}

impl Amass {
    pub fn new() -> Self {
        Self {
            config: ToolConfig::new("amass", "amass", ToolCategory::Subdomain, "in-depth attack surface mapping")
                .consumes(&["domain"])
                .produces(&["subdomain"]),
        }
    }
}

impl ToolAdapter for Amass {
    fn config(&self) -> &ToolConfig {
        &self.config
    }

    fn build_command(&self, target: &str, _opts: &ScanOptions) -> Vec<String> {
        vec!["amass".into(), "enum".into(), "-passive".into(), "-d".into(), target.into()]
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
        let adapter = Amass::new();
        let result = adapter.parse_output("mail.example.com\n");
        assert_eq!(result.assets.len(), 1);
        assert_eq!(result.assets[0].discovered_by, "amass");
    }
}
