//! The chain rule engine: given a discovered asset, decide what tools
//! should run against it next. See `SPEC_FULL.md` §4.3.

use std::sync::Arc;

use recon_domain::Asset;

pub type Predicate = Arc<dyn Fn(&Asset) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct ChainRule {
    pub name: String,
    pub condition: Predicate,
    pub target_tool: String,
    pub reason: String,
    pub priority: i32,
}

impl ChainRule {
    pub fn new(
        name: impl Into<String>,
        condition: Predicate,
        target_tool: impl Into<String>,
        reason: impl Into<String>,
        priority: i32,
    ) -> Self {
        Self {
            name: name.into(),
            condition,
            target_tool: target_tool.into(),
            reason: reason.into(),
            priority,
        }
    }
}

/// One match: which tool to run next, why, and at what priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainMatch {
    pub target_tool: String,
    pub reason: String,
    pub priority: i32,
}

pub struct RulesEngine {
    rules: Vec<ChainRule>,
}

impl RulesEngine {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_defaults() -> Self {
        let mut engine = Self::new();
        engine.init_default_rules();
        engine
    }

    fn init_default_rules(&mut self) {
        let is_type = |t: &'static str| -> Predicate { Arc::new(move |a: &Asset| a.kind == t) };

        self.rules = vec![
            ChainRule::new("domain_to_dns", is_type("domain"), "dnsrecon", "Enumerate DNS records", 10),
            ChainRule::new("domain_to_whois", is_type("domain"), "whois", "Get WHOIS information", 9),
            ChainRule::new("domain_to_subfinder", is_type("domain"), "subfinder", "Find subdomains", 10),
            ChainRule::new("domain_to_amass", is_type("domain"), "amass", "Deep subdomain enumeration", 8),
            ChainRule::new("subdomain_to_dnsx", is_type("subdomain"), "dnsx", "Resolve subdomain IPs", 9),
            ChainRule::new("subdomain_to_httpx", is_type("subdomain"), "httpx", "Probe for HTTP services", 8),
            ChainRule::new("http_to_whatweb", is_type("http_service"), "whatweb", "Identify web technologies", 7),
            ChainRule::new("http_to_wafw00f", is_type("http_service"), "wafw00f", "Detect WAF", 6),
            ChainRule::new("http_to_nuclei", is_type("http_service"), "nuclei", "Scan for vulnerabilities", 7),
            ChainRule::new(
                "wordpress_to_wpscan",
                Arc::new(|a: &Asset| {
                    a.kind == "http_service"
                        && a.metadata.get("technology").and_then(|v| v.as_str()) == Some("WordPress")
                }),
                "wpscan",
                "Scan WordPress site",
                8,
            ),
            ChainRule::new("ip_to_nmap", is_type("ip"), "nmap", "Scan for open ports", 9),
            ChainRule::new("ip_to_rustscan", is_type("ip"), "rustscan", "Fast port scan", 8),
        ];
    }

    /// Tools to run next for this asset, sorted by priority descending;
    /// ties keep declaration order (`sort_by` is stable).
    pub fn get_next_tools(&self, asset: &Asset) -> Vec<ChainMatch> {
        let mut matches: Vec<ChainMatch> = self
            .rules
            .iter()
            .filter(|rule| (rule.condition)(asset))
            .map(|rule| ChainMatch {
                target_tool: rule.target_tool.clone(),
                reason: rule.reason.clone(),
                priority: rule.priority,
            })
            .collect();
        matches.sort_by(|a, b| b.priority.cmp(&a.priority));
        matches
    }

    pub fn add_rule(&mut self, rule: ChainRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[ChainRule] {
        &self.rules
    }
}

impl Default for RulesEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recon_domain::Metadata;
    use serde_json::json;

    #[test]
    fn domain_asset_matches_four_rules_sorted_by_priority() {
        let engine = RulesEngine::with_defaults();
        let asset = Asset::new("domain", "example.com", "seed");
        let matches = engine.get_next_tools(&asset);
        let tools: Vec<&str> = matches.iter().map(|m| m.target_tool.as_str()).collect();
        assert_eq!(tools, vec!["dnsrecon", "subfinder", "whois", "amass"]);
    }

    #[test]
    fn wordpress_http_service_matches_wpscan() {
        let engine = RulesEngine::with_defaults();
        let mut meta = Metadata::new();
        meta.insert("technology".into(), json!("WordPress"));
        let asset = Asset::new("http_service", "https://a.example.com", "httpx").with_metadata(meta);
        let matches = engine.get_next_tools(&asset);
        assert!(matches.iter().any(|m| m.target_tool == "wpscan"));
    }

    #[test]
    fn plain_http_service_does_not_match_wpscan() {
        let engine = RulesEngine::with_defaults();
        let asset = Asset::new("http_service", "https://a.example.com", "httpx");
        let matches = engine.get_next_tools(&asset);
        assert!(!matches.iter().any(|m| m.target_tool == "wpscan"));
    }

    #[test]
    fn ip_asset_prefers_nmap_over_rustscan() {
        let engine = RulesEngine::with_defaults();
        let asset = Asset::new("ip", "10.0.0.1", "dnsx");
        let matches = engine.get_next_tools(&asset);
        assert_eq!(matches[0].target_tool, "nmap");
        assert_eq!(matches[1].target_tool, "rustscan");
    }

    #[test]
    fn custom_rule_can_be_added() {
        let mut engine = RulesEngine::new();
        engine.add_rule(ChainRule::new(
            "custom",
            Arc::new(|a: &Asset| a.kind == "port"),
            "nikto",
            "custom probe",
            5,
        ));
        let asset = Asset::new("port", "10.0.0.1:80", "nmap");
        assert_eq!(engine.get_next_tools(&asset).len(), 1);
    }
}
