//! Asset and finding priority scoring. See `SPEC_FULL.md` §4.4.

use std::sync::Arc;

use recon_domain::{Asset, Finding, Severity};

pub type AssetPredicate = Arc<dyn Fn(&Asset) -> bool + Send + Sync>;
pub type FindingPredicate = Arc<dyn Fn(&Finding) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct AssetScoringRule {
    pub name: String,
    pub condition: AssetPredicate,
    pub score_modifier: f64,
    pub reason: String,
}

#[derive(Clone)]
pub struct FindingScoringRule {
    pub name: String,
    pub condition: FindingPredicate,
    pub score_modifier: f64,
    pub reason: String,
}

const ASSET_BASE_SCORE: f64 = 10.0;
const MAX_SCORE: f64 = 100.0;

pub struct ScoringEngine {
    asset_rules: Vec<AssetScoringRule>,
    finding_rules: Vec<FindingScoringRule>,
}

fn value_contains_any(value: &str, needles: &[&str]) -> bool {
    let lower = value.to_ascii_lowercase();
    needles.iter().any(|n| lower.contains(n))
}

impl ScoringEngine {
    pub fn new() -> Self {
        Self {
            asset_rules: Vec::new(),
            finding_rules: Vec::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut engine = Self::new();
        engine.init_default_rules();
        engine
    }

    fn init_default_rules(&mut self) {
        self.asset_rules = vec![
            AssetScoringRule {
                name: "admin_panel".into(),
                condition: Arc::new(|a: &Asset| value_contains_any(&a.value, &["admin", "login", "portal", "dashboard"])),
                score_modifier: 50.0,
                reason: "Admin panel detected".into(),
            },
            AssetScoringRule {
                name: "dev_environment".into(),
                condition: Arc::new(|a: &Asset| value_contains_any(&a.value, &["dev", "staging", "test", "debug"])),
                score_modifier: 30.0,
                reason: "Development environment".into(),
            },
            AssetScoringRule {
                name: "database_port".into(),
                condition: Arc::new(|a: &Asset| {
                    a.kind == "port" && value_contains_any(&a.value, &["3306", "5432", "27017", "6379", "1433"])
                }),
                score_modifier: 40.0,
                reason: "Database port exposed".into(),
            },
            AssetScoringRule {
                name: "sensitive_file".into(),
                condition: Arc::new(|a: &Asset| {
                    value_contains_any(&a.value, &[".git", ".env", "config", "backup", ".sql", ".db"])
                }),
                score_modifier: 35.0,
                reason: "Sensitive file detected".into(),
            },
            AssetScoringRule {
                name: "api_endpoint".into(),
                condition: Arc::new(|a: &Asset| value_contains_any(&a.value, &["/api/", "/v1/", "/v2/", "graphql"])),
                score_modifier: 25.0,
                reason: "API endpoint".into(),
            },
        ];

        let severity_scores = [
            (Severity::Critical, 100.0),
            (Severity::High, 75.0),
            (Severity::Medium, 50.0),
            (Severity::Low, 25.0),
            (Severity::Info, 10.0),
        ];

        self.finding_rules = severity_scores
            .iter()
            .map(|&(sev, score)| FindingScoringRule {
                name: format!("severity_{sev:?}").to_ascii_lowercase(),
                condition: Arc::new(move |f: &Finding| f.severity == sev),
                score_modifier: score,
                reason: format!("{sev:?} severity"),
            })
            .collect();
    }

    pub fn score_asset(&self, asset: &Asset) -> f64 {
        let mut total = ASSET_BASE_SCORE;
        for rule in &self.asset_rules {
            if (rule.condition)(asset) {
                total += rule.score_modifier;
            }
        }
        total.min(MAX_SCORE)
    }

    pub fn score_finding(&self, finding: &Finding) -> f64 {
        let mut total = 0.0;
        for rule in &self.finding_rules {
            if (rule.condition)(finding) {
                total += rule.score_modifier;
            }
        }
        total.min(MAX_SCORE)
    }

    pub fn add_asset_rule(&mut self, rule: AssetScoringRule) {
        self.asset_rules.push(rule);
    }

    pub fn add_finding_rule(&mut self, rule: FindingScoringRule) {
        self.finding_rules.push(rule);
    }
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_panel_asset_scores_above_base() {
        let engine = ScoringEngine::with_defaults();
        let asset = Asset::new("http_service", "https://a.example.com/admin", "httpx");
        assert_eq!(engine.score_asset(&asset), 60.0);
    }

    #[test]
    fn database_port_requires_port_type() {
        let engine = ScoringEngine::with_defaults();
        let port_asset = Asset::new("port", "10.0.0.1:3306", "nmap");
        assert_eq!(engine.score_asset(&port_asset), 50.0);

        let subdomain_asset = Asset::new("subdomain", "3306.example.com", "subfinder");
        assert_eq!(engine.score_asset(&subdomain_asset), 10.0);
    }

    #[test]
    fn score_clamps_at_one_hundred() {
        let engine = ScoringEngine::with_defaults();
        let asset = Asset::new("port", "admin-dev-staging-backup.example.com:3306", "nmap");
        assert_eq!(engine.score_asset(&asset), 100.0);
    }

    #[test]
    fn finding_score_is_severity_lookup() {
        let engine = ScoringEngine::with_defaults();
        let critical = Finding::new(Severity::Critical, "t", "h", "d", "nuclei");
        let info = Finding::new(Severity::Info, "t", "h", "d", "nuclei");
        assert_eq!(engine.score_finding(&critical), 100.0);
        assert_eq!(engine.score_finding(&info), 10.0);
    }

    #[test]
    fn scoring_is_deterministic() {
        let engine = ScoringEngine::with_defaults();
        let asset = Asset::new("http_service", "https://a.example.com/api/v1/login", "httpx");
        let first = engine.score_asset(&asset);
        let second = engine.score_asset(&asset);
        assert_eq!(first, second);
    }
}
