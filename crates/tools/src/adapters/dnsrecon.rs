use recon_domain::Asset;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::contract::{ScanOptions, ToolAdapter, ToolCategory, ToolConfig, ToolResult};

pub struct DnsRecon {
    config: ToolConfig,
}

impl DnsRecon {
    pub fn new() -> Self {
        Self {
            config: ToolConfig::new("dnsrecon", "dnsrecon", ToolCategory::Dns, "DNS enumeration and zone transfer checks")
                .consumes(&["domain"])
                .produces(&["ip", "dns_record"]),
        }
    }
}

#[derive(Deserialize)]
struct Record {
    #[serde(rename = "type")]
    record_type: Option<String>,
    address: Option<String>,
    target: Option<String>,
    name: Option<String>,
}

fn record_to_asset(tool_name: &str, rec: &Record) -> Option<Asset> {
    let record_type = rec.record_type.as_deref()?.to_ascii_uppercase();
    let value = rec.address.clone().or_else(|| rec.target.clone()).or_else(|| rec.name.clone())?;
    match record_type.as_str() {
        "A" | "AAAA" => Some(Asset::new("ip", value, tool_name)),
        "CNAME" | "NS" | "MX" => Some(Asset::new("dns_record", value, tool_name)),
        _ => None,
    }
}

fn parse(tool_name: &str, output: &str) -> ToolResult {
    let mut assets = Vec::new();
    let mut any_json = false;

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Ok(value) = serde_json::from_str::<Value>(line) {
            any_json = true;
            let records: Vec<Record> = match value {
                Value::Array(_) => serde_json::from_value(value).unwrap_or_default(),
                Value::Object(_) => serde_json::from_value(value).map(|r| vec![r]).unwrap_or_default(),
                _ => Vec::new(),
            };
            for rec in &records {
                if let Some(asset) = record_to_asset(tool_name, rec) {
                    assets.push(asset);
                }
            }
        }
    }

    if !any_json {
        // Fall back to scanning the raw text for bare IPv4 addresses.
        let ip_re = Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").unwrap();
        for m in ip_re.find_iter(output) {
            let ip = m.as_str();
            if ip == "127.0.0.1" || ip == "0.0.0.0" {
                continue;
            }
            assets.push(Asset::new("ip", ip, tool_name));
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

impl ToolAdapter for DnsRecon {
    fn config(&self) -> &ToolConfig {
        &self.config
    }

    fn build_command(&self, target: &str, _opts: &ScanOptions) -> Vec<String> {
        vec!["dnsrecon".into(), "-d".into(), target.into(), "-j".into(), "-".into()]
    }

    fn parse_output(&self, output: &str) -> ToolResult {
        parse(&self.config.name, output)
    }

    fn parse_partial(&self, accumulated: &str) -> ToolResult {
        parse(&self.config.name, accumulated)
    }
}
