//! Concrete adapters, one module per wrapped binary. See `SPEC_FULL.md`
//! §4.1.1 for the parsing contract each one implements.

mod amass;
mod assetfinder;
mod dnsrecon;
mod dnsx;
mod httpx;
mod masscan;
mod nikto;
mod nmap;
mod nuclei;
mod rustscan;
mod subfinder;
mod wafw00f;
mod whatweb;
mod whois;
mod wpscan;

use std::sync::Arc;

use crate::contract::ToolAdapter;

/// All fifteen built-in adapters, in the order a fresh registry registers
/// them.
pub fn default_adapters() -> Vec<Arc<dyn ToolAdapter>> {
    vec![
        Arc::new(subfinder::Subfinder::new()),
        Arc::new(amass::Amass::new()),
        Arc::new(assetfinder::AssetFinder::new()),
        Arc::new(dnsx::Dnsx::new()),
        Arc::new(dnsrecon::DnsRecon::new()),
        Arc::new(whois::Whois::new()),
        Arc::new(httpx::Httpx::new()),
        Arc::new(nmap::Nmap::new()),
        Arc::new(masscan::Masscan::new()),
        Arc::new(rustscan::RustScan::new()),
        Arc::new(whatweb::WhatWeb::new()),
        Arc::new(wafw00f::Wafw00f::new()),
        Arc::new(nuclei::Nuclei::new()),
        Arc::new(nikto::Nikto::new()),
        Arc::new(wpscan::WpScan::new()),
    ]
}

/// Shared parse for tools that emit one bare subdomain per line
/// (subfinder, amass, assetfinder): every non-empty line containing a `.`
/// is a discovered subdomain. Every line is already a complete record, so
/// `parse_partial` can delegate straight to this.
fn parse_subdomain_lines(tool_name: &str, output: &str) -> crate::contract::ToolResult {
    use recon_domain::Asset;

    let assets: Vec<Asset> = output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && line.contains('.'))
        .map(|line| Asset::new("subdomain", line, tool_name))
        .collect();

    crate::contract::ToolResult {
        tool_name: tool_name.to_string(),
        success: true,
        raw_output: output.to_string(),
        assets,
        ..Default::default()
    }
}
