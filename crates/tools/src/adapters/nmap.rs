use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use recon_domain::{Asset, Finding, Metadata, Severity};
use serde_json::json;

use crate::contract::{ScanOptions, ToolAdapter, ToolCategory, ToolConfig, ToolResult};

pub struct Nmap {
    config: ToolConfig,
}

impl Nmap {
    pub fn new() -> Self {
        Self {
            config: ToolConfig::new("nmap", "nmap", ToolCategory::PortScan, "network port and service scanner")
                .consumes(&["ip"])
                .produces(&["port"]),
        }
    }
}

const INSECURE_SERVICES: &[&str] = &["telnet", "ftp", "smtp"];

fn db_port_finding(port: u32) -> Option<(&'static str, Vec<&'static str>)> {
    match port {
        3306 => Some(("MySQL", vec!["Restrict access to trusted hosts", "Require strong authentication"])),
        5432 => Some(("PostgreSQL", vec!["Restrict access to trusted hosts", "Require strong authentication"])),
        27017 => Some(("MongoDB", vec!["Enable authentication", "Bind to localhost or a private network only"])),
        6379 => Some(("Redis", vec!["Enable authentication", "Bind to localhost or a private network only"])),
        1433 => Some(("MSSQL", vec!["Restrict access to trusted hosts", "Require strong authentication"])),
        _ => None,
    }
}

fn attr_value(tag: &BytesStart, key: &str) -> Option<String> {
    tag.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key.as_bytes())
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

#[derive(Default)]
struct PortRecord {
    port_id: Option<String>,
    protocol: Option<String>,
    open: bool,
    service: Option<String>,
    product: Option<String>,
    version: Option<String>,
}

fn parse(tool_name: &str, output: &str) -> ToolResult {
    let mut reader = Reader::from_str(output);
    reader.config_mut().trim_text(true);

    let mut assets = Vec::new();
    let mut findings = Vec::new();

    let mut host_addr: Option<String> = None;
    let mut in_ports = false;
    let mut current: Option<PortRecord> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(Event::Start(tag)) | Ok(Event::Empty(tag)) => {
                match tag.name().as_ref() {
                    b"address" => {
                        if attr_value(&tag, "addrtype").as_deref() != Some("mac") {
                            if let Some(addr) = attr_value(&tag, "addr") {
                                host_addr = Some(addr);
                            }
                        }
                    }
                    b"ports" => in_ports = true,
                    b"port" if in_ports => {
                        current = Some(PortRecord {
                            port_id: attr_value(&tag, "portid"),
                            protocol: attr_value(&tag, "protocol"),
                            ..Default::default()
                        });
                    }
                    b"state" => {
                        if let Some(rec) = current.as_mut() {
                            rec.open = attr_value(&tag, "state").as_deref() == Some("open");
                        }
                    }
                    b"service" => {
                        if let Some(rec) = current.as_mut() {
                            rec.service = attr_value(&tag, "name");
                            rec.product = attr_value(&tag, "product");
                            rec.version = attr_value(&tag, "version");
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(tag)) => match tag.name().as_ref() {
                b"ports" => in_ports = false,
                b"port" => {
                    if let (Some(host), Some(rec)) = (host_addr.clone(), current.take()) {
                        if rec.open {
                            let port_num: u32 = rec.port_id.as_deref().unwrap_or("0").parse().unwrap_or(0);
                            let mut meta = Metadata::new();
                            meta.insert("port".into(), json!(port_num));
                            meta.insert("protocol".into(), json!(rec.protocol.clone().unwrap_or_default()));
                            meta.insert("service".into(), json!(rec.service.clone().unwrap_or_default()));
                            meta.insert("product".into(), json!(rec.product.clone().unwrap_or_default()));
                            meta.insert("version".into(), json!(rec.version.clone().unwrap_or_default()));

                            assets.push(
                                Asset::new("port", format!("{host}:{port_num}"), tool_name).with_metadata(meta),
                            );

                            if let Some(service) = &rec.service {
                                let service_lower = service.to_ascii_lowercase();
                                if INSECURE_SERVICES.iter().any(|s| *s == service_lower) {
                                    findings.push(Finding::new(
                                        Severity::Medium,
                                        format!("Insecure service: {service}"),
                                        host.clone(),
                                        format!("{service} transmits data in cleartext on port {port_num}"),
                                        tool_name,
                                    ));
                                }
                            }

                            if let Some((db_name, recs)) = db_port_finding(port_num) {
                                let mut finding = Finding::new(
                                    Severity::High,
                                    format!("Exposed database port: {db_name}"),
                                    host.clone(),
                                    format!("{db_name} port {port_num} is reachable"),
                                    tool_name,
                                );
                                finding.recommendations = recs.into_iter().map(str::to_string).collect();
                                findings.push(finding);
                            }
                        }
                    }
                }
                b"host" => host_addr = None,
                _ => {}
            },
            Ok(_) => {}
            Err(_) => {
                // Malformed XML: treat as a parse failure rather than panicking.
                return ToolResult::failure(tool_name, "malformed nmap XML output");
            }
        }
    }

    ToolResult {
        tool_name: tool_name.to_string(),
        success: true,
        raw_output: output.to_string(),
        assets,
        findings,
        ..Default::default()
    }
}

impl ToolAdapter for Nmap {
    fn config(&self) -> &ToolConfig {
        &self.config
    }

    fn build_command(&self, target: &str, _opts: &ScanOptions) -> Vec<String> {
        vec!["nmap".into(), "-sV".into(), "-oX".into(), "-".into(), target.into()]
    }

    fn parse_output(&self, output: &str) -> ToolResult {
        parse(&self.config.name, output)
    }

    // nmap's XML is only valid once the document is complete; the default
    // `parse_partial` (no discoveries until the final parse) is correct.
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<nmaprun>
  <host>
    <address addr="10.0.0.5" addrtype="ipv4"/>
    <ports>
      <port protocol="tcp" portid="22">
        <state state="open"/>
        <service name="ssh" product="OpenSSH" version="8.2"/>
      </port>
      <port protocol="tcp" portid="23">
        <state state="closed"/>
        <service name="telnet"/>
      </port>
      <port protocol="tcp" portid="3306">
        <state state="open"/>
        <service name="mysql" product="MySQL" version="8.0"/>
      </port>
    </ports>
  </host>
</nmaprun>"#;

    #[test]
    fn only_open_ports_become_assets() {
        let adapter = Nmap::new();
        let result = adapter.parse_output(SAMPLE);
        assert_eq!(result.assets.len(), 2);
        assert!(result.assets.iter().any(|a| a.value == "10.0.0.5:22"));
        assert!(result.assets.iter().any(|a| a.value == "10.0.0.5:3306"));
    }

    #[test]
    fn exposed_database_port_yields_high_finding() {
        let adapter = Nmap::new();
        let result = adapter.parse_output(SAMPLE);
        let db_finding = result.findings.iter().find(|f| f.title.contains("MySQL")).unwrap();
        assert_eq!(db_finding.severity, Severity::High);
        assert!(!db_finding.recommendations.is_empty());
    }

    #[test]
    fn malformed_xml_is_a_parse_failure_not_a_panic() {
        let adapter = Nmap::new();
        let result = adapter.parse_output("<nmaprun><host></foo></nmaprun>");
        assert!(!result.success);
    }
}
