//! The tool adapter contract: every external reconnaissance binary is
//! wrapped behind this trait. Availability, command construction, and
//! parsing are pure/sync and adapter-specific; streaming execution is
//! shared machinery in [`crate::engine`].

use std::collections::HashMap;

use recon_domain::{Asset, Finding};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolCategory {
    Dns,
    Subdomain,
    PortScan,
    WebProbe,
    Vulnerability,
    Osint,
    Technology,
    Fuzzing,
}

/// Immutable descriptor for one adapter.
#[derive(Debug, Clone)]
pub struct ToolConfig {
    pub name: String,
    pub binary: String,
    pub category: ToolCategory,
    pub description: String,
    pub timeout_secs: u64,
    pub requires_root: bool,
    pub produces: Vec<String>,
    pub consumes: Vec<String>,
}

impl ToolConfig {
    pub fn new(
        name: impl Into<String>,
        binary: impl Into<String>,
        category: ToolCategory,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            binary: binary.into(),
            category,
            description: description.into(),
            timeout_secs: 300,
            requires_root: false,
            produces: Vec::new(),
            consumes: Vec::new(),
        }
    }

    pub fn produces(mut self, types: &[&str]) -> Self {
        self.produces = types.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn consumes(mut self, types: &[&str]) -> Self {
        self.consumes = types.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn requires_root(mut self) -> Self {
        self.requires_root = true;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// What a single parse (partial or final) yielded.
#[derive(Debug, Clone, Default)]
pub struct ToolResult {
    pub tool_name: String,
    pub success: bool,
    pub assets: Vec<Asset>,
    pub findings: Vec<Finding>,
    pub raw_output: String,
    pub error: Option<String>,
    pub metadata: HashMap<String, Value>,
}

impl ToolResult {
    pub fn empty_failure(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: false,
            ..Default::default()
        }
    }

    pub fn failure(tool_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn has_discoveries(&self) -> bool {
        !self.assets.is_empty() || !self.findings.is_empty()
    }
}

/// Per-scan options passed through to adapters. `scope`/`exclude` are
/// reserved hook points — the core does not enforce them, adapters may
/// read them out of `metadata` if they choose to.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub scope: Vec<String>,
    pub exclude: Vec<String>,
    pub stealth: bool,
    pub passive_only: bool,
}

/// The abstract interface every concrete adapter implements. Availability,
/// command-building, and parsing are synchronous and deterministic; the
/// shared streaming engine in [`crate::engine`] drives them against a real
/// child process.
pub trait ToolAdapter: Send + Sync {
    fn config(&self) -> &ToolConfig;

    /// True iff `config().binary` resolves on the process search path.
    fn is_available(&self) -> bool {
        which::which(&self.config().binary).is_ok()
    }

    /// Deterministic; pure function of `target` and `opts`.
    fn build_command(&self, target: &str, opts: &ScanOptions) -> Vec<String>;

    /// Parse the full, completed stdout into a final result.
    fn parse_output(&self, output: &str) -> ToolResult;

    /// Best-effort parse over a growing prefix of stdout. Adapters whose
    /// tool emits complete newline-delimited records override this;
    /// adapters whose tool only emits one blob at the end (whois, nmap,
    /// wpscan) keep the default, which never reports discoveries early.
    fn parse_partial(&self, _accumulated: &str) -> ToolResult {
        ToolResult::empty_failure(self.config().name.clone())
    }
}
