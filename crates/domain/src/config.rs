use serde::{Deserialize, Serialize};

/// How the orchestrator decides whether a discovered asset triggers follow-up
/// tasks. Only `Auto` auto-chains; `Interactive` is reserved for a future
/// approval hook and behaves identically to `Passive` for core purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    Auto,
    Interactive,
    Passive,
}

impl Default for ScanMode {
    fn default() -> Self {
        ScanMode::Auto
    }
}

fn default_max_parallel() -> usize {
    3
}

fn default_timeout() -> u64 {
    300
}

/// The in-memory configuration of a single scan. Constructed by a caller
/// (the CLI entry point, or an embedder) — no file serialization lives here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    pub target: String,
    #[serde(default)]
    pub mode: ScanMode,
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
    #[serde(default)]
    pub passive_only: bool,
    #[serde(default)]
    pub stealth: bool,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl ScanConfig {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            mode: ScanMode::default(),
            scope: Vec::new(),
            exclude: Vec::new(),
            max_parallel: default_max_parallel(),
            passive_only: false,
            stealth: false,
            timeout: default_timeout(),
        }
    }

    /// `max_parallel` is clamped to at least 1 — a scan with a cap of zero
    /// would never dispatch anything.
    pub fn clamped_max_parallel(&self) -> usize {
        self.max_parallel.max(1)
    }
}

fn default_store_path() -> String {
    "recon.sqlite3".to_string()
}

fn default_log_filter() -> String {
    "info".to_string()
}

/// Ambient settings needed to boot the process: where the session store lives
/// and what the default `tracing` filter directive is. `#[serde(default)]`
/// lets a caller deserialize a partial blob; this crate never reads one from
/// disk itself (see `SPEC_FULL.md` §4.10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_store_path")]
    pub store_path: String,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            log_filter: default_log_filter(),
        }
    }
}
