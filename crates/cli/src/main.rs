//! `reconctl` — a minimal runnable entry point for the orchestration
//! engine. Accepts a target plus a handful of scan options, builds a
//! `ScanConfig` directly from parsed args (no config-file I/O — that is
//! an external collaborator's job per `SPEC_FULL.md` §1/§4.10), runs one
//! scan to completion, persists it, and prints a one-line summary.
//!
//! Grounded on this codebase's `gateway/src/main.rs` startup sequencing
//! style (ordered, `tracing::info!`-narrated component construction) and
//! its `clap`-derive `Cli` usage, scaled down to the single-command
//! surface §4.12 calls for.

use std::sync::Arc;

use clap::{Parser, ValueEnum};
use recon_core::{EventBus, Orchestrator};
use recon_domain::{Config, EventType, ScanConfig, ScanMode};
use recon_store::SessionStore;
use recon_tools::ToolRegistry;
use tracing_subscriber::EnvFilter;

/// Run one reconnaissance scan against a target.
#[derive(Debug, Parser)]
#[command(name = "reconctl", version, about = "Bounded-concurrency recon orchestration engine")]
struct Cli {
    /// Target to scan: a domain, an IPv4 address, or a URL.
    target: String,

    /// Whether discovered assets automatically chain to follow-up tools.
    #[arg(long, value_enum, default_value_t = CliScanMode::Auto)]
    mode: CliScanMode,

    /// Maximum number of tasks running concurrently.
    #[arg(long, default_value_t = 3)]
    max_parallel: usize,

    /// Default per-adapter timeout, in seconds.
    #[arg(long, default_value_t = 300)]
    timeout: u64,

    /// Path to the sqlite session store.
    #[arg(long, default_value = "recon.sqlite3")]
    store: String,

    /// Only run adapters that do not touch the network directly (passed
    /// through to adapters as a metadata hint; not enforced by the core).
    #[arg(long)]
    passive_only: bool,

    /// Ask adapters to prefer low-noise scan options.
    #[arg(long)]
    stealth: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
enum CliScanMode {
    Auto,
    Interactive,
    Passive,
}

impl std::fmt::Display for CliScanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliScanMode::Auto => write!(f, "auto"),
            CliScanMode::Interactive => write!(f, "interactive"),
            CliScanMode::Passive => write!(f, "passive"),
        }
    }
}

impl From<CliScanMode> for ScanMode {
    fn from(mode: CliScanMode) -> Self {
        match mode {
            CliScanMode::Auto => ScanMode::Auto,
            CliScanMode::Interactive => ScanMode::Interactive,
            CliScanMode::Passive => ScanMode::Passive,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = Config {
        store_path: cli.store.clone(),
        ..Config::default()
    };

    let scan_config = ScanConfig {
        target: cli.target.clone(),
        mode: cli.mode.into(),
        scope: Vec::new(),
        exclude: Vec::new(),
        max_parallel: cli.max_parallel,
        passive_only: cli.passive_only,
        stealth: cli.stealth,
        timeout: cli.timeout,
    };

    tracing::info!(target = %scan_config.target, mode = ?scan_config.mode, "reconctl starting");

    let registry = Arc::new(ToolRegistry::with_defaults());
    let event_bus = Arc::new(EventBus::new());
    attach_log_subscriber(&event_bus);

    let orchestrator = Orchestrator::new(scan_config, registry, event_bus);
    let session = orchestrator.run().await;

    let mut store = SessionStore::open(&config.store_path)?;
    if let Err(e) = store.save_session(&session) {
        tracing::error!(error = %e, "failed to persist session");
        return Err(e.into());
    }

    println!(
        "scan of {} complete: {} assets, {} findings ({} critical, {} high)",
        session.target,
        session.assets.len(),
        session.findings.len(),
        session.critical_count(),
        session.high_count(),
    );

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

/// Every task/scan lifecycle event is echoed through `tracing` at info
/// level, giving a line-oriented progress feed without any UI dependency.
fn attach_log_subscriber(bus: &Arc<EventBus>) {
    for event_type in [
        EventType::ScanStarted,
        EventType::ScanCompleted,
        EventType::TaskStarted,
        EventType::TaskCompleted,
        EventType::TaskFailed,
        EventType::AssetDiscovered,
        EventType::FindingDiscovered,
    ] {
        bus.subscribe(
            event_type,
            Arc::new(|event: &recon_domain::Event| {
                tracing::info!(event_type = ?event.event_type, source = %event.source, data = ?event.data, "event");
            }),
        );
    }
}
