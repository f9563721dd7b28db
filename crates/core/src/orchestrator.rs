//! The scheduler. Drives the scan plan against the tool registry, chains
//! follow-up tasks via the rules engine, scores discoveries, and publishes
//! every state transition onto the event bus. See `SPEC_FULL.md` §4.6.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::StreamExt;
use recon_domain::{Asset, Event, EventType, Finding, Metadata, ScanConfig, ScanMode, ScanSession, Task};
use recon_rules::RulesEngine;
use recon_scoring::ScoringEngine;
use recon_tools::{ScanOptions, ToolRegistry};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::events::EventBus;
use crate::plan::ScanPlan;

const QUANTUM: Duration = Duration::from_secs(1);

enum WorkerMsg {
    Asset(Asset),
    Finding(Finding),
    Progress(Uuid, f64),
    Done(Uuid),
    Failed(Uuid, String),
}

/// Cloneable flags a caller can use to pause/resume/stop a scan that is
/// running on another tokio task.
#[derive(Clone)]
pub struct OrchestratorHandle {
    paused: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
}

impl OrchestratorHandle {
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

pub struct Orchestrator {
    config: ScanConfig,
    registry: Arc<ToolRegistry>,
    rules: RulesEngine,
    scoring: ScoringEngine,
    event_bus: Arc<EventBus>,
    plan: ScanPlan,
    session: ScanSession,
    seen_assets: HashSet<(String, String)>,
    paused: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
}

impl Orchestrator {
    pub fn new(config: ScanConfig, registry: Arc<ToolRegistry>, event_bus: Arc<EventBus>) -> Self {
        let session = ScanSession::new(config.target.clone());
        Self {
            config,
            registry,
            rules: RulesEngine::with_defaults(),
            scoring: ScoringEngine::with_defaults(),
            event_bus,
            plan: ScanPlan::new(),
            session,
            seen_assets: HashSet::new(),
            paused: Arc::new(AtomicBool::new(false)),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn handle(&self) -> OrchestratorHandle {
        OrchestratorHandle {
            paused: self.paused.clone(),
            stopped: self.stopped.clone(),
        }
    }

    pub fn session(&self) -> &ScanSession {
        &self.session
    }

    /// Run the scan to completion (or until stopped) and return the final
    /// session. Consumes `self`: a scan runs once.
    pub async fn run(mut self) -> ScanSession {
        let span = info_span!("scan", session_id = %self.session.id, target = %self.config.target);
        async {
            self.start().await;
            self.orchestration_loop().await;
            self.session.completed_at = Some(Utc::now());
            info!(
                assets = self.session.assets.len(),
                findings = self.session.findings.len(),
                "scan completed"
            );
            self.event_bus
                .publish(Event::new(
                    EventType::ScanCompleted,
                    "orchestrator",
                    metadata([
                        ("session_id", json!(self.session.id)),
                        ("assets", json!(self.session.assets.len())),
                        ("findings", json!(self.session.findings.len())),
                    ]),
                ))
                .await;
            self.session
        }
        .instrument(span)
        .await
    }

    async fn start(&mut self) {
        info!("scan started");
        self.event_bus
            .publish(Event::new(
                EventType::ScanStarted,
                "orchestrator",
                metadata([
                    ("target", json!(self.config.target)),
                    ("session_id", json!(self.session.id)),
                ]),
            ))
            .await;

        let initial = self.create_initial_task();
        self.session.tasks.push(initial.clone());
        self.plan.add_task(initial, false);
    }

    fn create_initial_task(&self) -> Task {
        let target = &self.config.target;
        let (tool_name, description) = if is_url(target) {
            ("httpx".to_string(), format!("Probe HTTP service: {target}"))
        } else if is_ipv4(target) {
            ("nmap".to_string(), format!("Port scan: {target}"))
        } else {
            ("subfinder".to_string(), format!("Find subdomains for: {target}"))
        };

        let mut meta = Metadata::new();
        meta.insert("target".into(), json!(target));
        Task::new(tool_name, description, meta)
    }

    async fn orchestration_loop(&mut self) {
        let (tx, mut rx) = mpsc::unbounded_channel::<WorkerMsg>();

        loop {
            if self.stopped.load(Ordering::SeqCst) {
                break;
            }
            if self.paused.load(Ordering::SeqCst) {
                tokio::time::sleep(QUANTUM).await;
                continue;
            }
            if self.plan.running.len() < self.config.clamped_max_parallel() {
                if let Some(task) = self.plan.pop_next() {
                    self.dispatch_task(task, tx.clone()).await;
                    continue;
                }
            }
            if self.plan.pending.is_empty() && self.plan.running.is_empty() {
                break;
            }
            tokio::select! {
                msg = rx.recv() => {
                    if let Some(msg) = msg {
                        self.handle_worker_msg(msg).await;
                    }
                }
                _ = tokio::time::sleep(QUANTUM) => {}
            }
        }
    }

    async fn dispatch_task(&mut self, task: Task, tx: mpsc::UnboundedSender<WorkerMsg>) {
        let tool_name = task.name.clone();
        let target = task.target().map(str::to_string).unwrap_or_else(|| self.config.target.clone());

        let adapter = match self.registry.get(&tool_name) {
            Some(a) if a.is_available() => a,
            Some(_) => {
                debug!(tool = %tool_name, "tool not available");
                self.plan.fail_direct(task, format!("tool not available: {tool_name}"));
                return;
            }
            None => {
                debug!(tool = %tool_name, "tool not found");
                self.plan.fail_direct(task, format!("tool not found: {tool_name}"));
                return;
            }
        };

        let task_id = task.id;
        info!(task_id = %task_id, tool = %tool_name, status = "running", "task started");
        self.plan.mark_running(task);
        self.event_bus
            .publish(Event::new(
                EventType::TaskStarted,
                "orchestrator",
                metadata([("task_id", json!(task_id)), ("name", json!(tool_name))]),
            ))
            .await;

        let opts = ScanOptions {
            scope: self.config.scope.clone(),
            exclude: self.config.exclude.clone(),
            stealth: self.config.stealth,
            passive_only: self.config.passive_only,
        };

        tokio::spawn(
            async move {
                let mut stream = recon_tools::execute(adapter, target, opts);
                let mut failure: Option<String> = None;
                let mut any_success = false;

                while let Some(result) = stream.next().await {
                    if result.success {
                        let first_yield = !any_success;
                        any_success = true;
                        for asset in result.assets {
                            let _ = tx.send(WorkerMsg::Asset(asset));
                        }
                        for finding in result.findings {
                            let _ = tx.send(WorkerMsg::Finding(finding));
                        }
                        // The 50.0 default only applies on the first yield;
                        // later yields that omit `metadata.progress` must not
                        // reset progress, since it is monotone non-decreasing.
                        if let Some(progress) = result.metadata.get("progress").and_then(|v| v.as_f64()) {
                            let _ = tx.send(WorkerMsg::Progress(task_id, progress));
                        } else if first_yield {
                            let _ = tx.send(WorkerMsg::Progress(task_id, 50.0));
                        }
                    } else {
                        failure = Some(result.error.unwrap_or_else(|| "tool reported failure".into()));
                    }
                }

                // A failing final parse only fails the task if no partial
                // result was ever successfully ingested; otherwise the task
                // completes with whatever partial data it gathered.
                match failure {
                    Some(err) if !any_success => {
                        let _ = tx.send(WorkerMsg::Failed(task_id, err));
                    }
                    _ => {
                        let _ = tx.send(WorkerMsg::Done(task_id));
                    }
                }
            }
            .instrument(info_span!("task_exec", %task_id, tool = %tool_name)),
        );
    }

    async fn handle_worker_msg(&mut self, msg: WorkerMsg) {
        match msg {
            WorkerMsg::Asset(asset) => self.ingest_asset(asset).await,
            WorkerMsg::Finding(finding) => self.ingest_finding(finding).await,
            WorkerMsg::Progress(task_id, progress) => {
                // Progress is monotone non-decreasing while RUNNING (§3):
                // never let a late, lower report walk it backwards.
                if let Some(task) = self.plan.running.iter_mut().find(|t| t.id == task_id) {
                    task.progress = task.progress.max(progress);
                }
                self.event_bus
                    .publish(Event::new(
                        EventType::TaskProgress,
                        "orchestrator",
                        metadata([("task_id", json!(task_id)), ("progress", json!(progress))]),
                    ))
                    .await;
            }
            WorkerMsg::Done(task_id) => {
                debug!(task_id = %task_id, status = "completed", "task completed");
                self.plan.mark_completed(task_id);
                self.event_bus
                    .publish(Event::new(
                        EventType::TaskCompleted,
                        "orchestrator",
                        metadata([("task_id", json!(task_id))]),
                    ))
                    .await;
            }
            WorkerMsg::Failed(task_id, error) => {
                debug!(task_id = %task_id, status = "failed", error = %error, "task failed");
                self.plan.mark_failed(task_id, error.clone());
                self.event_bus
                    .publish(Event::new(
                        EventType::TaskFailed,
                        "orchestrator",
                        metadata([("task_id", json!(task_id)), ("error", json!(error))]),
                    ))
                    .await;
            }
        }
    }

    async fn ingest_asset(&mut self, mut asset: Asset) {
        let key = asset.dedup_key();
        if self.seen_assets.contains(&key) {
            return;
        }
        self.seen_assets.insert(key);

        asset.score = self.scoring.score_asset(&asset);
        self.session.assets.push(asset.clone());
        self.event_bus
            .publish(Event::new(
                EventType::AssetDiscovered,
                "orchestrator",
                metadata([
                    ("asset_id", json!(asset.id)),
                    ("type", json!(asset.kind)),
                    ("value", json!(asset.value)),
                ]),
            ))
            .await;

        if !matches!(self.config.mode, ScanMode::Auto) {
            return;
        }

        for m in self.rules.get_next_tools(&asset) {
            let Some(adapter) = self.registry.get(&m.target_tool) else {
                continue;
            };
            if !adapter.is_available() {
                continue;
            }

            let mut meta = Metadata::new();
            meta.insert("target".into(), json!(asset.value));
            meta.insert("asset_id".into(), json!(asset.id));
            let task = Task::new(m.target_tool.clone(), format!("{}: {}", m.reason, asset.value), meta);
            self.session.tasks.push(task.clone());
            self.plan.add_task(task, m.priority > 8);
        }
    }

    async fn ingest_finding(&mut self, finding: Finding) {
        self.event_bus
            .publish(Event::new(
                EventType::FindingDiscovered,
                "orchestrator",
                metadata([
                    ("finding_id", json!(finding.id)),
                    ("severity", json!(format!("{:?}", finding.severity).to_ascii_lowercase())),
                    ("title", json!(finding.title)),
                ]),
            ))
            .await;
        self.session.findings.push(finding);
    }
}

fn metadata<const N: usize>(pairs: [(&str, serde_json::Value); N]) -> Metadata {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

fn is_url(target: &str) -> bool {
    target.starts_with("http://") || target.starts_with("https://")
}

fn is_ipv4(target: &str) -> bool {
    target.parse::<std::net::Ipv4Addr>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use recon_domain::TaskStatus;
    use recon_tools::{ToolAdapter, ToolCategory, ToolConfig, ToolResult};

    struct StubEcho(ToolConfig);
    impl ToolAdapter for StubEcho {
        fn config(&self) -> &ToolConfig {
            &self.0
        }
        fn is_available(&self) -> bool {
            true
        }
        fn build_command(&self, target: &str, _o: &ScanOptions) -> Vec<String> {
            vec!["echo".into(), target.into()]
        }
        fn parse_output(&self, output: &str) -> ToolResult {
            ToolResult {
                tool_name: self.0.name.clone(),
                success: true,
                raw_output: output.to_string(),
                assets: vec![Asset::new("subdomain", output.trim(), &self.0.name)],
                ..Default::default()
            }
        }
    }

    #[test]
    fn classifies_initial_target_shape() {
        assert!(is_url("https://a.example.com"));
        assert!(!is_url("example.com"));
        assert!(is_ipv4("10.0.0.1"));
        assert!(!is_ipv4("example.com"));
    }

    #[tokio::test]
    async fn dedup_drops_repeat_assets_silently() {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(StubEcho(ToolConfig::new(
            "subfinder",
            "echo",
            ToolCategory::Subdomain,
            "stub",
        ))));
        let bus = Arc::new(EventBus::new());
        let mut orch = Orchestrator::new(ScanConfig::new("example.com"), registry, bus);

        for _ in 0..10 {
            orch.ingest_asset(Asset::new("subdomain", "a.example.com", "subfinder")).await;
        }
        assert_eq!(orch.session.assets.len(), 1);
    }

    #[tokio::test]
    async fn progress_never_walks_backwards() {
        let registry = Arc::new(ToolRegistry::new());
        let bus = Arc::new(EventBus::new());
        let mut orch = Orchestrator::new(ScanConfig::new("example.com"), registry, bus);

        let mut meta = Metadata::new();
        meta.insert("target".into(), json!("example.com"));
        let task = Task::new("subfinder", "probe", meta);
        let task_id = task.id;
        orch.plan.mark_running(task);

        orch.handle_worker_msg(WorkerMsg::Progress(task_id, 70.0)).await;
        orch.handle_worker_msg(WorkerMsg::Progress(task_id, 30.0)).await;

        let running = orch.plan.running.iter().find(|t| t.id == task_id).unwrap();
        assert_eq!(running.progress, 70.0);
    }

    #[tokio::test]
    async fn domain_initial_task_targets_subfinder() {
        let registry = Arc::new(ToolRegistry::new());
        let bus = Arc::new(EventBus::new());
        let orch = Orchestrator::new(ScanConfig::new("example.com"), registry, bus);
        let task = orch.create_initial_task();
        assert_eq!(task.name, "subfinder");
    }

    #[tokio::test]
    async fn ip_initial_task_targets_nmap() {
        let registry = Arc::new(ToolRegistry::new());
        let bus = Arc::new(EventBus::new());
        let orch = Orchestrator::new(ScanConfig::new("10.0.0.1"), registry, bus);
        let task = orch.create_initial_task();
        assert_eq!(task.name, "nmap");
    }

    #[tokio::test]
    async fn url_initial_task_targets_httpx() {
        let registry = Arc::new(ToolRegistry::new());
        let bus = Arc::new(EventBus::new());
        let orch = Orchestrator::new(ScanConfig::new("https://a.example.com"), registry, bus);
        let task = orch.create_initial_task();
        assert_eq!(task.name, "httpx");
    }

    #[tokio::test]
    async fn auto_mode_chains_follow_up_tasks_for_domain_asset() {
        let registry = Arc::new(ToolRegistry::new());
        for name in ["dnsrecon", "whois", "subfinder", "amass"] {
            registry.register(Arc::new(StubEcho(ToolConfig::new(name, "echo", ToolCategory::Dns, "stub"))));
        }
        let bus = Arc::new(EventBus::new());
        let mut orch = Orchestrator::new(ScanConfig::new("example.com"), registry, bus);
        orch.ingest_asset(Asset::new("domain", "example.com", "seed")).await;
        assert_eq!(orch.plan.pending.len(), 4);
    }

    #[tokio::test]
    async fn full_scan_against_stub_registry_terminates_and_records_asset() {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(StubEcho(ToolConfig::new(
            "subfinder",
            "echo",
            ToolCategory::Subdomain,
            "stub",
        ))));
        let bus = Arc::new(EventBus::new());
        let orch = Orchestrator::new(ScanConfig::new("example.com"), registry, bus);
        let session = tokio::time::timeout(Duration::from_secs(5), orch.run()).await.unwrap();
        assert!(session.completed_at.is_some());
        assert!(!session.assets.is_empty());
    }

    /// A tool that streams one good asset over stdout and then exits
    /// non-zero with a final parse that reports failure. Per §7, a failing
    /// final parse only fails the task when no partial result was ever
    /// ingested; here one was, so the task must still complete.
    struct PartialThenFail(ToolConfig);
    impl ToolAdapter for PartialThenFail {
        fn config(&self) -> &ToolConfig {
            &self.0
        }
        fn is_available(&self) -> bool {
            true
        }
        fn build_command(&self, _target: &str, _o: &ScanOptions) -> Vec<String> {
            vec!["sh".into(), "-c".into(), "echo a.example.com; exit 1".into()]
        }
        fn parse_partial(&self, accumulated: &str) -> ToolResult {
            if accumulated.contains("a.example.com") {
                ToolResult {
                    tool_name: self.0.name.clone(),
                    success: true,
                    assets: vec![Asset::new("subdomain", "a.example.com", &self.0.name)],
                    ..Default::default()
                }
            } else {
                ToolResult::empty_failure(self.0.name.clone())
            }
        }
        fn parse_output(&self, _output: &str) -> ToolResult {
            ToolResult::failure(self.0.name.clone(), "summary line missing")
        }
    }

    #[tokio::test]
    async fn task_completes_when_final_parse_fails_after_partial_success() {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(PartialThenFail(ToolConfig::new(
            "subfinder",
            "sh",
            ToolCategory::Subdomain,
            "stub",
        ))));
        let bus = Arc::new(EventBus::new());
        let orch = Orchestrator::new(ScanConfig::new("example.com"), registry, bus);
        let session = tokio::time::timeout(Duration::from_secs(5), orch.run()).await.unwrap();
        let initial = session.tasks.iter().find(|t| t.name == "subfinder").unwrap();
        assert_eq!(initial.status, TaskStatus::Completed);
        assert_eq!(session.assets.len(), 1);
    }

    /// Streams two partial successes: the first reports `progress: 70` in
    /// its metadata, the second omits `progress` entirely. The omitted
    /// value must not reset progress to the 50.0 first-yield default.
    struct ProgressThenOmitted(ToolConfig);
    impl ToolAdapter for ProgressThenOmitted {
        fn config(&self) -> &ToolConfig {
            &self.0
        }
        fn is_available(&self) -> bool {
            true
        }
        fn build_command(&self, _target: &str, _o: &ScanOptions) -> Vec<String> {
            vec!["sh".into(), "-c".into(), "echo one; echo two".into()]
        }
        fn parse_partial(&self, accumulated: &str) -> ToolResult {
            let lines: Vec<&str> = accumulated.lines().filter(|l| !l.is_empty()).collect();
            match lines.len() {
                1 => {
                    let mut meta = Metadata::new();
                    meta.insert("progress".into(), json!(70.0));
                    ToolResult {
                        tool_name: self.0.name.clone(),
                        success: true,
                        assets: vec![Asset::new("subdomain", "a.example.com", &self.0.name)],
                        metadata: meta,
                        ..Default::default()
                    }
                }
                2 => ToolResult {
                    tool_name: self.0.name.clone(),
                    success: true,
                    assets: vec![Asset::new("subdomain", "b.example.com", &self.0.name)],
                    ..Default::default()
                },
                _ => ToolResult::empty_failure(self.0.name.clone()),
            }
        }
        fn parse_output(&self, _output: &str) -> ToolResult {
            ToolResult {
                tool_name: self.0.name.clone(),
                success: true,
                ..Default::default()
            }
        }
    }

    #[tokio::test]
    async fn progress_default_only_applies_on_first_yield() {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(ProgressThenOmitted(ToolConfig::new(
            "subfinder",
            "sh",
            ToolCategory::Subdomain,
            "stub",
        ))));
        let bus = Arc::new(EventBus::new());

        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        bus.subscribe(
            EventType::TaskProgress,
            Arc::new(move |e: &Event| {
                if let Some(p) = e.data.get("progress").and_then(|v| v.as_f64()) {
                    seen2.lock().push(p);
                }
            }),
        );

        let orch = Orchestrator::new(ScanConfig::new("example.com"), registry, bus);
        let session = tokio::time::timeout(Duration::from_secs(5), orch.run()).await.unwrap();
        assert!(session.completed_at.is_some());

        let progresses = seen.lock().clone();
        // The explicit 70.0 must be recorded, and the second yield (which
        // omits `progress`) must never drive it back down to the 50.0
        // first-yield default.
        assert!(progresses.contains(&70.0));
        assert!(!progresses.windows(2).any(|w| w[0] == 70.0 && w[1] == 50.0));
    }

    #[tokio::test]
    async fn stop_handle_halts_the_loop() {
        let registry = Arc::new(ToolRegistry::new());
        let bus = Arc::new(EventBus::new());
        let orch = Orchestrator::new(ScanConfig::new("example.com"), registry, bus);
        let handle = orch.handle();
        handle.stop();
        let session = tokio::time::timeout(Duration::from_secs(5), orch.run()).await.unwrap();
        // Stopped before the initial task could ever complete.
        assert!(session.completed_at.is_some());
    }
}
