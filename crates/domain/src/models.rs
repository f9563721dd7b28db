use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Free-form metadata bag carried by every record in the data model.
pub type Metadata = HashMap<String, Value>;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Task
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: TaskStatus,
    pub progress: f64,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Task {
    pub fn new(name: impl Into<String>, description: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            status: TaskStatus::Pending,
            progress: 0.0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error: None,
            metadata,
        }
    }

    pub fn target(&self) -> Option<&str> {
        self.metadata.get("target").and_then(Value::as_str)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Asset
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A discovered observable. `type` is intentionally an open string set —
/// new adapters introduce new asset types without touching this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    pub discovered_by: String,
    pub timestamp: DateTime<Utc>,
    pub score: f64,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Asset {
    pub fn new(kind: impl Into<String>, value: impl Into<String>, discovered_by: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: kind.into(),
            value: value.into(),
            discovered_by: discovered_by.into(),
            timestamp: Utc::now(),
            score: 0.0,
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// The dedup key used by asset ingestion: `(type, value)`.
    pub fn dedup_key(&self) -> (String, String) {
        (self.kind.clone(), self.value.clone())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Finding
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: Uuid,
    pub severity: Severity,
    pub title: String,
    pub host: String,
    pub description: String,
    pub discovered_by: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub evidence: Option<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Finding {
    pub fn new(
        severity: Severity,
        title: impl Into<String>,
        host: impl Into<String>,
        description: impl Into<String>,
        discovered_by: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            severity,
            title: title.into(),
            host: host.into(),
            description: description.into(),
            discovered_by: discovered_by.into(),
            timestamp: Utc::now(),
            evidence: None,
            recommendations: Vec::new(),
            metadata: Metadata::new(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Event
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ScanStarted,
    ScanCompleted,
    ScanPaused,
    ScanResumed,
    TaskStarted,
    TaskCompleted,
    TaskFailed,
    TaskProgress,
    AssetDiscovered,
    FindingDiscovered,
    LogMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    #[serde(default)]
    pub data: Metadata,
}

impl Event {
    pub fn new(event_type: EventType, source: impl Into<String>, data: Metadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            timestamp: Utc::now(),
            source: source.into(),
            data,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ScanSession
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSession {
    pub id: Uuid,
    pub target: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl ScanSession {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            target: target.into(),
            started_at: Utc::now(),
            completed_at: None,
            tasks: Vec::new(),
            assets: Vec::new(),
            findings: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    pub fn critical_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Critical)
            .count()
    }

    pub fn high_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::High)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_dedup_key_ignores_unrelated_fields() {
        let a1 = Asset::new("subdomain", "a.example.com", "subfinder");
        let mut a2 = Asset::new("subdomain", "a.example.com", "amass");
        a2.score = 42.0;
        assert_eq!(a1.dedup_key(), a2.dedup_key());
    }

    #[test]
    fn severity_ordering_is_ascending() {
        assert!(Severity::Info < Severity::Low);
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn new_session_has_no_completed_at() {
        let s = ScanSession::new("example.com");
        assert!(s.completed_at.is_none());
        assert_eq!(s.critical_count(), 0);
    }

    #[test]
    fn task_target_reads_metadata() {
        let mut meta = Metadata::new();
        meta.insert("target".into(), Value::String("example.com".into()));
        let t = Task::new("subfinder", "initial recon", meta);
        assert_eq!(t.target(), Some("example.com"));
    }
}
