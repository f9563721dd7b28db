//! Relational session store. Four tables (`sessions`, `tasks`, `assets`,
//! `findings`), each referencing `sessions.id` by foreign key; upsert by
//! primary key; `metadata`/`recommendations` as JSON text; timestamps as
//! ISO-8601 strings; severities and statuses as their canonical lower-case
//! strings. See `SPEC_FULL.md` §4.9.
//!
//! Grounded on `original_source/reconpilot/core/database.py`'s
//! `save_session`/`get_session`/`get_sessions`/`delete_session` surface,
//! translated to `rusqlite` (bundled) in the style of this codebase's own
//! `sessions/src/store.rs` (load-or-create-on-open, a thin wrapper struct
//! around the backing handle).

use std::path::Path;

use chrono::{DateTime, Utc};
use recon_domain::{Asset, Error, Finding, Metadata, Result, ScanSession, Severity, Task, TaskStatus};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

/// Summary row returned by [`SessionStore::list_sessions`] — cheap enough to
/// enumerate without reconstructing every child record.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub id: Uuid,
    pub target: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub task_count: usize,
    pub asset_count: usize,
    pub finding_count: usize,
}

pub struct SessionStore {
    conn: Connection,
}

impl SessionStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(sqlite_err)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(sqlite_err)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                r#"
                PRAGMA foreign_keys = ON;

                CREATE TABLE IF NOT EXISTS sessions (
                    id TEXT PRIMARY KEY,
                    target TEXT NOT NULL,
                    started_at TEXT NOT NULL,
                    completed_at TEXT,
                    metadata TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS tasks (
                    id TEXT PRIMARY KEY,
                    session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
                    seq INTEGER NOT NULL,
                    name TEXT NOT NULL,
                    description TEXT NOT NULL,
                    status TEXT NOT NULL,
                    progress REAL NOT NULL,
                    created_at TEXT NOT NULL,
                    started_at TEXT,
                    completed_at TEXT,
                    error TEXT,
                    metadata TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS assets (
                    id TEXT PRIMARY KEY,
                    session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
                    seq INTEGER NOT NULL,
                    type TEXT NOT NULL,
                    value TEXT NOT NULL,
                    discovered_by TEXT NOT NULL,
                    timestamp TEXT NOT NULL,
                    score REAL NOT NULL,
                    metadata TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS findings (
                    id TEXT PRIMARY KEY,
                    session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
                    seq INTEGER NOT NULL,
                    severity TEXT NOT NULL,
                    title TEXT NOT NULL,
                    host TEXT NOT NULL,
                    description TEXT NOT NULL,
                    discovered_by TEXT NOT NULL,
                    timestamp TEXT NOT NULL,
                    evidence TEXT,
                    recommendations TEXT NOT NULL,
                    metadata TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_tasks_session ON tasks(session_id, seq);
                CREATE INDEX IF NOT EXISTS idx_assets_session ON assets(session_id, seq);
                CREATE INDEX IF NOT EXISTS idx_findings_session ON findings(session_id, seq);
                CREATE INDEX IF NOT EXISTS idx_sessions_started ON sessions(started_at DESC);
                "#,
            )
            .map_err(sqlite_err)
    }

    /// Upsert the complete session graph. Idempotent: saving the same
    /// session twice leaves the store in the same state; children are
    /// keyed by their own primary key, not replaced wholesale.
    pub fn save_session(&mut self, session: &ScanSession) -> Result<()> {
        let tx = self.conn.transaction().map_err(sqlite_err)?;
        let id_str = session.id.to_string();

        tx.execute(
            "INSERT INTO sessions (id, target, started_at, completed_at, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                target = excluded.target,
                started_at = excluded.started_at,
                completed_at = excluded.completed_at,
                metadata = excluded.metadata",
            params![
                id_str,
                session.target,
                to_iso(session.started_at),
                session.completed_at.map(to_iso),
                to_json(&session.metadata)?,
            ],
        )
        .map_err(sqlite_err)?;

        for (seq, task) in session.tasks.iter().enumerate() {
            tx.execute(
                "INSERT INTO tasks (id, session_id, seq, name, description, status, progress,
                    created_at, started_at, completed_at, error, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 ON CONFLICT(id) DO UPDATE SET
                    seq = excluded.seq, name = excluded.name, description = excluded.description,
                    status = excluded.status, progress = excluded.progress,
                    created_at = excluded.created_at, started_at = excluded.started_at,
                    completed_at = excluded.completed_at, error = excluded.error,
                    metadata = excluded.metadata",
                params![
                    task.id.to_string(),
                    id_str,
                    seq as i64,
                    task.name,
                    task.description,
                    status_str(task.status),
                    task.progress,
                    to_iso(task.created_at),
                    task.started_at.map(to_iso),
                    task.completed_at.map(to_iso),
                    task.error,
                    to_json(&task.metadata)?,
                ],
            )
            .map_err(sqlite_err)?;
        }

        for (seq, asset) in session.assets.iter().enumerate() {
            tx.execute(
                "INSERT INTO assets (id, session_id, seq, type, value, discovered_by, timestamp, score, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(id) DO UPDATE SET
                    seq = excluded.seq, type = excluded.type, value = excluded.value,
                    discovered_by = excluded.discovered_by, timestamp = excluded.timestamp,
                    score = excluded.score, metadata = excluded.metadata",
                params![
                    asset.id.to_string(),
                    id_str,
                    seq as i64,
                    asset.kind,
                    asset.value,
                    asset.discovered_by,
                    to_iso(asset.timestamp),
                    asset.score,
                    to_json(&asset.metadata)?,
                ],
            )
            .map_err(sqlite_err)?;
        }

        for (seq, finding) in session.findings.iter().enumerate() {
            tx.execute(
                "INSERT INTO findings (id, session_id, seq, severity, title, host, description,
                    discovered_by, timestamp, evidence, recommendations, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 ON CONFLICT(id) DO UPDATE SET
                    seq = excluded.seq, severity = excluded.severity, title = excluded.title,
                    host = excluded.host, description = excluded.description,
                    discovered_by = excluded.discovered_by, timestamp = excluded.timestamp,
                    evidence = excluded.evidence, recommendations = excluded.recommendations,
                    metadata = excluded.metadata",
                params![
                    finding.id.to_string(),
                    id_str,
                    seq as i64,
                    severity_str(finding.severity),
                    finding.title,
                    finding.host,
                    finding.description,
                    finding.discovered_by,
                    to_iso(finding.timestamp),
                    finding.evidence,
                    serde_json::to_string(&finding.recommendations).map_err(Error::Json)?,
                    to_json(&finding.metadata)?,
                ],
            )
            .map_err(sqlite_err)?;
        }

        tx.commit().map_err(sqlite_err)?;
        tracing::info!(
            session_id = %session.id,
            tasks = session.tasks.len(),
            assets = session.assets.len(),
            findings = session.findings.len(),
            "session persisted"
        );
        Ok(())
    }

    /// Reconstruct the full session graph, or `None` if `id` is unknown.
    pub fn load_session(&self, id: Uuid) -> Result<Option<ScanSession>> {
        let id_str = id.to_string();
        let row: Option<(String, String, Option<String>, String)> = self
            .conn
            .query_row(
                "SELECT target, started_at, completed_at, metadata FROM sessions WHERE id = ?1",
                params![id_str],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()
            .map_err(sqlite_err)?;

        let Some((target, started_at, completed_at, metadata)) = row else {
            return Ok(None);
        };

        Ok(Some(ScanSession {
            id,
            target,
            started_at: from_iso(&started_at)?,
            completed_at: completed_at.as_deref().map(from_iso).transpose()?,
            tasks: self.load_tasks(&id_str)?,
            assets: self.load_assets(&id_str)?,
            findings: self.load_findings(&id_str)?,
            metadata: from_json(&metadata)?,
        }))
    }

    fn load_tasks(&self, session_id: &str) -> Result<Vec<Task>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, name, description, status, progress, created_at, started_at,
                    completed_at, error, metadata
                 FROM tasks WHERE session_id = ?1 ORDER BY seq ASC",
            )
            .map_err(sqlite_err)?;
        let rows = stmt
            .query_map(params![session_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, Option<String>>(7)?,
                    row.get::<_, Option<String>>(8)?,
                    row.get::<_, String>(9)?,
                ))
            })
            .map_err(sqlite_err)?;

        let mut tasks = Vec::new();
        for row in rows {
            let (id, name, description, status, progress, created_at, started_at, completed_at, error, metadata) =
                row.map_err(sqlite_err)?;
            tasks.push(Task {
                id: parse_uuid(&id)?,
                name,
                description,
                status: parse_status(&status)?,
                progress,
                created_at: from_iso(&created_at)?,
                started_at: started_at.as_deref().map(from_iso).transpose()?,
                completed_at: completed_at.as_deref().map(from_iso).transpose()?,
                error,
                metadata: from_json(&metadata)?,
            });
        }
        Ok(tasks)
    }

    fn load_assets(&self, session_id: &str) -> Result<Vec<Asset>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, type, value, discovered_by, timestamp, score, metadata
                 FROM assets WHERE session_id = ?1 ORDER BY seq ASC",
            )
            .map_err(sqlite_err)?;
        let rows = stmt
            .query_map(params![session_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, f64>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })
            .map_err(sqlite_err)?;

        let mut assets = Vec::new();
        for row in rows {
            let (id, kind, value, discovered_by, timestamp, score, metadata) = row.map_err(sqlite_err)?;
            assets.push(Asset {
                id: parse_uuid(&id)?,
                kind,
                value,
                discovered_by,
                timestamp: from_iso(&timestamp)?,
                score,
                metadata: from_json(&metadata)?,
            });
        }
        Ok(assets)
    }

    fn load_findings(&self, session_id: &str) -> Result<Vec<Finding>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, severity, title, host, description, discovered_by, timestamp,
                    evidence, recommendations, metadata
                 FROM findings WHERE session_id = ?1 ORDER BY seq ASC",
            )
            .map_err(sqlite_err)?;
        let rows = stmt
            .query_map(params![session_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, Option<String>>(7)?,
                    row.get::<_, String>(8)?,
                    row.get::<_, String>(9)?,
                ))
            })
            .map_err(sqlite_err)?;

        let mut findings = Vec::new();
        for row in rows {
            let (id, severity, title, host, description, discovered_by, timestamp, evidence, recommendations, metadata) =
                row.map_err(sqlite_err)?;
            findings.push(Finding {
                id: parse_uuid(&id)?,
                severity: parse_severity(&severity)?,
                title,
                host,
                description,
                discovered_by,
                timestamp: from_iso(&timestamp)?,
                evidence,
                recommendations: serde_json::from_str(&recommendations).map_err(Error::Json)?,
                metadata: from_json(&metadata)?,
            });
        }
        Ok(findings)
    }

    /// Saved sessions, most recently started first. Summary rows only —
    /// full graphs are loaded on demand via [`Self::load_session`].
    pub fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT s.id, s.target, s.started_at, s.completed_at,
                    (SELECT COUNT(*) FROM tasks WHERE session_id = s.id),
                    (SELECT COUNT(*) FROM assets WHERE session_id = s.id),
                    (SELECT COUNT(*) FROM findings WHERE session_id = s.id)
                 FROM sessions s ORDER BY s.started_at DESC",
            )
            .map_err(sqlite_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, i64>(6)?,
                ))
            })
            .map_err(sqlite_err)?;

        let mut summaries = Vec::new();
        for row in rows {
            let (id, target, started_at, completed_at, task_count, asset_count, finding_count) =
                row.map_err(sqlite_err)?;
            summaries.push(SessionSummary {
                id: parse_uuid(&id)?,
                target,
                started_at: from_iso(&started_at)?,
                completed_at: completed_at.as_deref().map(from_iso).transpose()?,
                task_count: task_count as usize,
                asset_count: asset_count as usize,
                finding_count: finding_count as usize,
            });
        }
        Ok(summaries)
    }

    /// Delete a session and every task/asset/finding referencing it.
    /// Cascading is enforced by `ON DELETE CASCADE` (foreign keys are
    /// enabled at connection open).
    pub fn delete_session(&mut self, id: Uuid) -> Result<()> {
        self.conn
            .execute("DELETE FROM sessions WHERE id = ?1", params![id.to_string()])
            .map_err(sqlite_err)?;
        Ok(())
    }
}

fn sqlite_err(e: rusqlite::Error) -> Error {
    Error::Persistence(e.to_string())
}

fn to_iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

fn from_iso(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Persistence(format!("bad timestamp {s:?}: {e}")))
}

fn to_json(meta: &Metadata) -> Result<String> {
    serde_json::to_string(meta).map_err(Error::Json)
}

fn from_json(s: &str) -> Result<Metadata> {
    serde_json::from_str(s).map_err(Error::Json)
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::Persistence(format!("bad uuid {s:?}: {e}")))
}

fn status_str(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "pending",
        TaskStatus::Running => "running",
        TaskStatus::Completed => "completed",
        TaskStatus::Failed => "failed",
        TaskStatus::Skipped => "skipped",
    }
}

fn parse_status(s: &str) -> Result<TaskStatus> {
    match s {
        "pending" => Ok(TaskStatus::Pending),
        "running" => Ok(TaskStatus::Running),
        "completed" => Ok(TaskStatus::Completed),
        "failed" => Ok(TaskStatus::Failed),
        "skipped" => Ok(TaskStatus::Skipped),
        other => Err(Error::Persistence(format!("unknown task status {other:?}"))),
    }
}

fn severity_str(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "info",
        Severity::Low => "low",
        Severity::Medium => "medium",
        Severity::High => "high",
        Severity::Critical => "critical",
    }
}

fn parse_severity(s: &str) -> Result<Severity> {
    match s {
        "info" => Ok(Severity::Info),
        "low" => Ok(Severity::Low),
        "medium" => Ok(Severity::Medium),
        "high" => Ok(Severity::High),
        "critical" => Ok(Severity::Critical),
        other => Err(Error::Persistence(format!("unknown severity {other:?}"))),
    }
}
