//! Session snapshot persistence — the checkpoint store.
//!
//! A snapshot is the full durable state of one session: stage progress,
//! every chunk, the manual queue, the cost ledger, notes, and the settings
//! captured at start. The engine upserts after every chunk and status
//! transition; the upsert is a single statement, so a crash mid-write
//! leaves the previous complete snapshot in place.

use std::collections::BTreeMap;

use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::debug;

use ferry_core::{
    Chunk, CostState, ManualFixEntry, PauseReason, SessionMeta, SessionStatus, Stage,
    StageProgress,
};
use ferry_settings::FerrySettings;

use crate::errors::{Result, StoreError};
use crate::Store;

/// Full durable state of one session.
///
/// `chunks` preserves plan (insertion) order — resume determinism depends
/// on it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Immutable session identity.
    pub meta: SessionMeta,
    /// Lifecycle status at snapshot time.
    pub status: SessionStatus,
    /// Whether the session has ever entered `Running` (gates the
    /// `session.started` event across resumes).
    #[serde(default)]
    pub started: bool,
    /// Why the session is paused, when it is.
    pub pause_reason: Option<PauseReason>,
    /// Per-stage progress counters.
    pub stage_progress: BTreeMap<Stage, StageProgress>,
    /// Every chunk, in plan order.
    pub chunks: Vec<Chunk>,
    /// Manual fix entries, in escalation order.
    pub manual_queue: Vec<ManualFixEntry>,
    /// Spend ledger (includes the active model and fallback position).
    pub cost: CostState,
    /// Append-only session notes.
    pub notes: Vec<String>,
    /// Settings captured at session start. Never mutated mid-run.
    pub settings: FerrySettings,
    /// Last mutation timestamp (RFC 3339).
    pub updated_at: String,
    /// When the session was last paused (RFC 3339).
    pub paused_at: Option<String>,
}

impl Store {
    /// Write (or replace) a session snapshot.
    pub fn upsert_snapshot(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let conn = self.conn()?;
        let pause_reason = snapshot
            .pause_reason
            .map(|r| serde_json::to_string(&r))
            .transpose()?;
        let _ = conn.execute(
            "INSERT INTO session_snapshots (
                 id, direction, source_path, target_path, status, started,
                 pause_reason, stage_progress_json, chunks_json, manual_queue_json,
                 cost_json, notes_json, settings_json, created_at, updated_at,
                 paused_at
             )
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                     ?15, ?16)
             ON CONFLICT(id) DO UPDATE SET
                 status = excluded.status,
                 started = excluded.started,
                 pause_reason = excluded.pause_reason,
                 stage_progress_json = excluded.stage_progress_json,
                 chunks_json = excluded.chunks_json,
                 manual_queue_json = excluded.manual_queue_json,
                 cost_json = excluded.cost_json,
                 notes_json = excluded.notes_json,
                 settings_json = excluded.settings_json,
                 updated_at = excluded.updated_at,
                 paused_at = excluded.paused_at",
            params![
                snapshot.meta.id.as_str(),
                snapshot.meta.direction.as_str(),
                snapshot.meta.source_path,
                snapshot.meta.target_path,
                serde_json::to_string(&snapshot.status)?,
                snapshot.started,
                pause_reason,
                serde_json::to_string(&snapshot.stage_progress)?,
                serde_json::to_string(&snapshot.chunks)?,
                serde_json::to_string(&snapshot.manual_queue)?,
                serde_json::to_string(&snapshot.cost)?,
                serde_json::to_string(&snapshot.notes)?,
                serde_json::to_string(&snapshot.settings)?,
                snapshot.meta.created_at,
                snapshot.updated_at,
                snapshot.paused_at,
            ],
        )?;
        debug!(session_id = %snapshot.meta.id, status = ?snapshot.status, "snapshot written");
        Ok(())
    }

    /// Load the latest snapshot for a session.
    pub fn load_snapshot(&self, session_id: &str) -> Result<SessionSnapshot> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT direction, source_path, target_path, status, started,
                        pause_reason, stage_progress_json, chunks_json,
                        manual_queue_json, cost_json, notes_json, settings_json,
                        created_at, updated_at, paused_at
                 FROM session_snapshots WHERE id = ?1",
                params![session_id],
                |row| {
                    Ok(SnapshotRow {
                        direction: row.get(0)?,
                        source_path: row.get(1)?,
                        target_path: row.get(2)?,
                        status: row.get(3)?,
                        started: row.get(4)?,
                        pause_reason: row.get(5)?,
                        stage_progress_json: row.get(6)?,
                        chunks_json: row.get(7)?,
                        manual_queue_json: row.get(8)?,
                        cost_json: row.get(9)?,
                        notes_json: row.get(10)?,
                        settings_json: row.get(11)?,
                        created_at: row.get(12)?,
                        updated_at: row.get(13)?,
                        paused_at: row.get(14)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found("session snapshot", session_id))?;

        row.into_snapshot(session_id)
    }

    /// List all persisted session ids with their status, newest first.
    pub fn list_snapshots(&self) -> Result<Vec<(String, SessionStatus)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, status FROM session_snapshots ORDER BY updated_at DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (id, status_json) = row?;
            out.push((id, serde_json::from_str(&status_json)?));
        }
        Ok(out)
    }

    /// Delete a session snapshot. Sessions are destroyed only by explicit
    /// deletion, never implicitly.
    pub fn delete_snapshot(&self, session_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM session_snapshots WHERE id = ?1",
            params![session_id],
        )?;
        Ok(deleted > 0)
    }
}

/// Raw row shape before JSON columns are decoded.
struct SnapshotRow {
    direction: String,
    source_path: String,
    target_path: String,
    status: String,
    started: bool,
    pause_reason: Option<String>,
    stage_progress_json: String,
    chunks_json: String,
    manual_queue_json: String,
    cost_json: String,
    notes_json: String,
    settings_json: String,
    created_at: String,
    updated_at: String,
    paused_at: Option<String>,
}

impl SnapshotRow {
    fn into_snapshot(self, session_id: &str) -> Result<SessionSnapshot> {
        let direction = serde_json::from_value(serde_json::Value::String(self.direction))?;
        Ok(SessionSnapshot {
            meta: SessionMeta {
                id: session_id.into(),
                direction,
                source_path: self.source_path,
                target_path: self.target_path,
                created_at: self.created_at,
            },
            status: serde_json::from_str(&self.status)?,
            started: self.started,
            pause_reason: self
                .pause_reason
                .map(|r| serde_json::from_str(&r))
                .transpose()?,
            stage_progress: serde_json::from_str(&self.stage_progress_json)?,
            chunks: serde_json::from_str(&self.chunks_json)?,
            manual_queue: serde_json::from_str(&self.manual_queue_json)?,
            cost: serde_json::from_str(&self.cost_json)?,
            notes: serde_json::from_str(&self.notes_json)?,
            settings: serde_json::from_str(&self.settings_json)?,
            updated_at: self.updated_at,
            paused_at: self.paused_at,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
