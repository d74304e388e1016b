//! Schema migrations.
//!
//! Versioned via `PRAGMA user_version`. Each migration runs inside a
//! transaction; a partially-applied migration can never be observed.

use rusqlite::Connection;
use tracing::debug;

use crate::errors::Result;

/// Current schema version.
const SCHEMA_VERSION: i64 = 1;

/// Run all pending migrations.
pub fn run(conn: &Connection) -> Result<()> {
    let current: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if current >= SCHEMA_VERSION {
        return Ok(());
    }

    debug!(from = current, to = SCHEMA_VERSION, "running migrations");

    if current < 1 {
        conn.execute_batch(
            "BEGIN;
             CREATE TABLE IF NOT EXISTS session_snapshots (
                 id TEXT PRIMARY KEY,
                 direction TEXT NOT NULL,
                 source_path TEXT NOT NULL,
                 target_path TEXT NOT NULL,
                 status TEXT NOT NULL,
                 started INTEGER NOT NULL DEFAULT 0,
                 pause_reason TEXT,
                 stage_progress_json TEXT NOT NULL,
                 chunks_json TEXT NOT NULL,
                 manual_queue_json TEXT NOT NULL,
                 cost_json TEXT NOT NULL,
                 notes_json TEXT NOT NULL,
                 settings_json TEXT NOT NULL,
                 created_at TEXT NOT NULL,
                 updated_at TEXT NOT NULL,
                 paused_at TEXT
             );
             CREATE INDEX IF NOT EXISTS idx_session_snapshots_status
                 ON session_snapshots(status);

             CREATE TABLE IF NOT EXISTS learned_patterns (
                 fingerprint TEXT PRIMARY KEY,
                 replacement TEXT NOT NULL,
                 count INTEGER NOT NULL DEFAULT 0,
                 threshold INTEGER NOT NULL,
                 hint TEXT,
                 auto_attempts INTEGER NOT NULL DEFAULT 0,
                 auto_successes INTEGER NOT NULL DEFAULT 0,
                 created_at TEXT NOT NULL,
                 updated_at TEXT NOT NULL
             );

             CREATE TABLE IF NOT EXISTS webhook_configs (
                 url TEXT PRIMARY KEY,
                 headers_json TEXT NOT NULL,
                 events_json TEXT NOT NULL,
                 secret_token TEXT,
                 created_at TEXT NOT NULL,
                 updated_at TEXT NOT NULL
             );

             PRAGMA user_version = 1;
             COMMIT;",
        )?;
    }

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
