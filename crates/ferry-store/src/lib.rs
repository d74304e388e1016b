//! # ferry-store
//!
//! `SQLite` persistence for the Ferry conversion engine.
//!
//! Three persisted facets, all of which must survive process restart:
//!
//! - **Session snapshots** — the checkpoint store. A full snapshot is
//!   upserted after every chunk and status transition; resume reconstructs
//!   the session from the latest snapshot.
//! - **Learned patterns** — the cross-session store of promoted manual
//!   fixes, keyed by content signature. Writes are serialized behind a
//!   single-writer lock since concurrent sessions can promote patterns.
//! - **Webhook configs** — registered endpoints, keyed by URL.

#![deny(unsafe_code)]

mod connection;
mod errors;
mod migrations;
mod patterns;
mod snapshots;
mod webhooks;

pub use connection::{ConnectionConfig, ConnectionPool, PooledConnection};
pub use errors::{Result, StoreError};
pub use patterns::LearnedPattern;
pub use snapshots::SessionSnapshot;

use std::path::Path;

use parking_lot::Mutex;

/// Handle to the Ferry database.
///
/// Cheap to clone behind an `Arc`; all repositories hang off this handle.
pub struct Store {
    pool: ConnectionPool,
    /// Serializes learned-pattern writes across sessions.
    pattern_write_lock: Mutex<()>,
}

impl Store {
    /// Open (or create) the database at `path` and run migrations.
    pub fn open(path: &Path) -> Result<Self> {
        let pool = connection::new_file(path, &ConnectionConfig::default())?;
        let conn = pool.get()?;
        migrations::run(&conn)?;
        Ok(Self {
            pool,
            pattern_write_lock: Mutex::new(()),
        })
    }

    /// Get a pooled connection.
    pub(crate) fn conn(&self) -> Result<PooledConnection> {
        Ok(self.pool.get()?)
    }

    /// Serialize a learned-pattern write.
    pub(crate) fn pattern_write_guard(&self) -> parking_lot::MutexGuard<'_, ()> {
        self.pattern_write_lock.lock()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}
