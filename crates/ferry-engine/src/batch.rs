//! Batch scheduling.
//!
//! A batch is an ordered list of session templates sharing one settings
//! snapshot. Sessions are created and submitted in FIFO order and run
//! asynchronously; the admission gate bounds how many run at once
//! (`parallel_conversions = 1` gives exclusive, strictly sequential
//! execution, since a session releases its slot on any terminal or paused
//! state).

use ferry_core::{Direction, SessionId};
use ferry_settings::FerrySettings;
use tracing::info;

use crate::errors::Result;
use crate::orchestrator::{Orchestrator, StartSessionRequest};

/// Template for one session in a batch.
#[derive(Clone, Debug)]
pub struct BatchQueueEntry {
    /// Source project root.
    pub source_path: String,
    /// Target project root.
    pub target_path: String,
    /// Conversion direction.
    pub direction: Direction,
}

impl Orchestrator {
    /// Start every entry of a batch, in order.
    ///
    /// Returns the created session ids immediately — sessions run
    /// asynchronously and are tracked individually through the normal
    /// status API. Entries past the concurrency limit wait in `Queued`.
    pub fn start_batch(
        &self,
        entries: Vec<BatchQueueEntry>,
        shared_settings: Option<FerrySettings>,
    ) -> Result<Vec<SessionId>> {
        if let Some(settings) = &shared_settings {
            settings.validate()?;
        }

        let mut session_ids = Vec::with_capacity(entries.len());
        for entry in entries {
            let session_id = self.start_session(StartSessionRequest {
                source_path: entry.source_path,
                target_path: entry.target_path,
                direction: entry.direction,
                settings: shared_settings.clone(),
            })?;
            session_ids.push(session_id);
        }

        info!(count = session_ids.len(), "batch submitted");
        Ok(session_ids)
    }
}
