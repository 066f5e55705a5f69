//! Advisory conflict detection for draft writes.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use folio_core::conflict::is_conflicting;
use folio_core::types::{Content, DbId, Timestamp};
use serde::Serialize;

use crate::error::EngineResult;
use crate::store::{with_deadline, ContentStore};

/// Raised when the persisted draft was recently written by someone else
/// with different content. The save still proceeds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConflictNotice {
    pub unit_id: DbId,
    pub existing_updated_at: Timestamp,
    pub existing_updated_by: Option<DbId>,
    pub detected_at: Timestamp,
}

/// Compares a candidate payload against the currently persisted draft.
pub struct ConflictDetector {
    store: Arc<dyn ContentStore>,
    window: chrono::Duration,
    deadline: Option<Duration>,
}

impl ConflictDetector {
    pub fn new(
        store: Arc<dyn ContentStore>,
        window: chrono::Duration,
        deadline: Option<Duration>,
    ) -> Self {
        Self {
            store,
            window,
            deadline,
        }
    }

    /// Returns a notice if the persisted draft is younger than the window
    /// and differs structurally from `candidate`.
    pub async fn check(
        &self,
        unit_id: DbId,
        candidate: &Content,
    ) -> EngineResult<Option<ConflictNotice>> {
        let existing = with_deadline(
            self.deadline,
            "read_draft",
            self.store.read_draft(unit_id),
        )
        .await?;

        let Some(existing) = existing else {
            return Ok(None);
        };

        let now = Utc::now();
        if !is_conflicting(
            &existing.content,
            existing.updated_at,
            candidate,
            now,
            self.window,
        ) {
            return Ok(None);
        }

        tracing::warn!(
            unit_id,
            existing_updated_at = %existing.updated_at,
            existing_updated_by = ?existing.updated_by,
            "Draft was modified recently by another writer",
        );

        Ok(Some(ConflictNotice {
            unit_id,
            existing_updated_at: existing.updated_at,
            existing_updated_by: existing.updated_by,
            detected_at: now,
        }))
    }
}
