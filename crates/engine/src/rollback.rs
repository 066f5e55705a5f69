//! Restore a section draft from a stored version.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use folio_core::content::DRAFT_STATUS;
use folio_core::types::DbId;
use folio_db::models::section_draft::{SectionDraft, UpsertSectionDraft};
use folio_events::{event_types, ContentEvent, EventBus};
use serde_json::json;

use crate::error::{EngineError, EngineResult};
use crate::store::{with_deadline, ContentStore};

pub struct RollbackCoordinator {
    store: Arc<dyn ContentStore>,
    deadline: Option<Duration>,
    bus: Option<Arc<EventBus>>,
}

impl RollbackCoordinator {
    pub fn new(store: Arc<dyn ContentStore>, deadline: Option<Duration>) -> Self {
        Self {
            store,
            deadline,
            bus: None,
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Overwrite the draft of `unit_id` with the content of `version_id`
    /// and reset its status to `draft`.
    ///
    /// No version is created and the replaced draft content is not kept.
    /// Fails with [`EngineError::VersionNotFound`] without writing anything
    /// if the version does not exist. Callers holding an
    /// [`AutosaveSession`](crate::autosave::AutosaveSession) for the unit
    /// should reset it afterwards.
    pub async fn rollback_to_version(
        &self,
        unit_id: DbId,
        version_id: DbId,
        actor: DbId,
    ) -> EngineResult<SectionDraft> {
        let version = with_deadline(
            self.deadline,
            "get_version_by_id",
            self.store.get_version_by_id(version_id),
        )
        .await?
        .ok_or(EngineError::VersionNotFound { version_id })?;

        let input = UpsertSectionDraft {
            section_id: unit_id,
            content: version.content,
            status: DRAFT_STATUS.to_string(),
            updated_by: actor,
            updated_at: Utc::now(),
        };
        let draft =
            with_deadline(self.deadline, "upsert_draft", self.store.upsert_draft(&input)).await?;

        tracing::info!(
            unit_id,
            version_id,
            version_number = version.version_number,
            "Draft rolled back",
        );
        if let Some(bus) = &self.bus {
            bus.publish(
                ContentEvent::new(event_types::DRAFT_ROLLED_BACK)
                    .with_source("section", unit_id)
                    .with_actor(actor)
                    .with_payload(json!({
                        "version_id": version_id,
                        "version_number": version.version_number,
                    })),
            );
        }
        Ok(draft)
    }
}
