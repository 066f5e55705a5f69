//! Committing section drafts to the live page.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use folio_core::content::{contents_equal, short_digest};
use folio_core::types::{Content, DbId};
use folio_db::models::section_version::SectionVersion;
use folio_events::{event_types, ContentEvent, EventBus};
use serde_json::json;

use crate::error::{EngineError, EngineResult};
use crate::store::{with_deadline, ContentStore};
use crate::versions::VersionStore;

/// Publishes drafts: snapshot as a version, replace the live content, then
/// drop the draft.
pub struct PublishCoordinator {
    store: Arc<dyn ContentStore>,
    versions: Arc<VersionStore>,
    deadline: Option<Duration>,
    bus: Option<Arc<EventBus>>,
}

impl PublishCoordinator {
    pub fn new(
        store: Arc<dyn ContentStore>,
        versions: Arc<VersionStore>,
        deadline: Option<Duration>,
    ) -> Self {
        Self {
            store,
            versions,
            deadline,
            bus: None,
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Publish the current draft of `unit_id`. Returns the version created
    /// for it.
    pub async fn publish_draft(&self, unit_id: DbId, actor: DbId) -> EngineResult<SectionVersion> {
        let live = with_deadline(
            self.deadline,
            "read_section_content",
            self.store.read_section_content(unit_id),
        )
        .await?;
        if live.is_none() {
            return Err(EngineError::SectionNotFound { unit_id });
        }

        let draft = with_deadline(self.deadline, "read_draft", self.store.read_draft(unit_id))
            .await?
            .ok_or(EngineError::DraftNotFound { unit_id })?;

        let version = self.snapshot(unit_id, &draft.content, actor).await?;

        let published_at = Utc::now();
        let updated = with_deadline(
            self.deadline,
            "publish_section_content",
            self.store
                .publish_section_content(unit_id, &draft.content, actor, published_at),
        )
        .await?;
        if !updated {
            return Err(EngineError::SectionNotFound { unit_id });
        }

        with_deadline(self.deadline, "delete_draft", self.store.delete_draft(unit_id)).await?;

        tracing::info!(
            unit_id,
            version_number = version.version_number,
            digest = %short_digest(&draft.content),
            "Section published",
        );
        if let Some(bus) = &self.bus {
            bus.publish(
                ContentEvent::new(event_types::SECTION_PUBLISHED)
                    .with_source("section", unit_id)
                    .with_actor(actor)
                    .with_payload(json!({
                        "version_id": version.id,
                        "version_number": version.version_number,
                        "published_at": published_at,
                    })),
            );
        }
        Ok(version)
    }

    /// Newest version if it already holds `content`, so a publish retried
    /// after a failed live write does not add a duplicate version.
    async fn snapshot(
        &self,
        unit_id: DbId,
        content: &Content,
        actor: DbId,
    ) -> EngineResult<SectionVersion> {
        let newest = with_deadline(
            self.deadline,
            "list_versions",
            self.store.list_versions(unit_id, Some(1)),
        )
        .await?
        .into_iter()
        .next();
        match newest {
            Some(version) if contents_equal(&version.content, content) => {
                tracing::debug!(
                    unit_id,
                    version_number = version.version_number,
                    "Draft matches newest version, reusing it",
                );
                Ok(version)
            }
            _ => self.versions.create_version(unit_id, content, actor).await,
        }
    }

    /// Content the editor should start from: the draft if one exists,
    /// otherwise the live section content. `None` if the section is unknown.
    pub async fn load_editable_content(&self, unit_id: DbId) -> EngineResult<Option<Content>> {
        let draft = with_deadline(self.deadline, "read_draft", self.store.read_draft(unit_id)).await?;
        if let Some(draft) = draft {
            return Ok(Some(draft.content));
        }
        with_deadline(
            self.deadline,
            "read_section_content",
            self.store.read_section_content(unit_id),
        )
        .await
    }
}
