//! Fan-out of content lifecycle notifications.
//!
//! Engine services publish a [`ContentEvent`] after each draft save,
//! conflict, version change, section publish or result status change.
//! Editor and reviewer surfaces hold a receiver and refresh on the events
//! they care about.

use chrono::{DateTime, Utc};
use folio_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events kept for receivers that fall behind.
const DEFAULT_CAPACITY: usize = 256;

/// A notification about one section or submission.
///
/// `source_entity_type` is `"section"` for draft, version and publish
/// events and the submission kind (`"assignment"`, `"quiz"`) for result
/// status events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentEvent {
    /// One of [`crate::event_types`].
    pub event_type: String,
    pub source_entity_type: Option<String>,
    pub source_entity_id: Option<DbId>,
    pub actor_user_id: Option<DbId>,
    /// Version numbers, digests, row counts, error text.
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl ContentEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            source_entity_type: None,
            source_entity_id: None,
            actor_user_id: None,
            payload: serde_json::json!({}),
            timestamp: Utc::now(),
        }
    }

    pub fn with_source(mut self, entity_type: impl Into<String>, entity_id: DbId) -> Self {
        self.source_entity_type = Some(entity_type.into());
        self.source_entity_id = Some(entity_id);
        self
    }

    pub fn with_actor(mut self, user_id: DbId) -> Self {
        self.actor_user_id = Some(user_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Broadcast hub shared as `Arc<EventBus>` by the engine services.
///
/// Publishing never blocks or fails: events sent while nobody listens are
/// discarded, and a receiver more than the channel capacity behind gets
/// `RecvError::Lagged` and resumes from the oldest retained event.
pub struct EventBus {
    sender: broadcast::Sender<ContentEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: ContentEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ContentEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
