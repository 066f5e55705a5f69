//! Debounced, single-flight draft autosave.
//!
//! One [`AutosaveSession`] exists per actively edited unit. It owns the
//! session's "last saved content" cache and its in-flight flag; nothing is
//! shared between sessions.
//!
//! [`schedule_save`](AutosaveSession::schedule_save) (re)starts a debounce
//! timer on the current tokio runtime. When the timer fires, the most
//! recently scheduled content goes through the change gate, the conflict
//! detector and finally the draft upsert. Once a timer has fired its write
//! can no longer be cancelled.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use folio_core::content::{needs_save, short_digest, DRAFT_STATUS};
use folio_core::types::{Content, DbId};
use folio_db::models::section_draft::{SectionDraft, UpsertSectionDraft};
use folio_events::{event_types, ContentEvent, EventBus};
use parking_lot::Mutex;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::conflict::{ConflictDetector, ConflictNotice};
use crate::error::EngineError;
use crate::store::{with_deadline, ContentStore};

// ---------------------------------------------------------------------------
// Listener
// ---------------------------------------------------------------------------

/// Callbacks fired by an autosave session. All methods default to no-ops.
pub trait AutosaveListener: Send + Sync {
    /// A draft write is about to be issued.
    fn on_save_start(&self, _unit_id: DbId) {}

    fn on_save_complete(&self, _draft: &SectionDraft) {}

    /// The write failed; the cached content is left untouched so the next
    /// attempt retries the same payload.
    fn on_save_error(&self, _unit_id: DbId, _error: &EngineError) {}

    /// Advisory only. The save proceeds regardless.
    fn on_conflict(&self, _notice: &ConflictNotice) {}
}

/// Listener that ignores every notification.
pub struct NoopListener;

impl AutosaveListener for NoopListener {}

/// Forwards autosave notifications to the event bus.
pub struct EventBusListener {
    bus: Arc<EventBus>,
}

impl EventBusListener {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

impl AutosaveListener for EventBusListener {
    fn on_save_start(&self, unit_id: DbId) {
        self.bus.publish(
            ContentEvent::new(event_types::DRAFT_SAVE_STARTED).with_source("section", unit_id),
        );
    }

    fn on_save_complete(&self, draft: &SectionDraft) {
        let mut event = ContentEvent::new(event_types::DRAFT_SAVED)
            .with_source("section", draft.section_id)
            .with_payload(json!({
                "digest": short_digest(&draft.content),
                "updated_at": draft.updated_at,
            }));
        if let Some(actor) = draft.updated_by {
            event = event.with_actor(actor);
        }
        self.bus.publish(event);
    }

    fn on_save_error(&self, unit_id: DbId, error: &EngineError) {
        self.bus.publish(
            ContentEvent::new(event_types::DRAFT_SAVE_FAILED)
                .with_source("section", unit_id)
                .with_payload(json!({ "error": error.to_string() })),
        );
    }

    fn on_conflict(&self, notice: &ConflictNotice) {
        self.bus.publish(
            ContentEvent::new(event_types::DRAFT_CONFLICT)
                .with_source("section", notice.unit_id)
                .with_payload(json!({
                    "existing_updated_at": notice.existing_updated_at,
                    "existing_updated_by": notice.existing_updated_by,
                    "detected_at": notice.detected_at,
                })),
        );
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Result of one save attempt.
#[derive(Debug)]
pub enum SaveOutcome {
    Saved(SectionDraft),
    /// Content equals the last saved payload; no I/O was performed.
    Unchanged,
    /// Another write of this session was in flight; the request was dropped.
    SkippedInFlight,
    /// The write failed and was reported to the listener.
    Failed(EngineError),
}

struct PendingSave {
    generation: u64,
    cancel: CancellationToken,
}

struct SessionInner {
    store: Arc<dyn ContentStore>,
    detector: ConflictDetector,
    listener: Arc<dyn AutosaveListener>,
    delay: Duration,
    deadline: Option<Duration>,
    saving: AtomicBool,
    last_saved: Mutex<Option<Content>>,
    pending: Mutex<Option<PendingSave>>,
    generation: AtomicU64,
}

/// Clears the in-flight flag on every exit path.
struct SavingGuard<'a>(&'a AtomicBool);

impl Drop for SavingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SessionInner {
    /// Forget the pending timer if it is still the one identified by
    /// `generation`. Returns `false` if it was cancelled or replaced.
    fn take_pending(&self, generation: u64) -> bool {
        let mut pending = self.pending.lock();
        match pending.as_ref() {
            Some(current) if current.generation == generation => {
                *pending = None;
                true
            }
            _ => false,
        }
    }

    fn cancel_pending(&self) {
        if let Some(previous) = self.pending.lock().take() {
            previous.cancel.cancel();
        }
    }

    async fn save(&self, unit_id: DbId, content: Content, actor: DbId) -> SaveOutcome {
        if self
            .saving
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(unit_id, "Save already in flight, dropping request");
            return SaveOutcome::SkippedInFlight;
        }
        let _guard = SavingGuard(&self.saving);

        let changed = needs_save(&content, self.last_saved.lock().as_ref());
        if !changed {
            tracing::debug!(unit_id, "Content unchanged, skipping save");
            return SaveOutcome::Unchanged;
        }

        match self.detector.check(unit_id, &content).await {
            Ok(Some(notice)) => self.listener.on_conflict(&notice),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(unit_id, error = %e, "Conflict check failed, saving anyway");
            }
        }

        self.listener.on_save_start(unit_id);

        let input = UpsertSectionDraft {
            section_id: unit_id,
            content,
            status: DRAFT_STATUS.to_string(),
            updated_by: actor,
            updated_at: Utc::now(),
        };

        match with_deadline(self.deadline, "upsert_draft", self.store.upsert_draft(&input)).await
        {
            Ok(draft) => {
                *self.last_saved.lock() = Some(draft.content.clone());
                tracing::info!(
                    unit_id,
                    digest = %short_digest(&draft.content),
                    "Draft saved",
                );
                self.listener.on_save_complete(&draft);
                SaveOutcome::Saved(draft)
            }
            Err(e) => {
                tracing::error!(unit_id, error = %e, "Draft save failed");
                self.listener.on_save_error(unit_id, &e);
                SaveOutcome::Failed(e)
            }
        }
    }
}

/// Autosave state for one edited unit.
///
/// Dropping the session cancels a pending timer; a write already in flight
/// still completes.
pub struct AutosaveSession {
    inner: Arc<SessionInner>,
}

impl AutosaveSession {
    pub fn new(
        store: Arc<dyn ContentStore>,
        config: &EngineConfig,
        listener: Arc<dyn AutosaveListener>,
    ) -> Self {
        let detector = ConflictDetector::new(
            Arc::clone(&store),
            config.conflict_window,
            config.store_timeout,
        );
        Self {
            inner: Arc::new(SessionInner {
                store,
                detector,
                listener,
                delay: config.autosave_delay,
                deadline: config.store_timeout,
                saving: AtomicBool::new(false),
                last_saved: Mutex::new(None),
                pending: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Restart the debounce timer with `content`. Only the content of the
    /// last call within a window is persisted.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule_save(&self, unit_id: DbId, content: Content, actor: DbId) {
        let token = CancellationToken::new();
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1;

        let previous = self.inner.pending.lock().replace(PendingSave {
            generation,
            cancel: token.clone(),
        });
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(inner.delay) => {}
            }
            if !inner.take_pending(generation) {
                return;
            }
            inner.save(unit_id, content, actor).await;
        });
    }

    /// Cancel any pending timer and persist `content` immediately.
    pub async fn save_now(&self, unit_id: DbId, content: Content, actor: DbId) -> SaveOutcome {
        self.inner.cancel_pending();
        self.inner.save(unit_id, content, actor).await
    }

    /// Discard a pending timer without persisting.
    pub fn cancel(&self) {
        self.inner.cancel_pending();
    }

    /// Cancel a pending timer and forget the last saved content.
    pub fn reset(&self) {
        self.inner.cancel_pending();
        *self.inner.last_saved.lock() = None;
    }

    /// Whether a draft write is currently in flight.
    pub fn is_saving(&self) -> bool {
        self.inner.saving.load(Ordering::Acquire)
    }

    pub fn has_pending_save(&self) -> bool {
        self.inner.pending.lock().is_some()
    }

    pub fn last_saved_content(&self) -> Option<Content> {
        self.inner.last_saved.lock().clone()
    }
}

impl Drop for AutosaveSession {
    fn drop(&mut self) {
        self.inner.cancel_pending();
    }
}
