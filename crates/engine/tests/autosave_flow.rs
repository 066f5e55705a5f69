//! Autosave sessions driven end to end against the in-memory store.
//!
//! Timing tests run on a paused clock so debounce windows are exact.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use folio_db::models::section_draft::SectionDraft;
use folio_engine::{
    AutosaveListener, AutosaveSession, ConflictNotice, Engine, EngineConfig, EngineError,
    MemoryContentStore, SaveOutcome,
};
use folio_engine::store::StoreOp;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::{sleep, sleep_until, Instant};

#[derive(Debug, Clone, PartialEq)]
enum Signal {
    Started,
    Completed(serde_json::Value),
    Failed,
    Conflict,
}

/// Forwards every callback, stamped with time elapsed since `origin`.
struct ChannelListener {
    origin: Instant,
    tx: mpsc::UnboundedSender<(Signal, Duration)>,
}

impl ChannelListener {
    fn send(&self, signal: Signal) {
        let _ = self.tx.send((signal, self.origin.elapsed()));
    }
}

impl AutosaveListener for ChannelListener {
    fn on_save_start(&self, _unit_id: i64) {
        self.send(Signal::Started);
    }

    fn on_save_complete(&self, draft: &SectionDraft) {
        self.send(Signal::Completed(draft.content.clone()));
    }

    fn on_save_error(&self, _unit_id: i64, _error: &EngineError) {
        self.send(Signal::Failed);
    }

    fn on_conflict(&self, _notice: &ConflictNotice) {
        self.send(Signal::Conflict);
    }
}

async fn setup(
    store: &Arc<MemoryContentStore>,
    config: EngineConfig,
) -> (
    AutosaveSession,
    mpsc::UnboundedReceiver<(Signal, Duration)>,
    Instant,
) {
    let engine = Engine::new(store.clone(), config, None).await.unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    let origin = Instant::now();
    let session = engine.autosave_session(Some(Arc::new(ChannelListener { origin, tx })));
    (session, rx, origin)
}

// ---------------------------------------------------------------------------
// Debounce
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_three_edits_settle_into_one_write() {
    let store = Arc::new(MemoryContentStore::new());
    store.set_write_latency(Duration::from_millis(200));
    let (session, mut rx, origin) = setup(&store, EngineConfig::default()).await;

    session.schedule_save(1, json!({"body": "A"}), 9);
    sleep(Duration::from_millis(1000)).await;
    session.schedule_save(1, json!({"body": "B"}), 9);
    sleep(Duration::from_millis(1000)).await;
    session.schedule_save(1, json!({"body": "C"}), 9);

    sleep_until(origin + Duration::from_millis(4990)).await;
    assert_eq!(store.draft_write_count(), 0);
    assert!(!session.is_saving());
    assert!(session.has_pending_save());

    let (signal, at) = rx.recv().await.unwrap();
    assert_eq!(signal, Signal::Started);
    assert!(at >= Duration::from_millis(5000) && at < Duration::from_millis(5010));
    assert!(session.is_saving());
    assert!(!session.has_pending_save());

    let (signal, _) = rx.recv().await.unwrap();
    assert_eq!(signal, Signal::Completed(json!({"body": "C"})));
    sleep(Duration::from_millis(10)).await;
    assert!(!session.is_saving());

    sleep(Duration::from_secs(30)).await;
    let writes = store.draft_writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].content, json!({"body": "C"}));
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_save_now_cancels_pending_timer() {
    let store = Arc::new(MemoryContentStore::new());
    let (session, _rx, _) = setup(&store, EngineConfig::default()).await;

    session.schedule_save(1, json!("scheduled"), 9);
    sleep(Duration::from_millis(1000)).await;
    let outcome = session.save_now(1, json!("immediate"), 9).await;
    assert_matches!(outcome, SaveOutcome::Saved(_));
    assert!(!session.has_pending_save());

    sleep(Duration::from_secs(10)).await;
    let writes = store.draft_writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].content, json!("immediate"));
}

#[tokio::test(start_paused = true)]
async fn test_unchanged_content_is_never_rewritten() {
    let store = Arc::new(MemoryContentStore::new());
    let (session, _rx, _) = setup(&store, EngineConfig::default()).await;

    session.save_now(1, json!({"a": [1, 2], "b": null}), 9).await;
    session.schedule_save(1, json!({"b": null, "a": [1, 2]}), 9);
    sleep(Duration::from_secs(10)).await;

    assert_eq!(store.draft_write_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_custom_delay_is_honoured() {
    let store = Arc::new(MemoryContentStore::new());
    let config = EngineConfig::default().with_autosave_delay(Duration::from_millis(500));
    let (session, mut rx, _) = setup(&store, config).await;

    session.schedule_save(1, json!("x"), 9);
    let (signal, at) = rx.recv().await.unwrap();
    assert_eq!(signal, Signal::Started);
    assert!(at >= Duration::from_millis(500) && at < Duration::from_millis(510));
}

// ---------------------------------------------------------------------------
// Single flight
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_second_save_dropped_while_in_flight() {
    let store = Arc::new(MemoryContentStore::new());
    store.set_write_latency(Duration::from_millis(300));
    let (session, _rx, _) = setup(&store, EngineConfig::default()).await;

    let (first, second) = tokio::join!(
        session.save_now(1, json!("first"), 9),
        session.save_now(1, json!("second"), 9),
    );
    assert_matches!(first, SaveOutcome::Saved(_));
    assert_matches!(second, SaveOutcome::SkippedInFlight);
    assert_eq!(store.draft_write_count(), 1);
    assert!(!session.is_saving());
}

// ---------------------------------------------------------------------------
// Failures and deadlines
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_failed_debounce_retries_same_content() {
    let store = Arc::new(MemoryContentStore::new());
    let (session, mut rx, _) = setup(&store, EngineConfig::default()).await;
    store.fail(StoreOp::UpsertDraft);

    session.schedule_save(1, json!("draft"), 9);
    assert_eq!(rx.recv().await.unwrap().0, Signal::Started);
    assert_eq!(rx.recv().await.unwrap().0, Signal::Failed);
    assert!(session.last_saved_content().is_none());

    store.recover(StoreOp::UpsertDraft);
    session.schedule_save(1, json!("draft"), 9);
    assert_eq!(rx.recv().await.unwrap().0, Signal::Started);
    assert_eq!(rx.recv().await.unwrap().0, Signal::Completed(json!("draft")));
    assert_eq!(store.draft(1).unwrap().content, json!("draft"));
}

#[tokio::test(start_paused = true)]
async fn test_stuck_store_hits_deadline() {
    let store = Arc::new(MemoryContentStore::new());
    store.set_write_latency(Duration::from_secs(60));
    let config = EngineConfig::default().with_store_timeout(Duration::from_millis(250));
    let (session, _rx, _) = setup(&store, config).await;

    let outcome = session.save_now(1, json!("x"), 9).await;
    assert_matches!(outcome, SaveOutcome::Failed(EngineError::Timeout { operation: "upsert_draft" }));
    assert!(!session.is_saving());
    assert_eq!(store.draft_write_count(), 0);
}

// ---------------------------------------------------------------------------
// Conflicts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_external_edit_raises_conflict_then_overwrites() {
    let store = Arc::new(MemoryContentStore::new());
    let (session, mut rx, _) = setup(&store, EngineConfig::default()).await;
    store.seed_draft(1, json!("other editor"), Some(2), chrono::Utc::now());

    session.save_now(1, json!("mine"), 9).await;

    assert_eq!(rx.recv().await.unwrap().0, Signal::Conflict);
    assert_eq!(rx.recv().await.unwrap().0, Signal::Started);
    assert_eq!(rx.recv().await.unwrap().0, Signal::Completed(json!("mine")));
    let draft = store.draft(1).unwrap();
    assert_eq!(draft.content, json!("mine"));
    assert_eq!(draft.updated_by, Some(9));
}

#[tokio::test]
async fn test_independent_sessions_keep_separate_caches() {
    let store = Arc::new(MemoryContentStore::new());
    let (first, _rx1, _) = setup(&store, EngineConfig::default()).await;
    let (second, _rx2, _) = setup(&store, EngineConfig::default()).await;

    first.save_now(1, json!("shared"), 9).await;
    assert_matches!(second.save_now(2, json!("shared"), 9).await, SaveOutcome::Saved(_));
    assert!(first.last_saved_content().is_some());
    assert!(second.last_saved_content().is_some());
    assert_eq!(store.draft_write_count(), 2);
}
