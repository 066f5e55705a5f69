//! Numbered, retention-bounded version history per section.
//!
//! Versions are created either by the store's atomic procedure (number,
//! insert and prune in one server-side call) or by the client-driven
//! sequence `max -> insert -> prune`. The strategy is picked once when the
//! [`VersionStore`] is built. The client sequence relies on the store
//! rejecting a duplicate `(unit, version_number)`; a rejected insert re-reads
//! the maximum and retries up to [`MAX_VERSION_INSERT_ATTEMPTS`] times.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use folio_core::types::{Content, DbId};
use folio_core::versioning::{
    ids_to_prune, next_version_number, validate_retention, MAX_VERSION_INSERT_ATTEMPTS,
    UNKNOWN_CREATOR_LABEL,
};
use folio_db::models::section_version::{
    CreateSectionVersion, SectionVersion, VersionHistoryEntry,
};
use folio_events::{event_types, ContentEvent, EventBus};
use serde_json::json;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::store::{with_deadline, ContentStore};

/// How new version numbers are assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionStrategy {
    /// Single server-side procedure.
    Atomic,
    /// Read max, insert with compare-and-swap on the number, then prune.
    ClientSequence,
}

impl VersionStrategy {
    /// One-time capability check. A failing probe selects the client
    /// sequence.
    pub async fn detect(store: &dyn ContentStore) -> Self {
        match store.supports_atomic_versioning().await {
            Ok(true) => Self::Atomic,
            Ok(false) => Self::ClientSequence,
            Err(e) => {
                tracing::warn!(error = %e, "Version capability probe failed, using client sequence");
                Self::ClientSequence
            }
        }
    }
}

pub struct VersionStore {
    store: Arc<dyn ContentStore>,
    retention: usize,
    deadline: Option<Duration>,
    atomic: AtomicBool,
    bus: Option<Arc<EventBus>>,
}

impl VersionStore {
    /// Build a version store, probing the backend for atomic creation.
    pub async fn new(store: Arc<dyn ContentStore>, config: &EngineConfig) -> EngineResult<Self> {
        let strategy = VersionStrategy::detect(store.as_ref()).await;
        Self::with_strategy(store, config, strategy)
    }

    pub fn with_strategy(
        store: Arc<dyn ContentStore>,
        config: &EngineConfig,
        strategy: VersionStrategy,
    ) -> EngineResult<Self> {
        validate_retention(config.version_retention)?;
        tracing::info!(
            ?strategy,
            retention = config.version_retention,
            "Version store ready"
        );
        Ok(Self {
            store,
            retention: config.version_retention,
            deadline: config.store_timeout,
            atomic: AtomicBool::new(strategy == VersionStrategy::Atomic),
            bus: None,
        })
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Current strategy. Downgrades to `ClientSequence` permanently if the
    /// atomic procedure turns out to be unavailable.
    pub fn strategy(&self) -> VersionStrategy {
        if self.atomic.load(Ordering::Acquire) {
            VersionStrategy::Atomic
        } else {
            VersionStrategy::ClientSequence
        }
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    /// Snapshot `content` as the next version of `unit_id` and prune
    /// versions beyond the retention window.
    pub async fn create_version(
        &self,
        unit_id: DbId,
        content: &Content,
        actor: DbId,
    ) -> EngineResult<SectionVersion> {
        if self.strategy() == VersionStrategy::Atomic {
            let result = with_deadline(
                self.deadline,
                "create_version_atomic",
                self.store
                    .create_version_atomic(unit_id, content, actor, self.retention),
            )
            .await;
            match result {
                Ok(version) => {
                    self.version_created(&version, actor);
                    return Ok(version);
                }
                Err(EngineError::Unsupported(reason)) => {
                    tracing::warn!(
                        unit_id,
                        %reason,
                        "Atomic version creation unavailable, switching to client sequence",
                    );
                    self.atomic.store(false, Ordering::Release);
                }
                Err(e) => return Err(e),
            }
        }

        let version = self.insert_next(unit_id, content, actor).await?;
        if let Err(e) = self.enforce_retention(unit_id).await {
            tracing::warn!(unit_id, error = %e, "Retention pruning failed after version insert");
        }
        self.version_created(&version, actor);
        Ok(version)
    }

    async fn insert_next(
        &self,
        unit_id: DbId,
        content: &Content,
        actor: DbId,
    ) -> EngineResult<SectionVersion> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let current = with_deadline(
                self.deadline,
                "max_version_number",
                self.store.max_version_number(unit_id),
            )
            .await?;
            let input = CreateSectionVersion {
                section_id: unit_id,
                version_number: next_version_number(current)?,
                content: content.clone(),
                created_by: actor,
            };

            match with_deadline(self.deadline, "insert_version", self.store.insert_version(&input))
                .await
            {
                Ok(version) => return Ok(version),
                Err(EngineError::DuplicateVersion { version_number, .. })
                    if attempt < MAX_VERSION_INSERT_ATTEMPTS =>
                {
                    tracing::debug!(
                        unit_id,
                        version_number,
                        attempt,
                        "Version number taken by a concurrent creator, retrying",
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn version_created(&self, version: &SectionVersion, actor: DbId) {
        tracing::info!(
            unit_id = version.section_id,
            version_id = version.id,
            version_number = version.version_number,
            "Version created",
        );
        if let Some(bus) = &self.bus {
            bus.publish(
                ContentEvent::new(event_types::VERSION_CREATED)
                    .with_source("section", version.section_id)
                    .with_actor(actor)
                    .with_payload(json!({
                        "version_id": version.id,
                        "version_number": version.version_number,
                    })),
            );
        }
    }

    // -----------------------------------------------------------------------
    // Retention
    // -----------------------------------------------------------------------

    /// Delete every version of `unit_id` outside the retention window.
    /// Returns the number of versions removed.
    pub async fn enforce_retention(&self, unit_id: DbId) -> EngineResult<u64> {
        let versions = with_deadline(
            self.deadline,
            "list_versions",
            self.store.list_versions(unit_id, None),
        )
        .await?;
        let pairs: Vec<(DbId, i32)> = versions
            .iter()
            .map(|v| (v.id, v.version_number))
            .collect();
        let surplus = ids_to_prune(&pairs, self.retention);
        if surplus.is_empty() {
            return Ok(0);
        }

        let removed = with_deadline(
            self.deadline,
            "delete_versions",
            self.store.delete_versions(&surplus),
        )
        .await?;
        tracing::debug!(unit_id, removed, "Pruned versions beyond retention");
        Ok(removed)
    }

    /// Units currently holding more versions than the retention window.
    pub async fn units_over_retention(&self) -> EngineResult<Vec<DbId>> {
        with_deadline(
            self.deadline,
            "list_units_over_retention",
            self.store.list_units_over_retention(self.retention),
        )
        .await
    }

    // -----------------------------------------------------------------------
    // Reads and deletes
    // -----------------------------------------------------------------------

    /// At most `retention` versions, newest first, each labelled with its
    /// creator. Label lookup is best-effort.
    pub async fn get_version_history(&self, unit_id: DbId) -> EngineResult<Vec<VersionHistoryEntry>> {
        let limit = i64::try_from(self.retention).unwrap_or(i64::MAX);
        let versions = with_deadline(
            self.deadline,
            "list_versions",
            self.store.list_versions(unit_id, Some(limit)),
        )
        .await?;

        let mut creator_ids: Vec<DbId> = versions.iter().filter_map(|v| v.created_by).collect();
        creator_ids.sort_unstable();
        creator_ids.dedup();

        let labels: HashMap<DbId, String> = if creator_ids.is_empty() {
            HashMap::new()
        } else {
            match with_deadline(
                self.deadline,
                "creator_profiles",
                self.store.creator_profiles(&creator_ids),
            )
            .await
            {
                Ok(profiles) => profiles.into_iter().map(|p| (p.id, p.label())).collect(),
                Err(e) => {
                    tracing::warn!(unit_id, error = %e, "Creator lookup failed, using fallback labels");
                    HashMap::new()
                }
            }
        };

        Ok(versions
            .into_iter()
            .map(|version| {
                let created_by_name = version
                    .created_by
                    .and_then(|id| labels.get(&id).cloned())
                    .unwrap_or_else(|| UNKNOWN_CREATOR_LABEL.to_string());
                VersionHistoryEntry {
                    version,
                    created_by_name,
                }
            })
            .collect())
    }

    /// `Ok(None)` when the version does not exist.
    pub async fn get_version(&self, version_id: DbId) -> EngineResult<Option<SectionVersion>> {
        with_deadline(
            self.deadline,
            "get_version_by_id",
            self.store.get_version_by_id(version_id),
        )
        .await
    }

    /// Remove one version unconditionally. Returns `false` if it did not
    /// exist.
    pub async fn delete_version(&self, version_id: DbId) -> EngineResult<bool> {
        let removed = with_deadline(
            self.deadline,
            "delete_versions",
            self.store.delete_versions(&[version_id]),
        )
        .await?;
        if removed == 0 {
            return Ok(false);
        }

        tracing::info!(version_id, "Version deleted");
        if let Some(bus) = &self.bus {
            bus.publish(
                ContentEvent::new(event_types::VERSION_DELETED)
                    .with_payload(json!({ "version_id": version_id })),
            );
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::store::{MemoryContentStore, StoreOp};

    async fn version_store(store: &Arc<MemoryContentStore>) -> VersionStore {
        let store: Arc<dyn ContentStore> = store.clone();
        VersionStore::new(store, &EngineConfig::default()).await.unwrap()
    }

    // -----------------------------------------------------------------------
    // Strategy
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_strategy_detection() {
        let plain = Arc::new(MemoryContentStore::new());
        assert_eq!(
            version_store(&plain).await.strategy(),
            VersionStrategy::ClientSequence
        );

        let atomic = Arc::new(MemoryContentStore::with_atomic_versioning());
        assert_eq!(version_store(&atomic).await.strategy(), VersionStrategy::Atomic);
    }

    #[tokio::test]
    async fn test_zero_retention_rejected() {
        let store: Arc<dyn ContentStore> = Arc::new(MemoryContentStore::new());
        let config = EngineConfig::default().with_version_retention(0);
        let result = VersionStore::new(store, &config).await;
        assert_matches!(result.err(), Some(EngineError::Core(_)));
    }

    // -----------------------------------------------------------------------
    // Client sequence
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_duplicate_number_is_retried() {
        let store = Arc::new(MemoryContentStore::new());
        let versions = version_store(&store).await;
        store.race_next_version_inserts(1);

        let created = versions.create_version(1, &json!("mine"), 9).await.unwrap();
        assert_eq!(created.version_number, 2);
        assert_eq!(store.versions_of(1).len(), 2);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let store = Arc::new(MemoryContentStore::new());
        let versions = version_store(&store).await;
        store.race_next_version_inserts(MAX_VERSION_INSERT_ATTEMPTS);

        let err = versions.create_version(1, &json!("mine"), 9).await.unwrap_err();
        assert_matches!(err, EngineError::DuplicateVersion { unit_id: 1, .. });
    }

    #[tokio::test]
    async fn test_prune_failure_does_not_fail_creation() {
        let store = Arc::new(MemoryContentStore::new());
        let versions = version_store(&store).await;
        for n in 0..5 {
            versions.create_version(1, &json!(n), 9).await.unwrap();
        }
        store.fail(StoreOp::DeleteVersions);

        let created = versions.create_version(1, &json!(5), 9).await.unwrap();
        assert_eq!(created.version_number, 6);
        assert_eq!(store.versions_of(1).len(), 6);

        store.recover(StoreOp::DeleteVersions);
        assert_eq!(versions.units_over_retention().await.unwrap(), vec![1]);
        assert_eq!(versions.enforce_retention(1).await.unwrap(), 1);
        assert!(versions.units_over_retention().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_exhausted_numbering_fails_without_insert() {
        let store = Arc::new(MemoryContentStore::new());
        store
            .insert_version(&CreateSectionVersion {
                section_id: 1,
                version_number: i32::MAX,
                content: json!("last"),
                created_by: 9,
            })
            .await
            .unwrap();
        let versions = version_store(&store).await;

        let err = versions.create_version(1, &json!("next"), 9).await.unwrap_err();
        assert_matches!(err, EngineError::Core(_));
        assert_eq!(store.versions_of(1).len(), 1);
    }

    // -----------------------------------------------------------------------
    // Atomic path
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_atomic_unsupported_downgrades_once() {
        let store = Arc::new(MemoryContentStore::with_atomic_versioning());
        let versions = version_store(&store).await;
        store.uninstall_atomic_versioning();

        let first = versions.create_version(1, &json!("a"), 9).await.unwrap();
        assert_eq!(first.version_number, 1);
        assert_eq!(versions.strategy(), VersionStrategy::ClientSequence);

        let second = versions.create_version(1, &json!("b"), 9).await.unwrap();
        assert_eq!(second.version_number, 2);
    }

    #[tokio::test]
    async fn test_atomic_failure_is_not_downgraded() {
        let store = Arc::new(MemoryContentStore::with_atomic_versioning());
        let versions = version_store(&store).await;
        store.fail(StoreOp::CreateVersionAtomic);

        let err = versions.create_version(1, &json!("a"), 9).await.unwrap_err();
        assert_matches!(err, EngineError::StoreUnavailable(_));
        assert_eq!(versions.strategy(), VersionStrategy::Atomic);
        assert!(store.versions_of(1).is_empty());
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_history_labels_fall_back_to_unknown() {
        let store = Arc::new(MemoryContentStore::new());
        let versions = version_store(&store).await;
        let named = store.add_profile(Some("Grace Hopper"), None);
        let emailed = store.add_profile(None, Some("ada@example.com"));

        versions.create_version(1, &json!(1), named).await.unwrap();
        versions.create_version(1, &json!(2), emailed).await.unwrap();
        versions.create_version(1, &json!(3), 4242).await.unwrap();

        let history = versions.get_version_history(1).await.unwrap();
        let labels: Vec<&str> = history.iter().map(|e| e.created_by_name.as_str()).collect();
        assert_eq!(labels, vec!["Unknown", "ada@example.com", "Grace Hopper"]);

        store.fail(StoreOp::CreatorProfiles);
        let history = versions.get_version_history(1).await.unwrap();
        assert!(history.iter().all(|e| e.created_by_name == UNKNOWN_CREATOR_LABEL));
    }

    #[tokio::test]
    async fn test_get_and_delete_version() {
        let store = Arc::new(MemoryContentStore::new());
        let versions = version_store(&store).await;
        let created = versions.create_version(1, &json!("x"), 9).await.unwrap();

        assert_eq!(versions.get_version(created.id).await.unwrap(), Some(created.clone()));
        assert!(versions.delete_version(created.id).await.unwrap());
        assert!(versions.get_version(created.id).await.unwrap().is_none());
        assert!(!versions.delete_version(created.id).await.unwrap());
    }
}
