//! Folio content versioning and publication engine.
//!
//! This crate provides the editing-side services of the platform:
//!
//! - [`AutosaveSession`]: debounced, single-flight draft autosave with an
//!   advisory [`ConflictDetector`].
//! - [`VersionStore`]: numbered version history with a retention window.
//! - [`RollbackCoordinator`]: restore a draft from a version.
//! - [`PublishCoordinator`]: commit a draft to the live section.
//! - [`PublicationStateMachine`]: result status of graded submissions.
//!
//! Every service talks to persistence through the [`ContentStore`] trait.

pub mod autosave;
pub mod config;
pub mod conflict;
pub mod error;
pub mod publication;
pub mod publish;
pub mod rollback;
pub mod store;
pub mod versions;

use std::sync::Arc;

use folio_events::EventBus;

pub use autosave::{AutosaveListener, AutosaveSession, EventBusListener, NoopListener, SaveOutcome};
pub use config::EngineConfig;
pub use conflict::{ConflictDetector, ConflictNotice};
pub use error::{EngineError, EngineResult};
pub use publication::PublicationStateMachine;
pub use publish::PublishCoordinator;
pub use rollback::RollbackCoordinator;
pub use store::{ContentStore, MemoryContentStore, PgContentStore};
pub use versions::{VersionStore, VersionStrategy};

/// All engine services wired over one store.
///
/// Autosave sessions are created per edited unit with
/// [`autosave_session`](Engine::autosave_session); the other services are
/// shared.
pub struct Engine {
    store: Arc<dyn ContentStore>,
    config: EngineConfig,
    bus: Option<Arc<EventBus>>,
    versions: Arc<VersionStore>,
    rollback: RollbackCoordinator,
    publish: PublishCoordinator,
    publication: PublicationStateMachine,
}

impl Engine {
    /// Validate `config`, probe the store's capabilities and build the
    /// services. Events are published to `bus` when one is given.
    pub async fn new(
        store: Arc<dyn ContentStore>,
        config: EngineConfig,
        bus: Option<Arc<EventBus>>,
    ) -> EngineResult<Self> {
        config.validate()?;
        let deadline = config.store_timeout;

        let mut versions = VersionStore::new(Arc::clone(&store), &config).await?;
        let mut rollback = RollbackCoordinator::new(Arc::clone(&store), deadline);
        let mut publication = PublicationStateMachine::new(Arc::clone(&store), deadline);
        if let Some(bus) = &bus {
            versions = versions.with_event_bus(Arc::clone(bus));
            rollback = rollback.with_event_bus(Arc::clone(bus));
            publication = publication.with_event_bus(Arc::clone(bus));
        }
        let versions = Arc::new(versions);

        let mut publish =
            PublishCoordinator::new(Arc::clone(&store), Arc::clone(&versions), deadline);
        if let Some(bus) = &bus {
            publish = publish.with_event_bus(Arc::clone(bus));
        }

        Ok(Self {
            store,
            config,
            bus,
            versions,
            rollback,
            publish,
            publication,
        })
    }

    /// A fresh autosave session. Without an explicit listener, sessions of
    /// an engine with an event bus report to the bus.
    pub fn autosave_session(&self, listener: Option<Arc<dyn AutosaveListener>>) -> AutosaveSession {
        let listener: Arc<dyn AutosaveListener> = match (listener, &self.bus) {
            (Some(listener), _) => listener,
            (None, Some(bus)) => Arc::new(EventBusListener::new(Arc::clone(bus))),
            (None, None) => Arc::new(NoopListener),
        };
        AutosaveSession::new(Arc::clone(&self.store), &self.config, listener)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn versions(&self) -> &Arc<VersionStore> {
        &self.versions
    }

    pub fn rollback(&self) -> &RollbackCoordinator {
        &self.rollback
    }

    pub fn publisher(&self) -> &PublishCoordinator {
        &self.publish
    }

    pub fn publication(&self) -> &PublicationStateMachine {
        &self.publication
    }
}
