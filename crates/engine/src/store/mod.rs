//! Persistence boundary of the engine.
//!
//! The engine services operate exclusively through [`ContentStore`], so the
//! same scheduling, versioning and publication logic runs against
//! PostgreSQL ([`PgContentStore`]) or in memory ([`MemoryContentStore`]).

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use folio_core::publication::{ResultStatus, SubmissionKind};
use folio_core::types::{Content, DbId, Timestamp};
use folio_db::models::profile::CreatorProfile;
use folio_db::models::section_draft::{SectionDraft, UpsertSectionDraft};
use folio_db::models::section_version::{CreateSectionVersion, SectionVersion};
use folio_db::models::submission::SubmissionTarget;

use crate::error::{EngineError, EngineResult};

pub mod memory;
pub mod postgres;

pub use memory::{MemoryContentStore, StoreOp};
pub use postgres::PgContentStore;

/// Persistence operations required by the engine.
#[async_trait]
pub trait ContentStore: Send + Sync {
    // ── Drafts ──

    /// Insert or replace the draft keyed by `input.section_id`.
    async fn upsert_draft(&self, input: &UpsertSectionDraft) -> EngineResult<SectionDraft>;
    async fn read_draft(&self, unit_id: DbId) -> EngineResult<Option<SectionDraft>>;
    async fn delete_draft(&self, unit_id: DbId) -> EngineResult<bool>;

    // ── Versions ──

    async fn max_version_number(&self, unit_id: DbId) -> EngineResult<Option<i32>>;

    /// Insert a version with an explicit number. Fails with
    /// [`EngineError::DuplicateVersion`] if the number is taken.
    async fn insert_version(&self, input: &CreateSectionVersion) -> EngineResult<SectionVersion>;

    /// Versions of a unit ordered by number, newest first.
    async fn list_versions(
        &self,
        unit_id: DbId,
        limit: Option<i64>,
    ) -> EngineResult<Vec<SectionVersion>>;

    async fn delete_versions(&self, ids: &[DbId]) -> EngineResult<u64>;
    async fn get_version_by_id(&self, id: DbId) -> EngineResult<Option<SectionVersion>>;

    /// Units holding more than `retention` versions.
    async fn list_units_over_retention(&self, retention: usize) -> EngineResult<Vec<DbId>>;

    /// Whether [`create_version_atomic`](Self::create_version_atomic) is
    /// available. Checked once when the version store is built.
    async fn supports_atomic_versioning(&self) -> EngineResult<bool> {
        Ok(false)
    }

    /// Number, insert and prune in a single atomic store operation.
    async fn create_version_atomic(
        &self,
        _unit_id: DbId,
        _content: &Content,
        _actor: DbId,
        _retention: usize,
    ) -> EngineResult<SectionVersion> {
        Err(EngineError::Unsupported(
            "atomic version creation is not available".to_string(),
        ))
    }

    // ── Profiles ──

    async fn creator_profiles(&self, ids: &[DbId]) -> EngineResult<Vec<CreatorProfile>>;

    // ── Live sections ──

    async fn read_section_content(&self, unit_id: DbId) -> EngineResult<Option<Content>>;

    /// Replace the live content of a section. Returns `false` if the section
    /// does not exist.
    async fn publish_section_content(
        &self,
        unit_id: DbId,
        content: &Content,
        actor: DbId,
        at: Timestamp,
    ) -> EngineResult<bool>;

    // ── Submissions ──

    /// Set the result status of the targeted submissions; returns rows
    /// affected. Bulk targets only match graded submissions.
    async fn update_submission_status(
        &self,
        kind: SubmissionKind,
        target: SubmissionTarget,
        status: ResultStatus,
        published_at: Option<Timestamp>,
    ) -> EngineResult<u64>;

    /// Raw status values of every graded submission of an assessment.
    async fn read_submission_statuses(
        &self,
        kind: SubmissionKind,
        assessment_id: DbId,
    ) -> EngineResult<Vec<Option<String>>>;
}

/// Run a store call under an optional deadline.
pub async fn with_deadline<T, F>(
    deadline: Option<Duration>,
    operation: &'static str,
    call: F,
) -> EngineResult<T>
where
    F: Future<Output = EngineResult<T>>,
{
    match deadline {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| EngineError::Timeout { operation })?,
        None => call.await,
    }
}
