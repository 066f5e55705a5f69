//! [`ContentStore`] backed by PostgreSQL through the `folio-db` repositories.

use async_trait::async_trait;
use folio_core::publication::{ResultStatus, SubmissionKind};
use folio_core::types::{Content, DbId, Timestamp};
use folio_db::models::profile::CreatorProfile;
use folio_db::models::section_draft::{SectionDraft, UpsertSectionDraft};
use folio_db::models::section_version::{CreateSectionVersion, SectionVersion};
use folio_db::models::submission::SubmissionTarget;
use folio_db::repositories::{
    PageSectionRepo, ProfileRepo, SectionDraftRepo, SectionVersionRepo, SubmissionRepo,
};
use folio_db::DbPool;

use super::ContentStore;
use crate::error::{EngineError, EngineResult};

/// Constraint guarding `(section_id, version_number)` uniqueness.
const VERSION_NUMBER_CONSTRAINT: &str = "uq_page_section_versions_section_version";

/// PostgreSQL SQLSTATE for "undefined function".
const UNDEFINED_FUNCTION: &str = "42883";

/// Content store over a shared connection pool.
#[derive(Clone)]
pub struct PgContentStore {
    pool: DbPool,
}

impl PgContentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn retention_as_i32(retention: usize) -> EngineResult<i32> {
    i32::try_from(retention)
        .map_err(|_| EngineError::Validation(format!("Retention {retention} is out of range")))
}

#[async_trait]
impl ContentStore for PgContentStore {
    async fn upsert_draft(&self, input: &UpsertSectionDraft) -> EngineResult<SectionDraft> {
        Ok(SectionDraftRepo::upsert(&self.pool, input).await?)
    }

    async fn read_draft(&self, unit_id: DbId) -> EngineResult<Option<SectionDraft>> {
        Ok(SectionDraftRepo::find_by_section(&self.pool, unit_id).await?)
    }

    async fn delete_draft(&self, unit_id: DbId) -> EngineResult<bool> {
        Ok(SectionDraftRepo::delete_by_section(&self.pool, unit_id).await?)
    }

    async fn max_version_number(&self, unit_id: DbId) -> EngineResult<Option<i32>> {
        Ok(SectionVersionRepo::max_version_number(&self.pool, unit_id).await?)
    }

    async fn insert_version(&self, input: &CreateSectionVersion) -> EngineResult<SectionVersion> {
        SectionVersionRepo::create(&self.pool, input)
            .await
            .map_err(|err| match folio_db::unique_violation_constraint(&err) {
                Some(constraint) if constraint == VERSION_NUMBER_CONSTRAINT => {
                    EngineError::DuplicateVersion {
                        unit_id: input.section_id,
                        version_number: input.version_number,
                    }
                }
                _ => err.into(),
            })
    }

    async fn list_versions(
        &self,
        unit_id: DbId,
        limit: Option<i64>,
    ) -> EngineResult<Vec<SectionVersion>> {
        Ok(SectionVersionRepo::list_for_section(&self.pool, unit_id, limit).await?)
    }

    async fn delete_versions(&self, ids: &[DbId]) -> EngineResult<u64> {
        Ok(SectionVersionRepo::delete_by_ids(&self.pool, ids).await?)
    }

    async fn get_version_by_id(&self, id: DbId) -> EngineResult<Option<SectionVersion>> {
        Ok(SectionVersionRepo::find_by_id(&self.pool, id).await?)
    }

    async fn list_units_over_retention(&self, retention: usize) -> EngineResult<Vec<DbId>> {
        let retention = i64::from(retention_as_i32(retention)?);
        Ok(SectionVersionRepo::list_sections_over_retention(&self.pool, retention).await?)
    }

    async fn supports_atomic_versioning(&self) -> EngineResult<bool> {
        Ok(SectionVersionRepo::atomic_function_available(&self.pool).await?)
    }

    async fn create_version_atomic(
        &self,
        unit_id: DbId,
        content: &Content,
        actor: DbId,
        retention: usize,
    ) -> EngineResult<SectionVersion> {
        let retention = retention_as_i32(retention)?;
        SectionVersionRepo::create_atomic(&self.pool, unit_id, content, actor, retention)
            .await
            .map_err(|err| match &err {
                sqlx::Error::Database(db_err)
                    if db_err.code().as_deref() == Some(UNDEFINED_FUNCTION) =>
                {
                    EngineError::Unsupported(db_err.message().to_string())
                }
                _ => err.into(),
            })
    }

    async fn creator_profiles(&self, ids: &[DbId]) -> EngineResult<Vec<CreatorProfile>> {
        Ok(ProfileRepo::find_by_ids(&self.pool, ids).await?)
    }

    async fn read_section_content(&self, unit_id: DbId) -> EngineResult<Option<Content>> {
        Ok(PageSectionRepo::find_by_id(&self.pool, unit_id)
            .await?
            .map(|section| section.content))
    }

    async fn publish_section_content(
        &self,
        unit_id: DbId,
        content: &Content,
        actor: DbId,
        at: Timestamp,
    ) -> EngineResult<bool> {
        Ok(PageSectionRepo::publish_content(&self.pool, unit_id, content, actor, at).await?)
    }

    async fn update_submission_status(
        &self,
        kind: SubmissionKind,
        target: SubmissionTarget,
        status: ResultStatus,
        published_at: Option<Timestamp>,
    ) -> EngineResult<u64> {
        Ok(SubmissionRepo::update_status(&self.pool, kind, target, status, published_at).await?)
    }

    async fn read_submission_statuses(
        &self,
        kind: SubmissionKind,
        assessment_id: DbId,
    ) -> EngineResult<Vec<Option<String>>> {
        Ok(SubmissionRepo::list_graded_statuses(&self.pool, kind, assessment_id).await?)
    }
}
