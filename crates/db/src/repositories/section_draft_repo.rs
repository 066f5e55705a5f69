//! Repository for the `page_section_drafts` table.

use folio_core::types::DbId;
use sqlx::PgPool;

use crate::models::section_draft::{SectionDraft, UpsertSectionDraft};

/// Column list for page_section_drafts queries.
const COLUMNS: &str = "id, section_id, content, status, updated_by, updated_at, created_at";

/// Provides upsert/read/delete for live drafts.
pub struct SectionDraftRepo;

impl SectionDraftRepo {
    /// Insert or replace the draft for a section. Atomic at the row level.
    pub async fn upsert(pool: &PgPool, input: &UpsertSectionDraft) -> Result<SectionDraft, sqlx::Error> {
        let query = format!(
            "INSERT INTO page_section_drafts (section_id, content, status, updated_by, updated_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT ON CONSTRAINT uq_page_section_drafts_section DO UPDATE SET
                content = EXCLUDED.content,
                status = EXCLUDED.status,
                updated_by = EXCLUDED.updated_by,
                updated_at = EXCLUDED.updated_at
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SectionDraft>(&query)
            .bind(input.section_id)
            .bind(&input.content)
            .bind(&input.status)
            .bind(input.updated_by)
            .bind(input.updated_at)
            .fetch_one(pool)
            .await
    }

    /// Find the live draft for a section, if any.
    pub async fn find_by_section(
        pool: &PgPool,
        section_id: DbId,
    ) -> Result<Option<SectionDraft>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM page_section_drafts WHERE section_id = $1");
        sqlx::query_as::<_, SectionDraft>(&query)
            .bind(section_id)
            .fetch_optional(pool)
            .await
    }

    /// Delete the draft for a section. Returns `true` if a row was removed.
    pub async fn delete_by_section(pool: &PgPool, section_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM page_section_drafts WHERE section_id = $1")
            .bind(section_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
