//! Repository for the `page_sections` table.

use folio_core::types::{Content, DbId, Timestamp};
use sqlx::PgPool;

use crate::models::page_section::{CreatePageSection, PageSection};

/// Column list for page_sections queries.
const COLUMNS: &str = "id, section_key, content, published_at, published_by, created_at, updated_at";

/// Provides CRUD operations for live sections.
pub struct PageSectionRepo;

impl PageSectionRepo {
    /// Insert a new section, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreatePageSection) -> Result<PageSection, sqlx::Error> {
        let query = format!(
            "INSERT INTO page_sections (section_key, content)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PageSection>(&query)
            .bind(&input.section_key)
            .bind(&input.content)
            .fetch_one(pool)
            .await
    }

    /// Find a section by its primary key.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<PageSection>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM page_sections WHERE id = $1");
        sqlx::query_as::<_, PageSection>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Replace the live content of a section and stamp publication metadata.
    ///
    /// Returns `true` if the section exists.
    pub async fn publish_content(
        pool: &PgPool,
        id: DbId,
        content: &Content,
        published_by: DbId,
        published_at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE page_sections SET
                content = $2,
                published_at = $4,
                published_by = $3,
                updated_at = $4
             WHERE id = $1",
        )
        .bind(id)
        .bind(content)
        .bind(published_by)
        .bind(published_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
