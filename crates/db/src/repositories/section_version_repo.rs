//! Repository for the `page_section_versions` table.
//!
//! Offers both the primitive steps of client-driven version creation
//! (max number, insert, prune) and the single-call atomic path backed by the
//! `create_section_version` SQL function.

use folio_core::types::{Content, DbId};
use sqlx::PgPool;

use crate::models::section_version::{CreateSectionVersion, SectionVersion};

/// Column list for page_section_versions queries.
const COLUMNS: &str = "id, section_id, version_number, content, created_by, created_at";

/// Name of the server-side atomic creation function.
pub const CREATE_VERSION_FUNCTION: &str = "create_section_version";

/// Provides versioning operations for sections.
pub struct SectionVersionRepo;

impl SectionVersionRepo {
    /// Highest version number for a section, or `None` if it has no versions.
    pub async fn max_version_number(
        pool: &PgPool,
        section_id: DbId,
    ) -> Result<Option<i32>, sqlx::Error> {
        let row: (Option<i32>,) = sqlx::query_as(
            "SELECT MAX(version_number) FROM page_section_versions WHERE section_id = $1",
        )
        .bind(section_id)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// Insert a version with an explicit number.
    ///
    /// Fails with a unique violation on `uq_page_section_versions_section_version`
    /// if the number is already taken.
    pub async fn create(
        pool: &PgPool,
        input: &CreateSectionVersion,
    ) -> Result<SectionVersion, sqlx::Error> {
        let query = format!(
            "INSERT INTO page_section_versions (section_id, version_number, content, created_by)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SectionVersion>(&query)
            .bind(input.section_id)
            .bind(input.version_number)
            .bind(&input.content)
            .bind(input.created_by)
            .fetch_one(pool)
            .await
    }

    /// Create a version through the atomic SQL function (number, insert and
    /// prune in one statement).
    pub async fn create_atomic(
        pool: &PgPool,
        section_id: DbId,
        content: &Content,
        created_by: DbId,
        retention: i32,
    ) -> Result<SectionVersion, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM {CREATE_VERSION_FUNCTION}($1, $2, $3, $4)"
        );
        sqlx::query_as::<_, SectionVersion>(&query)
            .bind(section_id)
            .bind(content)
            .bind(created_by)
            .bind(retention)
            .fetch_one(pool)
            .await
    }

    /// Whether the atomic creation function is installed.
    pub async fn atomic_function_available(pool: &PgPool) -> Result<bool, sqlx::Error> {
        let row: (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM pg_proc WHERE proname = $1)")
                .bind(CREATE_VERSION_FUNCTION)
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }

    /// Find a version by its primary key.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<SectionVersion>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM page_section_versions WHERE id = $1");
        sqlx::query_as::<_, SectionVersion>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List versions for a section, newest (highest number) first.
    ///
    /// `limit = None` returns every version.
    pub async fn list_for_section(
        pool: &PgPool,
        section_id: DbId,
        limit: Option<i64>,
    ) -> Result<Vec<SectionVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM page_section_versions
             WHERE section_id = $1
             ORDER BY version_number DESC
             LIMIT $2"
        );
        sqlx::query_as::<_, SectionVersion>(&query)
            .bind(section_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Delete a set of versions. Returns the number of rows removed.
    pub async fn delete_by_ids(pool: &PgPool, ids: &[DbId]) -> Result<u64, sqlx::Error> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM page_section_versions WHERE id = ANY($1)")
            .bind(ids)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Sections holding more than `retention` versions.
    pub async fn list_sections_over_retention(
        pool: &PgPool,
        retention: i64,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let rows: Vec<(DbId,)> = sqlx::query_as(
            "SELECT section_id FROM page_section_versions
             GROUP BY section_id
             HAVING COUNT(*) > $1
             ORDER BY section_id",
        )
        .bind(retention)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }
}
