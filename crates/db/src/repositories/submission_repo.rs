//! Repository for result publication on `assignment_submissions` and
//! `quiz_submissions`.
//!
//! Both tables share the same publication columns; the submission kind picks
//! the table and the assessment foreign key column.

use folio_core::publication::{ResultStatus, SubmissionKind};
use folio_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::submission::{CreateSubmission, SubmissionResult, SubmissionTarget};

/// Provides status updates and status reads for graded submissions.
pub struct SubmissionRepo;

impl SubmissionRepo {
    /// Insert a submission row, returning it.
    pub async fn create(
        pool: &PgPool,
        kind: SubmissionKind,
        input: &CreateSubmission,
    ) -> Result<SubmissionResult, sqlx::Error> {
        let table = kind.table_name();
        let fk = kind.assessment_column();
        let query = format!(
            "INSERT INTO {table} ({fk}, student_id, result_status, graded_at)
             VALUES ($1, $2, $3, $4)
             RETURNING id, {fk} AS assessment_id, result_status, published_at, graded_at"
        );
        sqlx::query_as::<_, SubmissionResult>(&query)
            .bind(input.assessment_id)
            .bind(input.student_id)
            .bind(&input.result_status)
            .bind(input.graded_at)
            .fetch_one(pool)
            .await
    }

    /// Find a submission by primary key.
    pub async fn find_by_id(
        pool: &PgPool,
        kind: SubmissionKind,
        id: DbId,
    ) -> Result<Option<SubmissionResult>, sqlx::Error> {
        let table = kind.table_name();
        let fk = kind.assessment_column();
        let query = format!(
            "SELECT id, {fk} AS assessment_id, result_status, published_at, graded_at
             FROM {table} WHERE id = $1"
        );
        sqlx::query_as::<_, SubmissionResult>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Set `result_status` on the targeted submissions.
    ///
    /// `published_at` is only overwritten when provided. Bulk targets only
    /// touch graded rows (`graded_at IS NOT NULL`). Returns rows affected.
    pub async fn update_status(
        pool: &PgPool,
        kind: SubmissionKind,
        target: SubmissionTarget,
        status: ResultStatus,
        published_at: Option<Timestamp>,
    ) -> Result<u64, sqlx::Error> {
        let table = kind.table_name();
        let (filter, id) = match target {
            SubmissionTarget::One(id) => ("id = $1".to_string(), id),
            SubmissionTarget::GradedOf(assessment_id) => (
                format!("{} = $1 AND graded_at IS NOT NULL", kind.assessment_column()),
                assessment_id,
            ),
        };
        let query = format!(
            "UPDATE {table} SET
                result_status = $2,
                published_at = COALESCE($3, published_at),
                updated_at = NOW()
             WHERE {filter}"
        );
        let result = sqlx::query(&query)
            .bind(id)
            .bind(status.as_str())
            .bind(published_at)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Raw `result_status` values of every graded submission of an assessment.
    pub async fn list_graded_statuses(
        pool: &PgPool,
        kind: SubmissionKind,
        assessment_id: DbId,
    ) -> Result<Vec<Option<String>>, sqlx::Error> {
        let query = format!(
            "SELECT result_status FROM {} WHERE {} = $1 AND graded_at IS NOT NULL",
            kind.table_name(),
            kind.assessment_column()
        );
        let rows: Vec<(Option<String>,)> = sqlx::query_as(&query)
            .bind(assessment_id)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }
}
