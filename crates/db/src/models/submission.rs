//! Graded submission result models (assignments and quizzes).

use folio_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Publication-relevant columns of an assignment or quiz submission.
///
/// `assessment_id` is selected from `assignment_id` or `quiz_id` depending
/// on the submission kind.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct SubmissionResult {
    pub id: DbId,
    pub assessment_id: DbId,
    pub result_status: Option<String>,
    pub published_at: Option<Timestamp>,
    pub graded_at: Option<Timestamp>,
}

/// Which submissions a status update applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionTarget {
    /// A single submission by primary key.
    One(DbId),
    /// Every graded submission of an assessment.
    GradedOf(DbId),
}

/// DTO for creating a submission row (learner submission, optional grade).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubmission {
    pub assessment_id: DbId,
    pub student_id: Option<DbId>,
    pub result_status: Option<String>,
    pub graded_at: Option<Timestamp>,
}
