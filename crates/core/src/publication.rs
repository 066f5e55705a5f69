//! Result publication statuses for graded submissions.
//!
//! Graded assignment and quiz submissions move through
//! `draft -> reviewed -> published`. Transitions are not restricted: any
//! status may be set directly from any other.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// ResultStatus
// ---------------------------------------------------------------------------

/// Publication status of a submission result, stored in `result_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Draft,
    Reviewed,
    Published,
}

impl ResultStatus {
    /// All statuses in pipeline order.
    pub const ALL: [ResultStatus; 3] = [Self::Draft, Self::Reviewed, Self::Published];

    /// Column value for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Reviewed => "reviewed",
            Self::Published => "published",
        }
    }

    /// Whether moving to this status stamps `published_at`.
    pub fn stamps_published_at(self) -> bool {
        matches!(self, Self::Published)
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "reviewed" => Ok(Self::Reviewed),
            "published" => Ok(Self::Published),
            other => Err(CoreError::Validation(format!(
                "Invalid result status '{other}'. Must be one of: draft, reviewed, published"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// SubmissionKind
// ---------------------------------------------------------------------------

/// Which kind of assessment a submission belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionKind {
    Assignment,
    Quiz,
}

impl SubmissionKind {
    /// Table holding submissions of this kind.
    pub fn table_name(self) -> &'static str {
        match self {
            Self::Assignment => "assignment_submissions",
            Self::Quiz => "quiz_submissions",
        }
    }

    /// Foreign key column pointing at the parent assessment.
    pub fn assessment_column(self) -> &'static str {
        match self {
            Self::Assignment => "assignment_id",
            Self::Quiz => "quiz_id",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Assignment => "assignment",
            Self::Quiz => "quiz",
        }
    }
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

/// Tally of graded submissions per publication status.
///
/// `total` counts every graded submission, including those whose status is
/// unset or unrecognised and therefore not counted in any named bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub draft: u64,
    pub reviewed: u64,
    pub published: u64,
    pub total: u64,
}

impl StatusSummary {
    /// Build a summary from raw `result_status` column values.
    pub fn tally<I, S>(statuses: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: AsRef<str>,
    {
        let mut summary = Self::default();
        for raw in statuses {
            summary.total += 1;
            let parsed = raw.as_ref().map(|s| {
                let value: &str = s.as_ref();
                value.parse::<ResultStatus>()
            });
            match parsed {
                Some(Ok(ResultStatus::Draft)) => summary.draft += 1,
                Some(Ok(ResultStatus::Reviewed)) => summary.reviewed += 1,
                Some(Ok(ResultStatus::Published)) => summary.published += 1,
                Some(Err(_)) | None => {}
            }
        }
        summary
    }

    /// Submissions not counted in any named bucket.
    pub fn unclassified(&self) -> u64 {
        self.total - self.draft - self.reviewed - self.published
    }
}

/// Outcome of a bulk status change.
///
/// A bulk change is a single filtered write, so `failed` is either 0 (with
/// `success` = rows changed) or 1 (with `success` = 0).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkPublishResult {
    pub success: u64,
    pub failed: u64,
}

impl BulkPublishResult {
    pub fn applied(rows: u64) -> Self {
        Self { success: rows, failed: 0 }
    }

    pub fn failed() -> Self {
        Self { success: 0, failed: 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // ResultStatus
    // -----------------------------------------------------------------------

    #[test]
    fn test_status_parse_round_trip() {
        for status in ResultStatus::ALL {
            assert_eq!(status.as_str().parse::<ResultStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_invalid_status_rejected() {
        let err = "archived".parse::<ResultStatus>().unwrap_err();
        assert!(err.to_string().contains("archived"));
        assert!("Published".parse::<ResultStatus>().is_err());
        assert!("".parse::<ResultStatus>().is_err());
    }

    #[test]
    fn test_only_published_stamps_timestamp() {
        assert!(ResultStatus::Published.stamps_published_at());
        assert!(!ResultStatus::Reviewed.stamps_published_at());
        assert!(!ResultStatus::Draft.stamps_published_at());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&ResultStatus::Reviewed).unwrap();
        assert_eq!(json, r#""reviewed""#);
    }

    // -----------------------------------------------------------------------
    // SubmissionKind
    // -----------------------------------------------------------------------

    #[test]
    fn test_submission_kind_tables() {
        assert_eq!(SubmissionKind::Assignment.table_name(), "assignment_submissions");
        assert_eq!(SubmissionKind::Assignment.assessment_column(), "assignment_id");
        assert_eq!(SubmissionKind::Quiz.table_name(), "quiz_submissions");
        assert_eq!(SubmissionKind::Quiz.assessment_column(), "quiz_id");
    }

    // -----------------------------------------------------------------------
    // StatusSummary
    // -----------------------------------------------------------------------

    #[test]
    fn test_tally_four_three_three() {
        let mut statuses: Vec<Option<&str>> = Vec::new();
        statuses.extend(std::iter::repeat(Some("draft")).take(4));
        statuses.extend(std::iter::repeat(Some("reviewed")).take(3));
        statuses.extend(std::iter::repeat(Some("published")).take(3));

        let summary = StatusSummary::tally(statuses);
        assert_eq!(
            summary,
            StatusSummary { draft: 4, reviewed: 3, published: 3, total: 10 }
        );
    }

    #[test]
    fn test_tally_unset_and_unknown_only_in_total() {
        let summary = StatusSummary::tally(vec![None, Some("bogus"), Some("draft")]);
        assert_eq!(summary.draft, 1);
        assert_eq!(summary.reviewed, 0);
        assert_eq!(summary.published, 0);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.unclassified(), 2);
    }

    #[test]
    fn test_tally_empty() {
        let summary = StatusSummary::tally(Vec::<Option<String>>::new());
        assert_eq!(summary, StatusSummary::default());
    }

    #[test]
    fn test_bulk_result_constructors() {
        assert_eq!(BulkPublishResult::applied(7), BulkPublishResult { success: 7, failed: 0 });
        assert_eq!(BulkPublishResult::failed(), BulkPublishResult { success: 0, failed: 1 });
    }
}
