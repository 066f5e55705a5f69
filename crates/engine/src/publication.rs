//! Result publication for graded assignment and quiz submissions.
//!
//! Any status can be set from any other. Moving to `published` stamps
//! `published_at`; other moves leave an existing stamp in place.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use folio_core::publication::{BulkPublishResult, ResultStatus, StatusSummary, SubmissionKind};
use folio_core::types::DbId;
use folio_db::models::submission::SubmissionTarget;
use folio_events::{event_types, ContentEvent, EventBus};
use serde_json::json;

use crate::error::EngineResult;
use crate::store::{with_deadline, ContentStore};

pub struct PublicationStateMachine {
    store: Arc<dyn ContentStore>,
    deadline: Option<Duration>,
    bus: Option<Arc<EventBus>>,
}

impl PublicationStateMachine {
    pub fn new(store: Arc<dyn ContentStore>, deadline: Option<Duration>) -> Self {
        Self {
            store,
            deadline,
            bus: None,
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Set the status of one submission. Returns `false` if the submission
    /// does not exist or the write failed.
    pub async fn set_status(
        &self,
        kind: SubmissionKind,
        submission_id: DbId,
        status: ResultStatus,
    ) -> bool {
        let published_at = status.stamps_published_at().then(Utc::now);
        let result = with_deadline(
            self.deadline,
            "update_submission_status",
            self.store.update_submission_status(
                kind,
                SubmissionTarget::One(submission_id),
                status,
                published_at,
            ),
        )
        .await;

        match result {
            Ok(0) => {
                tracing::warn!(kind = kind.as_str(), submission_id, "Submission not found");
                false
            }
            Ok(_) => {
                tracing::info!(
                    kind = kind.as_str(),
                    submission_id,
                    %status,
                    "Result status updated",
                );
                self.emit(
                    ContentEvent::new(event_types::RESULT_STATUS_CHANGED)
                        .with_source(kind.as_str(), submission_id)
                        .with_payload(json!({ "status": status })),
                );
                true
            }
            Err(e) => {
                tracing::error!(
                    kind = kind.as_str(),
                    submission_id,
                    error = %e,
                    "Result status update failed",
                );
                false
            }
        }
    }

    /// Apply `status` to every graded submission of an assessment.
    /// Ungraded submissions are never touched.
    pub async fn set_status_for_all(
        &self,
        kind: SubmissionKind,
        assessment_id: DbId,
        status: ResultStatus,
    ) -> BulkPublishResult {
        let published_at = status.stamps_published_at().then(Utc::now);
        let result = with_deadline(
            self.deadline,
            "update_submission_status",
            self.store.update_submission_status(
                kind,
                SubmissionTarget::GradedOf(assessment_id),
                status,
                published_at,
            ),
        )
        .await;

        match result {
            Ok(rows) => {
                tracing::info!(
                    kind = kind.as_str(),
                    assessment_id,
                    %status,
                    rows,
                    "Bulk result status applied",
                );
                self.emit(
                    ContentEvent::new(event_types::RESULTS_BULK_UPDATED)
                        .with_source(kind.as_str(), assessment_id)
                        .with_payload(json!({ "status": status, "rows": rows })),
                );
                BulkPublishResult::applied(rows)
            }
            Err(e) => {
                tracing::error!(
                    kind = kind.as_str(),
                    assessment_id,
                    error = %e,
                    "Bulk result status update failed",
                );
                BulkPublishResult::failed()
            }
        }
    }

    /// Tally graded submissions of an assessment by status.
    pub async fn get_status_summary(
        &self,
        kind: SubmissionKind,
        assessment_id: DbId,
    ) -> EngineResult<StatusSummary> {
        let statuses = with_deadline(
            self.deadline,
            "read_submission_statuses",
            self.store.read_submission_statuses(kind, assessment_id),
        )
        .await?;
        Ok(StatusSummary::tally(statuses))
    }

    fn emit(&self, event: ContentEvent) {
        if let Some(bus) = &self.bus {
            bus.publish(event);
        }
    }
}
