//! In-process notifications for content lifecycle changes.
//!
//! Editor, version-history and result-publishing surfaces subscribe to the
//! [`bus::EventBus`] to learn about saves, conflicts, new versions and
//! publication changes without polling the store.

pub mod bus;

pub use bus::{ContentEvent, EventBus};

/// Well-known event type names.
pub mod event_types {
    pub const DRAFT_SAVE_STARTED: &str = "section.draft_save_started";
    pub const DRAFT_SAVED: &str = "section.draft_saved";
    pub const DRAFT_SAVE_FAILED: &str = "section.draft_save_failed";
    pub const DRAFT_CONFLICT: &str = "section.draft_conflict";
    pub const VERSION_CREATED: &str = "section.version_created";
    pub const VERSION_DELETED: &str = "section.version_deleted";
    pub const DRAFT_ROLLED_BACK: &str = "section.draft_rolled_back";
    pub const SECTION_PUBLISHED: &str = "section.published";
    pub const RESULT_STATUS_CHANGED: &str = "submission.result_status_changed";
    pub const RESULTS_BULK_UPDATED: &str = "submission.results_bulk_updated";
}
