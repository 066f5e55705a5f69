//! Section draft model (one live draft per section).

use folio_core::types::{Content, DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `page_section_drafts` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct SectionDraft {
    pub id: DbId,
    pub section_id: DbId,
    pub content: Content,
    pub status: String,
    pub updated_by: Option<DbId>,
    pub updated_at: Timestamp,
    pub created_at: Timestamp,
}

/// Insert-or-replace input keyed by `section_id`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertSectionDraft {
    pub section_id: DbId,
    pub content: Content,
    pub status: String,
    pub updated_by: DbId,
    pub updated_at: Timestamp,
}
