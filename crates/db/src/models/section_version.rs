//! Section version models.
//!
//! Versions are immutable snapshots; they are only ever inserted or deleted.

use folio_core::types::{Content, DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `page_section_versions` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct SectionVersion {
    pub id: DbId,
    pub section_id: DbId,
    pub version_number: i32,
    pub content: Content,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// Input for inserting a version with an explicit number.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSectionVersion {
    pub section_id: DbId,
    pub version_number: i32,
    pub content: Content,
    pub created_by: DbId,
}

// ---------------------------------------------------------------------------
// History view
// ---------------------------------------------------------------------------

/// A version annotated with a human-readable creator label.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VersionHistoryEntry {
    #[serde(flatten)]
    pub version: SectionVersion,
    pub created_by_name: String,
}
