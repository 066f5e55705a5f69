//! Live landing-page section model.

use folio_core::types::{Content, DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `page_sections` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PageSection {
    pub id: DbId,
    pub section_key: String,
    pub content: Content,
    pub published_at: Option<Timestamp>,
    pub published_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new section.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePageSection {
    pub section_key: String,
    pub content: Content,
}
