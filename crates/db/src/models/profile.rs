//! User profile model, used for creator labels on version history.

use folio_core::types::DbId;
use folio_core::versioning::creator_label;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The name/email subset of a `profiles` row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct CreatorProfile {
    pub id: DbId,
    pub full_name: Option<String>,
    pub email: Option<String>,
}

impl CreatorProfile {
    /// Display label: full name, else email, else "Unknown".
    pub fn label(&self) -> String {
        creator_label(self.full_name.as_deref(), self.email.as_deref())
    }
}

/// DTO for creating a profile.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProfile {
    pub full_name: Option<String>,
    pub email: Option<String>,
}
