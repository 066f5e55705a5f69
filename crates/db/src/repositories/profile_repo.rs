//! Repository for the `profiles` table.

use folio_core::types::DbId;
use sqlx::PgPool;

use crate::models::profile::{CreateProfile, CreatorProfile};

/// Provides lookups of profile names for display labels.
pub struct ProfileRepo;

impl ProfileRepo {
    /// Insert a profile, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateProfile) -> Result<CreatorProfile, sqlx::Error> {
        sqlx::query_as::<_, CreatorProfile>(
            "INSERT INTO profiles (full_name, email) VALUES ($1, $2)
             RETURNING id, full_name, email",
        )
        .bind(&input.full_name)
        .bind(&input.email)
        .fetch_one(pool)
        .await
    }

    /// Fetch the profiles for a set of ids. Unknown ids are simply absent.
    pub async fn find_by_ids(pool: &PgPool, ids: &[DbId]) -> Result<Vec<CreatorProfile>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, CreatorProfile>(
            "SELECT id, full_name, email FROM profiles WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(pool)
        .await
    }
}
