//! Version numbering and retention rules for section history.
//!
//! Version numbers are per unit, start at 1 and increase by one with every
//! committed version. Only the `retention` most recent versions (by number)
//! are kept.

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default number of versions retained per unit.
pub const DEFAULT_VERSION_RETENTION: usize = 5;

/// How many times the client-driven creation path retries after losing the
/// `(section_id, version_number)` race to a concurrent creator.
pub const MAX_VERSION_INSERT_ATTEMPTS: u32 = 3;

/// Creator label used when no profile name or email can be resolved.
pub const UNKNOWN_CREATOR_LABEL: &str = "Unknown";

// ---------------------------------------------------------------------------
// Numbering
// ---------------------------------------------------------------------------

/// Next version number given the current maximum for a unit (1 if none).
///
/// Fails once the numbering space of the unit is exhausted.
pub fn next_version_number(current_max: Option<i32>) -> Result<i32, CoreError> {
    match current_max {
        None => Ok(1),
        Some(max) => max.checked_add(1).ok_or_else(|| {
            CoreError::Validation(format!("Version number {max} cannot be incremented"))
        }),
    }
}

// ---------------------------------------------------------------------------
// Retention
// ---------------------------------------------------------------------------

/// Validate a configured retention window: at least one version is kept.
pub fn validate_retention(retention: usize) -> Result<(), CoreError> {
    if retention == 0 {
        return Err(CoreError::Validation(
            "Version retention must keep at least 1 version".to_string(),
        ));
    }
    Ok(())
}

/// Select the ids of versions that fall outside the retention window.
///
/// `versions` are `(id, version_number)` pairs in any order. The `retention`
/// highest version numbers survive; every other id is returned.
pub fn ids_to_prune(versions: &[(DbId, i32)], retention: usize) -> Vec<DbId> {
    let mut ordered = versions.to_vec();
    ordered.sort_by(|a, b| b.1.cmp(&a.1));
    ordered
        .into_iter()
        .skip(retention)
        .map(|(id, _)| id)
        .collect()
}

// ---------------------------------------------------------------------------
// Creator labels
// ---------------------------------------------------------------------------

/// Human-readable creator label: full name, else email, else "Unknown".
///
/// Blank strings are treated as missing.
pub fn creator_label(full_name: Option<&str>, email: Option<&str>) -> String {
    [full_name, email]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_CREATOR_LABEL)
        .to_string()
}
