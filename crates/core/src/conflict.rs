//! Advisory conflict rule for concurrent draft writes.
//!
//! A conflict is only a warning: the save always proceeds (last write wins).

use chrono::Duration;
use serde_json::Value;

use crate::content::contents_equal;
use crate::types::Timestamp;

/// Default staleness window in seconds.
pub const DEFAULT_CONFLICT_WINDOW_SECS: i64 = 5;

/// Returns `true` if the persisted draft looks like a recent external write
/// that differs from what we are about to save.
///
/// - The persisted write must be younger than `window` relative to `now`.
///   Timestamps in the future (clock skew) count as recent.
/// - A `null` persisted payload never conflicts.
/// - Structurally identical content never conflicts.
pub fn is_conflicting(
    existing_content: &Value,
    existing_updated_at: Timestamp,
    candidate: &Value,
    now: Timestamp,
    window: Duration,
) -> bool {
    if existing_content.is_null() {
        return false;
    }
    if now - existing_updated_at >= window {
        return false;
    }
    !contents_equal(existing_content, candidate)
}
