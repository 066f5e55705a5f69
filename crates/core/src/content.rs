//! Change detection for draft content (the change gate).
//!
//! A save is only necessary when the candidate payload differs structurally
//! from the last payload known to be persisted. Comparison works on the
//! parsed `serde_json::Value` tree, so object key order never produces a
//! false "changed" result.

use serde_json::Value;

use crate::hashing::sha256_hex;

/// Status written to every live draft row. A draft is never itself published.
pub const DRAFT_STATUS: &str = "draft";

/// Returns `true` if two content payloads are structurally equal.
pub fn contents_equal(a: &Value, b: &Value) -> bool {
    a == b
}

/// Decide whether `candidate` must be written.
///
/// `last_saved` is `None` when nothing has been persisted in this session yet,
/// which always requires a save.
pub fn needs_save(candidate: &Value, last_saved: Option<&Value>) -> bool {
    match last_saved {
        Some(previous) => !contents_equal(candidate, previous),
        None => true,
    }
}

/// Serialize a payload with object keys sorted at every nesting level.
///
/// Two structurally equal payloads always produce the same string.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// SHA-256 digest of the canonical form of a payload.
pub fn content_digest(value: &Value) -> String {
    sha256_hex(canonical_json(value).as_bytes())
}

/// First 12 hex characters of [`content_digest`], for log fields.
pub fn short_digest(value: &Value) -> String {
    let mut digest = content_digest(value);
    digest.truncate(12);
    digest
}
