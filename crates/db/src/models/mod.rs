//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create/upsert DTO for writes

pub mod page_section;
pub mod profile;
pub mod section_draft;
pub mod section_version;
pub mod submission;
