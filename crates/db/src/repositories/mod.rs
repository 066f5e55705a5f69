//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod page_section_repo;
pub mod profile_repo;
pub mod section_draft_repo;
pub mod section_version_repo;
pub mod submission_repo;

pub use page_section_repo::PageSectionRepo;
pub use profile_repo::ProfileRepo;
pub use section_draft_repo::SectionDraftRepo;
pub use section_version_repo::SectionVersionRepo;
pub use submission_repo::SubmissionRepo;
