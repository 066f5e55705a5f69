//! Domain rules for the content versioning and publication engine.
//!
//! This crate has no internal dependencies so that the repository layer,
//! the engine services and the background worker can all share the same
//! constants, status values and comparison rules.

pub mod conflict;
pub mod content;
pub mod error;
pub mod hashing;
pub mod publication;
pub mod types;
pub mod versioning;
