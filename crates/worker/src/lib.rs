//! Background jobs for the Folio content engine.

pub mod config;
pub mod retention;

pub use config::WorkerConfig;
