use folio_core::error::CoreError;
use folio_core::types::DbId;

/// Errors raised by the engine services and content stores.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Transport or infrastructure failure talking to the store.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Version {version_id} not found")]
    VersionNotFound { version_id: DbId },

    #[error("No draft exists for section {unit_id}")]
    DraftNotFound { unit_id: DbId },

    #[error("Section {unit_id} not found")]
    SectionNotFound { unit_id: DbId },

    /// The store cannot perform the requested operation (e.g. atomic
    /// version creation is not installed).
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Another creator already took this version number.
    #[error("Version {version_number} already exists for section {unit_id}")]
    DuplicateVersion { unit_id: DbId, version_number: i32 },

    /// A caller-supplied deadline elapsed before the store answered.
    #[error("Store call '{operation}' exceeded its deadline")]
    Timeout { operation: &'static str },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Convenience alias for engine return values.
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// `true` for the "thing does not exist" kinds, which callers usually
    /// message differently from failures.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::VersionNotFound { .. }
                | Self::DraftNotFound { .. }
                | Self::SectionNotFound { .. }
                | Self::Core(CoreError::NotFound { .. })
        )
    }

    /// `true` if retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable(_) | Self::Timeout { .. } | Self::DuplicateVersion { .. }
        )
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}
