use std::str::FromStr;
use std::time::Duration;

use folio_core::conflict::DEFAULT_CONFLICT_WINDOW_SECS;
use folio_core::versioning::{validate_retention, DEFAULT_VERSION_RETENTION};

use crate::error::{EngineError, EngineResult};

/// Default autosave debounce delay in milliseconds.
pub const DEFAULT_AUTOSAVE_DELAY_MS: u64 = 3000;

/// Engine configuration loaded from environment variables.
///
/// All fields have defaults matching the editor's expected behaviour.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Debounce delay between the last edit and the autosave write.
    pub autosave_delay: Duration,
    /// Window within which a differing external draft write is flagged.
    pub conflict_window: chrono::Duration,
    /// Number of versions retained per section.
    pub version_retention: usize,
    /// Optional deadline applied to every store call made by the engine.
    pub store_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            autosave_delay: Duration::from_millis(DEFAULT_AUTOSAVE_DELAY_MS),
            conflict_window: chrono::Duration::seconds(DEFAULT_CONFLICT_WINDOW_SECS),
            version_retention: DEFAULT_VERSION_RETENTION,
            store_timeout: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default |
    /// |------------------------|---------|
    /// | `AUTOSAVE_DEBOUNCE_MS` | `3000`  |
    /// | `CONFLICT_WINDOW_SECS` | `5`     |
    /// | `VERSION_RETENTION`    | `5`     |
    /// | `STORE_TIMEOUT_MS`     | unset   |
    pub fn from_env() -> EngineResult<Self> {
        let autosave_ms: u64 = env_or("AUTOSAVE_DEBOUNCE_MS", DEFAULT_AUTOSAVE_DELAY_MS)?;
        let conflict_secs: i64 = env_or("CONFLICT_WINDOW_SECS", DEFAULT_CONFLICT_WINDOW_SECS)?;
        let version_retention: usize = env_or("VERSION_RETENTION", DEFAULT_VERSION_RETENTION)?;
        let store_timeout = env_opt::<u64>("STORE_TIMEOUT_MS")?.map(Duration::from_millis);

        let config = Self {
            autosave_delay: Duration::from_millis(autosave_ms),
            conflict_window: conflict_window_from_secs(conflict_secs)?,
            version_retention,
            store_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> EngineResult<()> {
        validate_retention(self.version_retention)?;
        if self.conflict_window < chrono::Duration::zero() {
            return Err(EngineError::Validation(
                "Conflict window must not be negative".to_string(),
            ));
        }
        if self.store_timeout == Some(Duration::ZERO) {
            return Err(EngineError::Validation(
                "Store timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_autosave_delay(mut self, delay: Duration) -> Self {
        self.autosave_delay = delay;
        self
    }

    pub fn with_version_retention(mut self, retention: usize) -> Self {
        self.version_retention = retention;
        self
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = Some(timeout);
        self
    }
}

fn conflict_window_from_secs(secs: i64) -> EngineResult<chrono::Duration> {
    chrono::Duration::try_seconds(secs).ok_or_else(|| {
        EngineError::Validation(format!("CONFLICT_WINDOW_SECS value {secs} is out of range"))
    })
}

fn env_or<T: FromStr>(name: &str, default: T) -> EngineResult<T> {
    Ok(env_opt(name)?.unwrap_or(default))
}

fn env_opt<T: FromStr>(name: &str) -> EngineResult<Option<T>> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| EngineError::Validation(format!("{name} has an invalid value '{raw}'"))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.autosave_delay, Duration::from_millis(3000));
        assert_eq!(config.conflict_window, chrono::Duration::seconds(5));
        assert_eq!(config.version_retention, 5);
        assert!(config.store_timeout.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_retention_is_invalid() {
        let config = EngineConfig::default().with_version_retention(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_is_invalid() {
        let config = EngineConfig::default().with_store_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_conflict_window_is_invalid() {
        let config = EngineConfig {
            conflict_window: chrono::Duration::seconds(-1),
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_out_of_range_conflict_window_is_invalid() {
        let result = conflict_window_from_secs(i64::MAX);
        assert!(matches!(result, Err(EngineError::Validation(_))));
        let result = conflict_window_from_secs(i64::MIN);
        assert!(matches!(result, Err(EngineError::Validation(_))));
    }

    #[test]
    fn test_conflict_window_from_seconds() {
        assert_eq!(
            conflict_window_from_secs(5).unwrap(),
            chrono::Duration::seconds(5)
        );
    }

    #[test]
    fn test_unset_env_var_uses_default() {
        let value: u64 = env_or("FOLIO_TEST_SURELY_UNSET_VARIABLE", 17).unwrap();
        assert_eq!(value, 17);
    }
}
