use std::time::Duration;

use anyhow::Context;

/// Default interval between retention sweeps.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;

/// Worker settings loaded from the environment.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub sweep_interval: Duration,
}

impl WorkerConfig {
    /// | Env Var                         | Default  |
    /// |---------------------------------|----------|
    /// | `DATABASE_URL`                  | required |
    /// | `RETENTION_SWEEP_INTERVAL_SECS` | `3600`   |
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let sweep_interval = parse_interval(std::env::var("RETENTION_SWEEP_INTERVAL_SECS").ok())?;
        Ok(Self {
            database_url,
            sweep_interval,
        })
    }
}

fn parse_interval(raw: Option<String>) -> anyhow::Result<Duration> {
    let secs = match raw.as_deref().map(str::trim) {
        None | Some("") => DEFAULT_SWEEP_INTERVAL_SECS,
        Some(value) => value
            .parse::<u64>()
            .with_context(|| format!("RETENTION_SWEEP_INTERVAL_SECS has an invalid value '{value}'"))?,
    };
    anyhow::ensure!(secs > 0, "RETENTION_SWEEP_INTERVAL_SECS must be greater than zero");
    Ok(Duration::from_secs(secs))
}
