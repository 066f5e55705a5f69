use std::sync::Arc;

use folio_engine::{ContentStore, EngineConfig, PgContentStore, VersionStore};
use folio_worker::{retention, WorkerConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "folio_worker=debug,folio_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let worker_config = WorkerConfig::from_env()?;
    let engine_config = EngineConfig::from_env()?;

    let pool = folio_db::create_pool(&worker_config.database_url).await?;
    folio_db::health_check(&pool).await?;
    folio_db::run_migrations(&pool).await?;
    tracing::info!("Database ready");

    let store: Arc<dyn ContentStore> = Arc::new(PgContentStore::new(pool));
    let versions = Arc::new(VersionStore::new(store, &engine_config).await?);

    let cancel = CancellationToken::new();
    let sweep = tokio::spawn(retention::run(
        versions,
        worker_config.sweep_interval,
        cancel.clone(),
    ));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    cancel.cancel();
    sweep.await?;

    tracing::info!("Worker stopped");
    Ok(())
}
