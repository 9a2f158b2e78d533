use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use ddb_db::PgDataManager;
use ddb_messaging::BrokerConfig;
use ddb_worker::config::WorkerConfig;
use ddb_worker::services::{Collaborators, Worker};
use ddb_worker::{init_tracing, metrics, shutdown};
use prometheus::Registry;
use tokio_util::sync::CancellationToken;

/// Startup deadline for the first database connection.
const DB_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    init_tracing("ddb_worker=info,ddb_events=info,ddb_messaging=info");

    // --- Configuration ---
    let config = WorkerConfig::from_env()?;
    if config.cease_operation {
        tracing::info!("CEASE_OPERATION is set, exiting");
        return Ok(());
    }
    tracing::info!(environment = %config.environment, metrics_addr = %config.metrics_addr, "Loaded worker configuration");

    // --- Shutdown ---
    let cancel = CancellationToken::new();
    shutdown::spawn_signal_handler(cancel.clone()).context("Failed to install signal handlers")?;

    // --- Database ---
    let pool = tokio::time::timeout(
        DB_CONNECT_TIMEOUT,
        ddb_db::create_pool(&config.database_url, config.database_max_connections),
    )
    .await
    .context("Timed out connecting to the database")?
    .context("Failed to connect to database")?;
    ddb_db::health_check(&pool).await.context("Database health check failed")?;
    tracing::info!(max_connections = config.database_max_connections, "Database connection pool created");
    let data = Arc::new(PgDataManager::new(pool));

    // --- Broker ---
    let broker = BrokerConfig::from_env()?.build()?;

    // --- Collaborators ---
    let collaborators = Collaborators::from_env().await?;

    // --- Metrics ---
    let registry = Registry::new();
    let metrics_handle = tokio::spawn(metrics::serve(config.metrics_addr, registry.clone(), cancel.clone()));

    // --- Worker ---
    let worker = Worker::assemble(&config, data, &broker, collaborators, &registry).await?;
    tracing::info!(topics = ?worker.topics(), "Worker starting");
    worker.run(&broker, cancel.clone()).await?;

    // --- Post-shutdown cleanup ---
    cancel.cancel();
    match tokio::time::timeout(Duration::from_secs(5), metrics_handle).await {
        Ok(Ok(Err(e))) => tracing::error!(error = %e, "Metrics server failed"),
        Err(_) => tracing::warn!("Metrics server did not stop in time"),
        _ => {}
    }

    tracing::info!("Graceful shutdown complete");
    Ok(())
}
