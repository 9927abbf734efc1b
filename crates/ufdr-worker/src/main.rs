use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use ufdr_core::Config;
use ufdr_db::{IngestTaskRepository, UploadSessionRepository, MIGRATOR};
use ufdr_storage::S3MultipartStore;
use ufdr_worker::{telemetry, IngestPipeline, IngestQueue, IngestQueueConfig, ProgressPublisher};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::dotenv().ok();
    telemetry::init_telemetry();

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .connect(&config.database_url)
        .await?;
    MIGRATOR.run(&pool).await?;

    let store = Arc::new(
        S3MultipartStore::new(
            config.s3_bucket.clone(),
            config.s3_region.clone(),
            config.s3_endpoint.clone(),
        )
        .await?,
    );

    let sessions = UploadSessionRepository::new(pool.clone());
    let publisher = ProgressPublisher::connect(&config.redis_url, sessions).await;
    let pipeline = Arc::new(IngestPipeline::new(pool.clone(), store, publisher));

    let queue_config = IngestQueueConfig {
        max_workers: config.worker_max_concurrent,
        poll_interval_ms: config.worker_poll_interval_ms,
        task_timeout_secs: config.ingest_timeout_secs,
        ..Default::default()
    };
    let queue = IngestQueue::new(
        IngestTaskRepository::new(pool.clone()),
        queue_config,
        pipeline,
        Some(pool),
    );

    tracing::info!(environment = %config.environment, "ingest worker running");
    shutdown_signal().await;
    queue.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
