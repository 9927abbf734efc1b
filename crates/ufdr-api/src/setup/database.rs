//! Database setup and initialization

use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use ufdr_core::Config;
use ufdr_db::MIGRATOR;

/// Setup the connection pool and run pending migrations.
pub async fn setup_database(config: &Config) -> Result<PgPool> {
    tracing::info!("connecting to database");
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.database_url)
        .await
        .context("database connection failed")?;

    MIGRATOR
        .run(&pool)
        .await
        .context("database migrations failed")?;
    tracing::info!(
        max_connections = config.db_max_connections,
        "database connected, migrations applied"
    );

    Ok(pool)
}
