// Standalone queue worker for additional processing capacity.
// Shares the tasks table with the API process; runs until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use postbox_core::tasks::{
    FixedDelayProcessor, QueueConfig, SqliteTaskQueue, Worker, WorkerConfig,
};
use postbox_core::{Config, ServiceMetrics};
use sqlx::sqlite::SqlitePoolOptions;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,postbox_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting postbox worker");

    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    // Either binary can start first against an empty database
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let queue = Arc::new(SqliteTaskQueue::new(
        pool.clone(),
        QueueConfig {
            max_attempts: config.task_max_attempts,
            base_backoff: Duration::from_millis(config.task_base_backoff_ms),
        },
    ));
    let processor = Arc::new(FixedDelayProcessor::new(Duration::from_millis(
        config.process_delay_ms,
    )));
    let worker = Worker::with_config(
        pool,
        queue,
        processor,
        Arc::new(ServiceMetrics::default()),
        WorkerConfig {
            batch_size: config.worker_batch_size,
            poll_interval: Duration::from_millis(config.worker_poll_interval_ms),
            ..WorkerConfig::default()
        },
    );

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            signal_token.cancel();
        }
    });

    worker.run(shutdown).await
}
