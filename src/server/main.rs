// Main entry point for the API server

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use postbox_core::server::{build_app, AppState};
use postbox_core::tasks::{
    FixedDelayProcessor, QueueConfig, SqliteTaskQueue, TaskQueue, Worker, WorkerConfig,
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

    tracing::info!("Starting postbox API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    let metrics = Arc::new(ServiceMetrics::default());
    let queue: Arc<dyn TaskQueue> = Arc::new(SqliteTaskQueue::new(
        pool.clone(),
        QueueConfig {
            max_attempts: config.task_max_attempts,
            base_backoff: Duration::from_millis(config.task_base_backoff_ms),
        },
    ));

    // Spawn the embedded worker as a background task
    let worker = Worker::with_config(
        pool.clone(),
        queue.clone(),
        Arc::new(FixedDelayProcessor::new(Duration::from_millis(
            config.process_delay_ms,
        ))),
        metrics.clone(),
        WorkerConfig {
            batch_size: config.worker_batch_size,
            poll_interval: Duration::from_millis(config.worker_poll_interval_ms),
            ..WorkerConfig::default()
        },
    );
    let shutdown = CancellationToken::new();
    let worker_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = worker.run(worker_shutdown).await {
            tracing::error!(error = %e, "Worker exited with error");
        }
    });

    // Build application
    let app = build_app(AppState {
        pool,
        queue,
        metrics,
    });

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Metrics: http://localhost:{}/metrics", config.port);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("Server error")?;

    Ok(())
}

/// Wait for Ctrl-C, then stop the worker loop along with the server.
async fn shutdown_signal(shutdown: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Shutdown signal received");
    }
    shutdown.cancel();
}
