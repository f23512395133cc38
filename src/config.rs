use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub process_delay_ms: u64,
    pub task_max_attempts: i64,
    pub task_base_backoff_ms: u64,
    pub worker_poll_interval_ms: u64,
    pub worker_batch_size: i64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:messages.db?mode=rwc".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            process_delay_ms: env::var("PROCESS_DELAY_MS")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("PROCESS_DELAY_MS must be a valid number")?,
            task_max_attempts: env::var("TASK_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .context("TASK_MAX_ATTEMPTS must be a valid number")?,
            task_base_backoff_ms: env::var("TASK_BASE_BACKOFF_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .context("TASK_BASE_BACKOFF_MS must be a valid number")?,
            worker_poll_interval_ms: env::var("WORKER_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| "500".to_string())
                .parse()
                .context("WORKER_POLL_INTERVAL_MS must be a valid number")?,
            worker_batch_size: env::var("WORKER_BATCH_SIZE")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("WORKER_BATCH_SIZE must be a valid number")?,
        })
    }
}
