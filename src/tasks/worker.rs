//! Polling worker that drives messages through the processing state machine.
//!
//! The worker is a long-running loop that:
//! - Claims due tasks from the `TaskQueue` in batches
//! - Loads each task's message and runs it through
//!   `processing → completed/failed`, persisting every transition
//! - Emits `messages_processed_total` per terminal attempt
//! - Reports each outcome back to the queue, which owns retry scheduling
//!
//! Task-level failures are recorded, never propagated: the loop only stops
//! when the shutdown token fires.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::messages::{Message, MessageStatus};
use crate::metrics::ServiceMetrics;

use super::processor::MessageProcessor;
use super::queue::TaskQueue;
use super::task::{ClaimedTask, ErrorKind};

/// Configuration for the worker loop.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum number of tasks to claim at once
    pub batch_size: i64,
    /// How long to wait when no tasks are ready
    pub poll_interval: Duration,
    /// Worker ID for this instance
    pub worker_id: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            poll_interval: Duration::from_millis(500),
            worker_id: format!("worker-{}", Uuid::new_v4()),
        }
    }
}

impl WorkerConfig {
    /// Create a new config with a specific worker ID.
    pub fn with_worker_id(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            ..Default::default()
        }
    }
}

/// A worker that processes messages from the task queue.
pub struct Worker {
    pool: SqlitePool,
    queue: Arc<dyn TaskQueue>,
    processor: Arc<dyn MessageProcessor>,
    metrics: Arc<ServiceMetrics>,
    config: WorkerConfig,
}

impl Worker {
    /// Create a worker with default configuration.
    pub fn new(
        pool: SqlitePool,
        queue: Arc<dyn TaskQueue>,
        processor: Arc<dyn MessageProcessor>,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            pool,
            queue,
            processor,
            metrics,
            config: WorkerConfig::default(),
        }
    }

    /// Create with custom configuration.
    pub fn with_config(
        pool: SqlitePool,
        queue: Arc<dyn TaskQueue>,
        processor: Arc<dyn MessageProcessor>,
        metrics: Arc<ServiceMetrics>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            pool,
            queue,
            processor,
            metrics,
            config,
        }
    }

    /// Claim and process one batch. Returns how many tasks were claimed.
    pub async fn run_once(&self) -> Result<usize> {
        let tasks = self
            .queue
            .claim(&self.config.worker_id, self.config.batch_size)
            .await?;
        let count = tasks.len();
        if count == 0 {
            return Ok(0);
        }

        debug!(count, "claimed tasks");

        let mut handles = Vec::with_capacity(tasks.len());
        for task in tasks {
            handles.push(self.process_task(task));
        }
        futures::future::join_all(handles).await;

        Ok(count)
    }

    /// Drive one claimed task to an outcome. Failures are recorded on the
    /// queue, never returned.
    async fn process_task(&self, task: ClaimedTask) {
        let message = match Message::find_by_id(task.message_id, &self.pool).await {
            Ok(Some(message)) => message,
            Ok(None) => {
                // Deleted out-of-band; retrying cannot help.
                warn!(
                    task_id = task.id,
                    message_id = task.message_id,
                    "message row missing, dead-lettering task"
                );
                self.report_failure(task.id, "message row missing", ErrorKind::NonRetryable)
                    .await;
                return;
            }
            Err(e) => {
                error!(
                    task_id = task.id,
                    message_id = task.message_id,
                    error = %e,
                    "failed to load message"
                );
                self.report_failure(task.id, &e.to_string(), ErrorKind::Retryable)
                    .await;
                return;
            }
        };

        match self.run_attempt(&message).await {
            Ok(()) => {
                debug!(
                    task_id = task.id,
                    message_id = message.id,
                    attempt = task.attempt,
                    "message processed"
                );
                self.metrics
                    .messages_processed
                    .inc(&[("status", MessageStatus::Completed.as_str())]);
                if let Err(e) = self.queue.mark_succeeded(task.id).await {
                    error!(task_id = task.id, error = %e, "failed to mark task as succeeded");
                }
            }
            Err(e) => {
                warn!(
                    task_id = task.id,
                    message_id = message.id,
                    attempt = task.attempt,
                    error = %e,
                    "processing attempt failed"
                );
                if let Err(update_err) =
                    Message::update_status(message.id, MessageStatus::Failed, &self.pool).await
                {
                    error!(
                        message_id = message.id,
                        error = %update_err,
                        "failed to record failed status"
                    );
                }
                self.metrics
                    .messages_processed
                    .inc(&[("status", MessageStatus::Failed.as_str())]);
                self.report_failure(task.id, &e.to_string(), ErrorKind::Retryable)
                    .await;
            }
        }
    }

    /// One processing attempt: transition to processing, run the work,
    /// transition to completed. Each transition persists before proceeding.
    async fn run_attempt(&self, message: &Message) -> Result<()> {
        let message = Message::update_status(message.id, MessageStatus::Processing, &self.pool)
            .await?
            .ok_or_else(|| anyhow!("message {} vanished before processing", message.id))?;

        self.processor.process(&message).await?;

        Message::update_status(message.id, MessageStatus::Completed, &self.pool)
            .await?
            .ok_or_else(|| anyhow!("message {} vanished after processing", message.id))?;

        Ok(())
    }

    async fn report_failure(&self, task_id: i64, error: &str, kind: ErrorKind) {
        if let Err(e) = self.queue.mark_failed(task_id, error, kind).await {
            error!(task_id, error = %e, "failed to mark task as failed");
        }
    }

    /// Poll until the shutdown token fires. Claim errors pause the loop
    /// briefly and continue; they never terminate it.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        info!(
            worker_id = %self.config.worker_id,
            batch_size = self.config.batch_size,
            "worker starting"
        );

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            match self.run_once().await {
                Ok(0) => {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.config.poll_interval) => {}
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "failed to claim tasks");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                    }
                }
            }
        }

        info!(worker_id = %self.config.worker_id, "worker stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert!(config.worker_id.starts_with("worker-"));
    }

    #[test]
    fn config_with_worker_id() {
        let config = WorkerConfig::with_worker_id("my-worker");
        assert_eq!(config.worker_id, "my-worker");
    }
}
