//! Database-backed task queue with an explicit retry contract.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::{debug, warn};

use super::task::{backoff_delay, ClaimedTask, ErrorKind, Task};

/// Retry policy, captured per task at enqueue time.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Total deliveries allowed before a task dead-letters
    pub max_attempts: i64,
    /// Backoff for the first retry; doubles per attempt after that
    pub base_backoff: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(1000),
        }
    }
}

/// Queue operations. The API only enqueues; the worker claims and reports.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Insert a queued task delivering `message_id`, returning the task id.
    async fn enqueue(&self, message_id: i64) -> Result<i64>;

    /// Atomically claim up to `limit` due tasks for `worker_id`.
    async fn claim(&self, worker_id: &str, limit: i64) -> Result<Vec<ClaimedTask>>;

    /// Finish a delivery chain successfully.
    async fn mark_succeeded(&self, task_id: i64) -> Result<()>;

    /// Record a failed attempt: requeue with backoff while retryable attempts
    /// remain, otherwise dead-letter.
    async fn mark_failed(&self, task_id: i64, error: &str, kind: ErrorKind) -> Result<()>;
}

/// SQLite implementation.
///
/// The claim is a single UPDATE with a nested SELECT; SQLite executes one
/// writer at a time, so two workers can never claim the same row.
pub struct SqliteTaskQueue {
    pool: SqlitePool,
    config: QueueConfig,
}

impl SqliteTaskQueue {
    pub fn new(pool: SqlitePool, config: QueueConfig) -> Self {
        Self { pool, config }
    }

    /// Full task row, for inspection.
    pub async fn find_task(&self, task_id: i64) -> Result<Option<Task>> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT id, message_id, status, attempt, max_attempts, run_at,
                   worker_id, error_kind, last_error, created_at, updated_at
            FROM tasks
            WHERE id = ?1
            "#,
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }
}

#[async_trait]
impl TaskQueue for SqliteTaskQueue {
    async fn enqueue(&self, message_id: i64) -> Result<i64> {
        let task_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO tasks (message_id, status, attempt, max_attempts, run_at, created_at, updated_at)
            VALUES (?1, 'queued', 1, ?2, ?3, ?3, ?3)
            RETURNING id
            "#,
        )
        .bind(message_id)
        .bind(self.config.max_attempts)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .context("failed to enqueue task")?;

        debug!(task_id, message_id, "task enqueued");
        Ok(task_id)
    }

    async fn claim(&self, worker_id: &str, limit: i64) -> Result<Vec<ClaimedTask>> {
        sqlx::query_as::<_, ClaimedTask>(
            r#"
            UPDATE tasks
            SET status = 'running', worker_id = ?1, updated_at = ?2
            WHERE id IN (
                SELECT id FROM tasks
                WHERE status = 'queued' AND run_at <= ?2
                ORDER BY run_at, id
                LIMIT ?3
            )
            RETURNING id, message_id, attempt
            "#,
        )
        .bind(worker_id)
        .bind(Utc::now())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn mark_succeeded(&self, task_id: i64) -> Result<()> {
        sqlx::query("UPDATE tasks SET status = 'succeeded', worker_id = NULL, updated_at = ?1 WHERE id = ?2")
            .bind(Utc::now())
            .bind(task_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_failed(&self, task_id: i64, error: &str, kind: ErrorKind) -> Result<()> {
        let task = self
            .find_task(task_id)
            .await?
            .ok_or_else(|| anyhow!("task {} not found", task_id))?;

        if kind.should_retry() && task.attempt < task.max_attempts {
            let delay = backoff_delay(self.config.base_backoff, task.attempt);
            let run_at = Utc::now() + chrono::Duration::from_std(delay)?;

            sqlx::query(
                r#"
                UPDATE tasks
                SET status = 'queued', attempt = attempt + 1, run_at = ?1,
                    worker_id = NULL, error_kind = ?2, last_error = ?3, updated_at = ?4
                WHERE id = ?5
                "#,
            )
            .bind(run_at)
            .bind(kind)
            .bind(error)
            .bind(Utc::now())
            .bind(task_id)
            .execute(&self.pool)
            .await?;

            debug!(
                task_id,
                message_id = task.message_id,
                attempt = task.attempt,
                retry_at = %run_at,
                "task failed, retry scheduled"
            );
        } else {
            sqlx::query(
                r#"
                UPDATE tasks
                SET status = 'dead_letter', worker_id = NULL, error_kind = ?1,
                    last_error = ?2, updated_at = ?3
                WHERE id = ?4
                "#,
            )
            .bind(kind)
            .bind(error)
            .bind(Utc::now())
            .bind(task_id)
            .execute(&self.pool)
            .await?;

            warn!(
                task_id,
                message_id = task.message_id,
                attempt = task.attempt,
                error,
                "task dead-lettered"
            );
        }

        Ok(())
    }
}
