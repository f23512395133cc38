use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Queue-level states of a task row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Queued,
    Running,
    Succeeded,
    DeadLetter,
}

/// Whether a failure is worth another delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    #[default]
    Retryable,
    NonRetryable,
}

impl ErrorKind {
    pub fn should_retry(&self) -> bool {
        matches!(self, ErrorKind::Retryable)
    }
}

/// A task row as stored. One row carries the whole delivery chain for a
/// message id; retries bump `attempt` and push `run_at` forward.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: i64,
    pub message_id: i64,
    pub status: TaskStatus,
    pub attempt: i64,
    pub max_attempts: i64,
    pub run_at: DateTime<Utc>,
    pub worker_id: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The slice of a task a worker needs to execute it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClaimedTask {
    pub id: i64,
    pub message_id: i64,
    pub attempt: i64,
}

const MAX_BACKOFF: Duration = Duration::from_secs(3600);

/// Delay before redelivery after `attempt` failed: base * 2^(attempt-1),
/// capped at an hour.
pub fn backoff_delay(base: Duration, attempt: i64) -> Duration {
    let exp = attempt.saturating_sub(1).clamp(0, 20) as u32;
    base.saturating_mul(2u32.saturating_pow(exp)).min(MAX_BACKOFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors_should_retry() {
        assert!(ErrorKind::Retryable.should_retry());
        assert!(!ErrorKind::NonRetryable.should_retry());
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let base = Duration::from_secs(1);
        assert_eq!(backoff_delay(base, 1), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, 2), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 3), Duration::from_secs(4));
        assert_eq!(backoff_delay(base, 4), Duration::from_secs(8));
    }

    #[test]
    fn backoff_is_capped_at_one_hour() {
        let base = Duration::from_secs(1);
        assert_eq!(backoff_delay(base, 13), Duration::from_secs(3600));
        assert_eq!(backoff_delay(base, 100), Duration::from_secs(3600));
    }

    #[test]
    fn zero_base_means_immediate_redelivery() {
        assert_eq!(backoff_delay(Duration::ZERO, 1), Duration::ZERO);
        assert_eq!(backoff_delay(Duration::ZERO, 5), Duration::ZERO);
    }

    #[test]
    fn task_status_serializes_to_snake_case() {
        let json = serde_json::to_string(&TaskStatus::DeadLetter).unwrap();
        assert_eq!(json, "\"dead_letter\"");
    }
}
