use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Lifecycle states of a message.
///
/// `pending` is set at creation; the worker moves a message to `processing`
/// and then to `completed`, or to `failed` when an attempt errors. A failed
/// message re-enters `processing` when the queue redelivers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl MessageStatus {
    /// Stable string form, also used as a metric label value.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Processing => "processing",
            MessageStatus::Completed => "completed",
            MessageStatus::Failed => "failed",
        }
    }
}

/// A message record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: i64,
    pub content: String,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate counts for the stats endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: i64,
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
}

impl Message {
    /// Insert a new pending message and return the stored row.
    pub async fn create(content: &str, pool: &SqlitePool) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO messages (content, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?3)
            RETURNING id, content, status, created_at, updated_at
            "#,
        )
        .bind(content)
        .bind(MessageStatus::Pending)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    /// Point lookup by id.
    pub async fn find_by_id(id: i64, pool: &SqlitePool) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "SELECT id, content, status, created_at, updated_at FROM messages WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// All messages, optionally filtered by status, oldest first.
    pub async fn list(
        status: Option<MessageStatus>,
        pool: &SqlitePool,
    ) -> Result<Vec<Self>, sqlx::Error> {
        match status {
            Some(status) => {
                sqlx::query_as::<_, Self>(
                    r#"
                    SELECT id, content, status, created_at, updated_at
                    FROM messages
                    WHERE status = ?1
                    ORDER BY id
                    "#,
                )
                .bind(status)
                .fetch_all(pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Self>(
                    "SELECT id, content, status, created_at, updated_at FROM messages ORDER BY id",
                )
                .fetch_all(pool)
                .await
            }
        }
    }

    /// The one status-transition write. Refreshes updated_at and returns the
    /// new row, or None when the id no longer exists.
    pub async fn update_status(
        id: i64,
        status: MessageStatus,
        pool: &SqlitePool,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE messages
            SET status = ?1, updated_at = ?2
            WHERE id = ?3
            RETURNING id, content, status, created_at, updated_at
            "#,
        )
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Per-status counts and the total, from one consistent snapshot.
    pub async fn counts_by_status(pool: &SqlitePool) -> Result<StatusCounts, sqlx::Error> {
        let rows: Vec<(MessageStatus, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM messages GROUP BY status")
                .fetch_all(pool)
                .await?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            counts.total += count;
            match status {
                MessageStatus::Pending => counts.pending = count,
                MessageStatus::Processing => counts.processing = count,
                MessageStatus::Completed => counts.completed = count,
                MessageStatus::Failed => counts.failed = count,
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_messages_default_to_pending() {
        assert_eq!(MessageStatus::default(), MessageStatus::Pending);
    }

    #[test]
    fn status_labels_are_lowercase() {
        assert_eq!(MessageStatus::Pending.as_str(), "pending");
        assert_eq!(MessageStatus::Processing.as_str(), "processing");
        assert_eq!(MessageStatus::Completed.as_str(), "completed");
        assert_eq!(MessageStatus::Failed.as_str(), "failed");
    }

    #[test]
    fn status_serializes_to_snake_case() {
        let json = serde_json::to_string(&MessageStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");

        let parsed: MessageStatus = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(parsed, MessageStatus::Failed);
    }

    #[test]
    fn empty_counts_sum_to_zero() {
        let counts = StatusCounts::default();
        assert_eq!(counts.total, 0);
        assert_eq!(
            counts.pending + counts.processing + counts.completed + counts.failed,
            counts.total
        );
    }
}
