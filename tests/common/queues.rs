//! Queue doubles for exercising failure paths.

use anyhow::{bail, Result};
use async_trait::async_trait;

use postbox_core::tasks::{ClaimedTask, ErrorKind, TaskQueue};

/// Queue whose every operation fails, as if the backing store were gone.
pub struct BrokenQueue;

#[async_trait]
impl TaskQueue for BrokenQueue {
    async fn enqueue(&self, _message_id: i64) -> Result<i64> {
        bail!("queue unavailable")
    }

    async fn claim(&self, _worker_id: &str, _limit: i64) -> Result<Vec<ClaimedTask>> {
        bail!("queue unavailable")
    }

    async fn mark_succeeded(&self, _task_id: i64) -> Result<()> {
        bail!("queue unavailable")
    }

    async fn mark_failed(&self, _task_id: i64, _error: &str, _kind: ErrorKind) -> Result<()> {
        bail!("queue unavailable")
    }
}
