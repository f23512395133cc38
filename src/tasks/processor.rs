use async_trait::async_trait;
use std::time::Duration;

use crate::messages::Message;

/// The work performed for one message attempt.
///
/// Seam for tests: substitute an instant or failing processor.
#[async_trait]
pub trait MessageProcessor: Send + Sync {
    async fn process(&self, message: &Message) -> anyhow::Result<()>;
}

/// Production processor: a fixed-duration simulated operation.
pub struct FixedDelayProcessor {
    delay: Duration,
}

impl FixedDelayProcessor {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl MessageProcessor for FixedDelayProcessor {
    async fn process(&self, message: &Message) -> anyhow::Result<()> {
        tracing::debug!(
            message_id = message.id,
            delay_ms = self.delay.as_millis() as u64,
            "processing message"
        );
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}
