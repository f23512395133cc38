//! Scriptable processors for steering worker outcomes in tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::bail;
use async_trait::async_trait;

use postbox_core::messages::Message;
use postbox_core::tasks::MessageProcessor;

/// Succeeds instantly, recording each message id it processes.
#[derive(Default)]
pub struct RecordingProcessor {
    seen: Mutex<Vec<i64>>,
}

impl RecordingProcessor {
    pub fn seen(&self) -> Vec<i64> {
        self.seen.lock().expect("Lock poisoned").clone()
    }
}

#[async_trait]
impl MessageProcessor for RecordingProcessor {
    async fn process(&self, message: &Message) -> anyhow::Result<()> {
        self.seen.lock().expect("Lock poisoned").push(message.id);
        Ok(())
    }
}

/// Fails the first `failures` attempts, then succeeds.
pub struct FlakyProcessor {
    failures_left: Mutex<usize>,
}

impl FlakyProcessor {
    pub fn failing_first(failures: usize) -> Self {
        Self {
            failures_left: Mutex::new(failures),
        }
    }
}

#[async_trait]
impl MessageProcessor for FlakyProcessor {
    async fn process(&self, _message: &Message) -> anyhow::Result<()> {
        let mut left = self.failures_left.lock().expect("Lock poisoned");
        if *left > 0 {
            *left -= 1;
            bail!("simulated transient failure");
        }
        Ok(())
    }
}

/// Fails every attempt, counting deliveries.
#[derive(Default)]
pub struct FailingProcessor {
    calls: AtomicUsize,
}

impl FailingProcessor {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageProcessor for FailingProcessor {
    async fn process(&self, _message: &Message) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        bail!("simulated processing failure");
    }
}
