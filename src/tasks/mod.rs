//! Asynchronous processing: the durable task queue and the worker that
//! drains it.
//!
//! ```text
//! API ──enqueue──► tasks table ──claim──► Worker
//!                      ▲                    │
//!                      └──mark_failed───────┤ (retry with backoff,
//!                                           │  dead-letter on exhaustion)
//!                      Message status ◄─────┘
//! ```

pub mod processor;
pub mod queue;
pub mod task;
pub mod worker;

pub use processor::{FixedDelayProcessor, MessageProcessor};
pub use queue::{QueueConfig, SqliteTaskQueue, TaskQueue};
pub use task::{backoff_delay, ClaimedTask, ErrorKind, Task, TaskStatus};
pub use worker::{Worker, WorkerConfig};
