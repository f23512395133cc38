// Postbox - Message Ingestion Service
//
// This crate provides a small HTTP API for submitting text messages, a
// durable database-backed task queue, and a background worker that advances
// each message through its processing lifecycle
// (pending -> processing -> completed/failed).

pub mod config;
pub mod error;
pub mod messages;
pub mod metrics;
pub mod server;
pub mod tasks;

pub use config::Config;
pub use error::ApiError;
pub use metrics::ServiceMetrics;
