//! Test harness around an in-memory database.
//!
//! Each `TestApp` owns a fresh single-connection SQLite pool with migrations
//! applied, the assembled router, and the metrics registry the router records
//! into. Request helpers drive the router through tower, no socket involved.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::{Body, Bytes};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tower::ServiceExt;

use postbox_core::server::{build_app, AppState};
use postbox_core::tasks::{
    MessageProcessor, QueueConfig, SqliteTaskQueue, TaskQueue, Worker, WorkerConfig,
};
use postbox_core::ServiceMetrics;

/// A fully wired service instance for one test.
pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    pub queue: Arc<SqliteTaskQueue>,
    pub metrics: Arc<ServiceMetrics>,
}

impl TestApp {
    /// App with zero backoff, so retried tasks are due immediately.
    pub async fn new() -> Result<Self> {
        Self::with_queue_config(QueueConfig {
            max_attempts: 3,
            base_backoff: Duration::ZERO,
        })
        .await
    }

    pub async fn with_queue_config(config: QueueConfig) -> Result<Self> {
        // A single connection keeps every handle on the same in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory database")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;

        let queue = Arc::new(SqliteTaskQueue::new(pool.clone(), config));
        let metrics = Arc::new(ServiceMetrics::default());
        let router = build_app(AppState {
            pool: pool.clone(),
            queue: queue.clone(),
            metrics: metrics.clone(),
        });

        Ok(Self {
            router,
            pool,
            queue,
            metrics,
        })
    }

    /// Rebuild the router so the API enqueues through `queue` instead. The
    /// inspection handle in `self.queue` keeps reading the real table.
    pub fn with_api_queue(mut self, queue: Arc<dyn TaskQueue>) -> Self {
        self.router = build_app(AppState {
            pool: self.pool.clone(),
            queue,
            metrics: self.metrics.clone(),
        });
        self
    }

    /// Worker wired to this app's queue and registry. Tests drive it through
    /// `run_once` so nothing depends on poll timing.
    pub fn worker(&self, processor: Arc<dyn MessageProcessor>) -> Worker {
        self.worker_with_queue(self.queue.clone(), processor)
    }

    /// Worker bound to an arbitrary queue implementation.
    pub fn worker_with_queue(
        &self,
        queue: Arc<dyn TaskQueue>,
        processor: Arc<dyn MessageProcessor>,
    ) -> Worker {
        Worker::with_config(
            self.pool.clone(),
            queue,
            processor,
            self.metrics.clone(),
            WorkerConfig::with_worker_id("test-worker"),
        )
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("Failed to build request");
        self.send_json(request).await
    }

    /// POST an arbitrary body, for payloads `post_json` cannot produce.
    pub async fn post_raw(&self, uri: &str, content_type: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body.to_string()))
            .expect("Failed to build request");
        self.send_json(request).await
    }

    pub async fn get_json(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("Failed to build request");
        self.send_json(request).await
    }

    /// GET returning the raw body, for the exposition endpoint.
    pub async fn get_text(&self, uri: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("Failed to build request");
        let (status, bytes) = self.send(request).await;
        let text = String::from_utf8(bytes.to_vec()).expect("Response body was not UTF-8");
        (status, text)
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Bytes) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");
        (status, bytes)
    }

    async fn send_json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, bytes) = self.send(request).await;
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }
}
