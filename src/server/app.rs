//! Application setup and router assembly.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

use crate::messages::routes::{create_message, get_message, list_messages, message_stats};
use crate::metrics::ServiceMetrics;
use crate::server::middleware::track_metrics;
use crate::server::ops::{health_handler, metrics_handler};
use crate::tasks::TaskQueue;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub queue: Arc<dyn TaskQueue>,
    pub metrics: Arc<ServiceMetrics>,
}

/// Build the Axum application router.
///
/// The metrics layer wraps only the message endpoints; scraping /metrics or
/// probing /health does not count as traffic, so a scrape has no side effect
/// on the registry it reads.
pub fn build_app(state: AppState) -> Router {
    let api = Router::new()
        .route("/messages", post(create_message).get(list_messages))
        .route("/messages/stats", get(message_stats))
        .route("/messages/:id", get(get_message))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            track_metrics,
        ));

    let ops = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler));

    api.merge(ops)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
