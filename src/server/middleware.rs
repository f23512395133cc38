use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::ErrorLabel;
use crate::server::AppState;

/// Middleware recording request metrics.
///
/// Emits exactly one request count and one latency observation per call,
/// covering every exit path, plus an error-kind count when the handler
/// produced an ApiError. The endpoint label is the matched route template
/// (e.g. `/messages/:id`), which keeps label cardinality bounded.
pub async fn track_metrics(
    State(state): State<AppState>,
    matched_path: MatchedPath,
    request: Request,
    next: Next,
) -> Response {
    let endpoint = matched_path.as_str().to_owned();
    let method = request.method().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status().as_u16().to_string();
    state.metrics.http_requests.inc(&[
        ("method", method.as_str()),
        ("endpoint", &endpoint),
        ("status", &status),
    ]);
    state
        .metrics
        .http_latency
        .observe(&[("endpoint", &endpoint)], elapsed);

    if let Some(label) = response.extensions().get::<ErrorLabel>() {
        state
            .metrics
            .api_errors
            .inc(&[("endpoint", &endpoint), ("kind", label.0)]);
    }

    response
}
