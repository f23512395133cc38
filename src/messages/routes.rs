//! HTTP handlers for the message endpoints.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::messages::{Message, MessageStatus, StatusCounts};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateMessageRequest {
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateMessageResponse {
    pub id: i64,
    pub status: MessageStatus,
}

/// Client-facing view of a message.
#[derive(Debug, Serialize)]
pub struct MessageView {
    pub id: i64,
    pub content: String,
    pub status: MessageStatus,
}

impl From<Message> for MessageView {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            content: message.content,
            status: message.status,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub status: Option<MessageStatus>,
}

/// POST /messages
///
/// Persists a pending message, then enqueues its id. The response does not
/// wait for processing; clients poll GET /messages/{id} for progress.
///
/// Extractor failures are mapped into the ApiError taxonomy rather than
/// surfacing axum's plain-text rejections.
pub async fn create_message(
    State(state): State<AppState>,
    body: Result<Json<CreateMessageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateMessageResponse>), ApiError> {
    let Json(body) = body.map_err(|_| ApiError::InvalidBody)?;
    let content = body.content.unwrap_or_default();
    if content.trim().is_empty() {
        return Err(ApiError::InvalidContent);
    }

    let message = Message::create(&content, &state.pool).await?;
    state
        .queue
        .enqueue(message.id)
        .await
        .map_err(ApiError::Enqueue)?;

    tracing::info!(message_id = message.id, "message accepted");

    Ok((
        StatusCode::CREATED,
        Json(CreateMessageResponse {
            id: message.id,
            status: message.status,
        }),
    ))
}

/// GET /messages
pub async fn list_messages(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<MessageView>>, ApiError> {
    let Query(params) = params.map_err(|_| ApiError::InvalidStatusFilter)?;
    let messages = Message::list(params.status, &state.pool).await?;
    Ok(Json(messages.into_iter().map(MessageView::from).collect()))
}

/// GET /messages/{id}
pub async fn get_message(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageView>, ApiError> {
    let Path(id) = id.map_err(|_| ApiError::InvalidId)?;
    let message = Message::find_by_id(id, &state.pool)
        .await?
        .ok_or(ApiError::NotFound(id))?;
    Ok(Json(message.into()))
}

/// GET /messages/stats
pub async fn message_stats(
    State(state): State<AppState>,
) -> Result<Json<StatusCounts>, ApiError> {
    let counts = Message::counts_by_status(&state.pool).await?;
    Ok(Json(counts))
}
