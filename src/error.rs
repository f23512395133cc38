use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Error kind label carried on error responses so the metrics middleware can
/// increment api_errors_total exactly once per error.
#[derive(Clone, Copy, Debug)]
pub struct ErrorLabel(pub &'static str);

/// Errors surfaced at the API boundary
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("content is required and must be non-empty")]
    InvalidContent,

    #[error("request body must be a JSON object with a content field")]
    InvalidBody,

    #[error("message id must be an integer")]
    InvalidId,

    #[error("status must be one of pending, processing, completed, failed")]
    InvalidStatusFilter,

    #[error("message {0} not found")]
    NotFound(i64),

    #[error("storage unavailable: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to enqueue message: {0}")]
    Enqueue(#[source] anyhow::Error),
}

impl ApiError {
    /// Label value for the api_errors_total `kind` dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidContent
            | ApiError::InvalidBody
            | ApiError::InvalidId
            | ApiError::InvalidStatusFilter => "validation",
            ApiError::NotFound(_) => "not_found",
            ApiError::Database(_) => "storage",
            ApiError::Enqueue(_) => "queue",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidContent
            | ApiError::InvalidBody
            | ApiError::InvalidId
            | ApiError::InvalidStatusFilter => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Database(_) | ApiError::Enqueue(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }

        let kind = self.kind();
        let mut response = (status, Json(json!({ "error": self.to_string() }))).into_response();
        response.extensions_mut().insert(ErrorLabel(kind));
        response
    }
}
