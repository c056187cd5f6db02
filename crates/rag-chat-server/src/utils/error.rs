use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::services::conversation::ConversationError;

/// Errors surfaced at the HTTP boundary. The payload is logged, never sent.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: &'static str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_body(&self) -> ErrorResponse {
        match self {
            ApiError::BadRequest(_) => ErrorResponse {
                error: "BadRequest",
                message: "The request was invalid",
            },
            ApiError::NotFound(_) => ErrorResponse {
                error: "NotFound",
                message: "The requested resource does not exist",
            },
            ApiError::UpstreamUnavailable(_) => ErrorResponse {
                error: "UpstreamUnavailable",
                message: "Knowledge search is temporarily unavailable",
            },
            ApiError::Internal(_) => ErrorResponse {
                error: "Internal",
                message: "An internal error occurred",
            },
        }
    }
}

impl From<ConversationError> for ApiError {
    fn from(err: ConversationError) -> Self {
        match err {
            ConversationError::InvalidInput(msg) => ApiError::BadRequest(msg),
            e @ ConversationError::Retrieval(_) => ApiError::UpstreamUnavailable(e.to_string()),
        }
    }
}

/// Turns a handler panic into a plain 500
pub fn handle_panic(payload: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");

    ApiError::Internal(format!("handler panicked: {}", detail)).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::BadRequest(msg) => tracing::warn!("Bad request: {}", msg),
            ApiError::NotFound(msg) => tracing::warn!("Not found: {}", msg),
            ApiError::UpstreamUnavailable(msg) => tracing::error!("Upstream unavailable: {}", msg),
            ApiError::Internal(msg) => tracing::error!("Internal error: {}", msg),
        }

        (self.status(), Json(self.public_body())).into_response()
    }
}
