use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::models::chat::{SessionId, TranscriptResponse};
use crate::services::conversation::ConversationManager;
use crate::utils::error::ApiError;

/// Clear a session's transcript and intent
pub async fn reset_session_handler(
    State(manager): State<Arc<ConversationManager>>,
    Path(session_id): Path<SessionId>,
) -> Result<StatusCode, ApiError> {
    manager.reset_session(&session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn transcript_handler(
    State(manager): State<Arc<ConversationManager>>,
    Path(session_id): Path<SessionId>,
) -> Result<Json<TranscriptResponse>, ApiError> {
    let messages = manager.transcript(&session_id)?;
    Ok(Json(TranscriptResponse {
        session_id,
        messages,
    }))
}

pub async fn not_found_handler(uri: axum::http::Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}
