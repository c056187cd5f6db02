use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::models::chat::{AskRequest, AskResponse};
use crate::services::conversation::ConversationManager;
use crate::utils::error::ApiError;

pub async fn ask_handler(
    State(manager): State<Arc<ConversationManager>>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let start_time = Instant::now();
    let span = info_span!(
        "ask",
        request_id = %Uuid::new_v4(),
        session_id = %request.session_id
    );

    let response = manager
        .handle_message(&request.session_id, &request.query)
        .instrument(span)
        .await?;

    info!(
        "Answered session {} in {:?} ({} chars)",
        request.session_id,
        start_time.elapsed(),
        response.len()
    );

    Ok(Json(AskResponse { response }))
}
