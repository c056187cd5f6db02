use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::services::conversation::ConversationManager;

#[derive(Serialize)]
pub struct RootResponse {
    message: &'static str,
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    status: &'static str,
    active_sessions: usize,
    total_messages: usize,
    activity_queue: usize,
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse { message: "ok" })
}

pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

pub async fn readiness_check(
    State(manager): State<Arc<ConversationManager>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let stats = manager.stats();
    (
        StatusCode::OK,
        Json(ReadinessResponse {
            status: "ready",
            active_sessions: stats.active_sessions,
            total_messages: stats.total_messages,
            activity_queue: manager.logger().queue_len(),
        }),
    )
}
