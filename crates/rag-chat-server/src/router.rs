use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::handlers;
use crate::state::AppState;
use crate::utils::handle_panic;

pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check));

    let chat_routes = Router::new()
        .route("/ask", post(handlers::ask::ask_handler))
        .route(
            "/api/sessions/{session_id}/reset",
            post(handlers::session::reset_session_handler),
        )
        .route(
            "/api/sessions/{session_id}/messages",
            get(handlers::session::transcript_handler),
        );

    Router::new()
        .merge(public_routes)
        .merge(chat_routes)
        .fallback(handlers::session::not_found_handler)
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        // CORS
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        // Tracing
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
}
