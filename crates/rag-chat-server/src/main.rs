use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use rag_chat_server::config::{ActivitySinkKind, Settings};
use rag_chat_server::database::{DbPool, Repository};
use rag_chat_server::logging::{
    init_tracing, ActivityLogger, ActivitySink, ActivityWorkers, PgActivitySink,
    TracingActivitySink,
};
use rag_chat_server::router::build_router;
use rag_chat_server::services::conversation::{
    ContextBuilder, ConversationManager, InMemorySessionStore,
};
use rag_chat_server::services::{EmbeddingService, LlmService, RagService};
use rag_chat_server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let _log_guard = init_tracing()?;

    info!("🚀 Starting RAG chat server...");

    // Load configuration
    let settings = Settings::load()?;
    info!("✅ Configuration loaded");

    // Initialize database pool
    let db_pool = DbPool::new(&settings.database).await?;
    info!("✅ Database connection established");

    let repository = Arc::new(Repository::new(db_pool.clone()));

    // Initialize services
    let embedding_service = Arc::new(EmbeddingService::new(&settings.embedding)?);
    let rag_service = RagService::new(repository, embedding_service, settings.rag.clone());
    let llm_service = LlmService::new(settings.llm.clone())?;

    let (activity_logger, activity_workers) = build_activity_logger(&settings, &db_pool);

    // Session memory
    let store = Arc::new(InMemorySessionStore::new(settings.memory.eviction_policy()));
    let context_builder = ContextBuilder::new(
        settings.prompts.system_prompt.clone(),
        settings.memory.history_window,
        settings.memory.intent_aware,
    );

    let conversation_manager = Arc::new(ConversationManager::new(
        store,
        context_builder,
        Box::new(rag_service),
        Box::new(llm_service),
        activity_logger,
        settings.rag.retrieval_top_k,
    ));
    info!(
        "✅ Conversation manager ready (history_window={}, intent_aware={})",
        settings.memory.history_window, settings.memory.intent_aware
    );

    let cleanup_task = spawn_session_cleanup(
        conversation_manager.clone(),
        settings.memory.cleanup_interval_seconds,
    );

    let app = build_router(AppState::new(conversation_manager));

    let addr = SocketAddr::from((
        settings
            .server
            .host
            .parse::<std::net::IpAddr>()
            .context("Invalid server.host")?,
        settings.server.port,
    ));

    info!("🎯 Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Last logger clones live in the router (already dropped) and the cleanup task
    if let Some(task) = cleanup_task {
        task.abort();
        let _ = task.await;
    }
    if let Some(workers) = activity_workers {
        workers.drain(Duration::from_secs(5)).await;
    }

    db_pool.close().await;
    info!("Server stopped");

    Ok(())
}

fn build_activity_logger(
    settings: &Settings,
    db_pool: &DbPool,
) -> (ActivityLogger, Option<ActivityWorkers>) {
    let config = &settings.activity_log;
    if !config.enabled {
        info!("Activity logging disabled");
        return (ActivityLogger::disabled(), None);
    }

    let sink: Arc<dyn ActivitySink> = match config.sink {
        ActivitySinkKind::Postgres => Arc::new(PgActivitySink::new(db_pool.get_pool().clone())),
        ActivitySinkKind::Tracing => Arc::new(TracingActivitySink),
    };
    info!("Activity logging to {:?}", config.sink);

    let (logger, workers) = ActivityLogger::new(sink, config.into());
    (logger, Some(workers))
}

/// Periodically drop idle sessions
fn spawn_session_cleanup(
    manager: Arc<ConversationManager>,
    interval_seconds: u64,
) -> Option<JoinHandle<()>> {
    if interval_seconds == 0 {
        return None;
    }

    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_seconds));
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = manager.cleanup_expired_sessions();
            if removed > 0 {
                info!("Evicted {} expired sessions", removed);
            } else {
                debug!("Session cleanup found nothing to evict");
            }
        }
    });
    Some(task)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
