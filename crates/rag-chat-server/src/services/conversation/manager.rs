use anyhow::Result;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::logging::{ActivityLog, ActivityLogger, ActivityStatus, ActivityType};
use crate::models::chat::ChatMessage;

use super::context_builder::ContextBuilder;
use super::error::ConversationError;
use super::store::SessionStore;
use super::types::StoreStats;

/// Reply when retrieval finds nothing to ground an answer on
pub const NO_CONTEXT_REPLY: &str = "I don't know";

/// Reply recorded and returned when the LLM call fails
pub const FALLBACK_LLM_REPLY: &str = "⚠️ There was an issue generating a response.";

/// Trait for retrieval service
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RetrievalProvider: Send + Sync {
    /// Nearest passages for `query`, best first
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievalChunk>>;
}

/// Trait for LLM service
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Chunk result from retrieval
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalChunk {
    pub chunk_id: i64,
    pub content: String,
    /// Service label assigned at ingestion time
    pub service: Option<String>,
    pub source: Option<String>,
    pub similarity: f32,
}

pub struct ConversationManager {
    store: Arc<dyn SessionStore>,
    context_builder: ContextBuilder,
    retrieval_provider: Box<dyn RetrievalProvider>,
    llm_provider: Box<dyn LlmProvider>,
    logger: ActivityLogger,
    retrieval_top_k: usize,
    /// One lock per session so exchanges on the same session never interleave
    turn_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ConversationManager {
    pub fn new(
        store: Arc<dyn SessionStore>,
        context_builder: ContextBuilder,
        retrieval_provider: Box<dyn RetrievalProvider>,
        llm_provider: Box<dyn LlmProvider>,
        logger: ActivityLogger,
        retrieval_top_k: usize,
    ) -> Self {
        Self {
            store,
            context_builder,
            retrieval_provider,
            llm_provider,
            logger,
            retrieval_top_k: retrieval_top_k.max(1),
            turn_locks: DashMap::new(),
        }
    }

    /// Answer one user message and record the exchange in session memory
    pub async fn handle_message(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<String, ConversationError> {
        Self::validate_session_id(session_id)?;
        if message.is_empty() {
            return Err(ConversationError::InvalidInput("query must not be empty".to_string()));
        }

        let start_time = Instant::now();
        let lock = self.turn_lock(session_id);
        let _turn = lock.lock().await;

        info!("Received query for session {}", session_id);
        self.logger.log(
            ActivityLog::builder(session_id, ActivityType::RequestReceived)
                .message(message)
                .status(ActivityStatus::Info)
                .build(),
        );

        // STEP 1: contextual query (may reset the transcript)
        let query = self
            .context_builder
            .build_query(self.store.as_ref(), session_id, message);
        let intent = self.store.intent(session_id);

        if query.transcript_reset {
            let mut log = ActivityLog::builder(session_id, ActivityType::TranscriptReset)
                .status(ActivityStatus::Warning);
            if let Some(intent) = intent {
                log = log.intent(intent.as_str());
            }
            self.logger.log(log.build());
        }

        // STEP 2: retrieval, failures propagate
        let retrieval_start = Instant::now();
        let chunks = match self
            .retrieval_provider
            .search(&query.text, self.retrieval_top_k)
            .await
        {
            Ok(chunks) => chunks,
            Err(e) => {
                error!("Retrieval failed for session {}: {:#}", session_id, e);
                self.logger.log(
                    ActivityLog::builder(session_id, ActivityType::RetrievalError)
                        .message(&query.text)
                        .error(format!("{:#}", e), "retrieval")
                        .build(),
                );
                return Err(ConversationError::Retrieval(e));
            }
        };
        let retrieval_ms = retrieval_start.elapsed().as_millis() as i32;

        let chunks: Vec<_> = chunks
            .into_iter()
            .filter(|chunk| !chunk.content.trim().is_empty())
            .collect();

        if chunks.is_empty() {
            warn!("No passages found for session {}, answering without LLM", session_id);
            self.logger.log(
                ActivityLog::builder(session_id, ActivityType::RetrievalEmpty)
                    .message(&query.text)
                    .retrieval_duration(retrieval_ms)
                    .status(ActivityStatus::Warning)
                    .build(),
            );
            return Ok(NO_CONTEXT_REPLY.to_string());
        }

        debug!("Retrieved {} passages in {}ms", chunks.len(), retrieval_ms);
        self.logger.log(
            ActivityLog::builder(session_id, ActivityType::RetrievalExecuted)
                .message(&query.text)
                .retrieval_count(chunks.len() as i32)
                .similarity(chunks[0].similarity)
                .retrieval_duration(retrieval_ms)
                .build(),
        );

        // STEP 3: system instruction with the passage
        let system_message = self.context_builder.build_system_message(&chunks);

        // STEP 4: record the user message
        self.store.append(session_id, ChatMessage::user(message));

        // STEP 5: LLM call, failures become the fallback reply
        let llm_messages: Vec<ChatMessage> = std::iter::once(system_message)
            .chain(self.store.transcript(session_id))
            .collect();

        let llm_start = Instant::now();
        let reply = match self.llm_provider.generate(&llm_messages).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("LLM error for session {}: {:#}", session_id, e);
                self.logger.log(
                    ActivityLog::builder(session_id, ActivityType::LlmError)
                        .error(format!("{:#}", e), "llm")
                        .build(),
                );
                FALLBACK_LLM_REPLY.to_string()
            }
        };
        let llm_ms = llm_start.elapsed().as_millis() as i32;

        // STEP 6: record the reply
        self.store.append(session_id, ChatMessage::assistant(reply.clone()));

        let processing_ms = start_time.elapsed().as_millis() as i32;
        info!("Session {} answered in {}ms", session_id, processing_ms);

        let mut log = ActivityLog::builder(session_id, ActivityType::MessageSent)
            .message(message)
            .response(&reply)
            .llm_duration(llm_ms)
            .processing_time(processing_ms);
        if let Some(intent) = intent {
            log = log.intent(intent.as_str());
        }
        self.logger.log(log.build());

        Ok(reply)
    }

    /// Clear a session's transcript and intent. No-op for unknown sessions.
    pub async fn reset_session(&self, session_id: &str) -> Result<(), ConversationError> {
        Self::validate_session_id(session_id)?;

        let lock = self.turn_lock(session_id);
        let _turn = lock.lock().await;

        self.store.reset(session_id);
        info!("Session {} reset by caller", session_id);
        self.logger.log(
            ActivityLog::builder(session_id, ActivityType::SessionReset)
                .status(ActivityStatus::Info)
                .build(),
        );
        Ok(())
    }

    pub fn transcript(&self, session_id: &str) -> Result<Vec<ChatMessage>, ConversationError> {
        Self::validate_session_id(session_id)?;
        Ok(self.store.transcript(session_id))
    }

    /// Drop expired sessions and idle turn locks
    pub fn cleanup_expired_sessions(&self) -> usize {
        let removed = self.store.cleanup_expired();
        // Only this map holds an idle lock
        self.turn_locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        removed
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    pub fn logger(&self) -> &ActivityLogger {
        &self.logger
    }

    fn turn_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.turn_locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn validate_session_id(session_id: &str) -> Result<(), ConversationError> {
        if session_id.is_empty() {
            return Err(ConversationError::InvalidInput(
                "session_id must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
