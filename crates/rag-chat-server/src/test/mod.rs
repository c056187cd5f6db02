mod conversation_test;

use std::sync::Arc;

use crate::logging::ActivityLogger;
use crate::services::conversation::manager::{MockLlmProvider, MockRetrievalProvider};
use crate::services::conversation::{
    ContextBuilder, ConversationManager, InMemorySessionStore, RetrievalChunk,
};

pub(crate) fn chunk(content: &str, service: &str) -> RetrievalChunk {
    RetrievalChunk {
        chunk_id: 1,
        content: content.to_string(),
        service: Some(service.to_string()),
        source: Some("services.json".to_string()),
        similarity: 0.82,
    }
}

pub(crate) fn manager_with(
    store: Arc<InMemorySessionStore>,
    retrieval: MockRetrievalProvider,
    llm: MockLlmProvider,
) -> ConversationManager {
    ConversationManager::new(
        store,
        ContextBuilder::default(),
        Box::new(retrieval),
        Box::new(llm),
        ActivityLogger::disabled(),
        1,
    )
}
