//! Conversation memory management module
//!
//! Provides in-memory conversation state management with:
//! - Thread-safe session store (DashMap)
//! - Contextual query building with intent-aware resets
//! - Request orchestration over retrieval and LLM providers

mod context_builder;
mod error;
pub mod manager;
mod store;
pub mod types;

pub use context_builder::{ContextBuilder, ContextualQuery, DATA_PLACEHOLDER, PRICING_MARKER};
pub use error::ConversationError;
pub use manager::{
    ConversationManager, LlmProvider, RetrievalChunk, RetrievalProvider, FALLBACK_LLM_REPLY,
    NO_CONTEXT_REPLY,
};
pub use store::{InMemorySessionStore, SessionStore};
pub use types::{EvictionPolicy, SessionState, StoreStats};

pub use crate::models::chat::{ChatMessage, SessionId};
