pub mod conversation;
pub mod embedding_service;
pub mod llm_service;
pub mod query_analyzer;
pub mod rag_service;

pub use embedding_service::EmbeddingService;
pub use llm_service::LlmService;
pub use query_analyzer::{QueryAnalyzer, ServiceIntent};
pub use rag_service::RagService;
