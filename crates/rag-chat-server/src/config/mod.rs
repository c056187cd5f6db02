pub mod settings;

pub use settings::{
    ActivityLogConfig, ActivitySinkKind, DatabaseConfig, EmbeddingConfig, LlmConfig, MemoryConfig,
    PromptsConfig, RagConfig, ServerConfig, Settings,
};
