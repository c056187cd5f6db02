use crate::config::RagConfig;
use crate::database::{PassageRow, Repository};
use crate::services::conversation::{RetrievalChunk, RetrievalProvider};
use crate::services::EmbeddingService;
use anyhow::{Context, Result};
use pgvector::Vector;
use std::sync::Arc;
use tracing::{debug, info};

/// Vector retrieval over the indexed service documents
#[derive(Clone)]
pub struct RagService {
    pub repository: Arc<Repository>,
    pub embedding_service: Arc<EmbeddingService>,
    pub config: RagConfig,
}

impl RagService {
    pub fn new(
        repository: Arc<Repository>,
        embedding_service: Arc<EmbeddingService>,
        config: RagConfig,
    ) -> Self {
        Self {
            repository,
            embedding_service,
            config,
        }
    }

    fn collection(&self) -> Option<&str> {
        let collection = self.config.collection.trim();
        (!collection.is_empty()).then_some(collection)
    }
}

impl From<PassageRow> for RetrievalChunk {
    fn from(row: PassageRow) -> Self {
        Self {
            chunk_id: row.chunk_id,
            content: row.content,
            service: row.service,
            source: row.source,
            similarity: row.similarity,
        }
    }
}

#[async_trait::async_trait]
impl RetrievalProvider for RagService {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievalChunk>> {
        info!("Retrieving top {} passages for query: {}", top_k, query);

        let embedding = self
            .embedding_service
            .embed(query)
            .await
            .context("Failed to embed query")?;

        let rows = self
            .repository
            .search_passages(Vector::from(embedding), top_k as i64, self.collection())
            .await
            .context("Vector search failed")?;

        debug!("Retrieved {} passages", rows.len());

        Ok(rows.into_iter().map(RetrievalChunk::from).collect())
    }
}
