use super::{DbPool, PassageRow};
use anyhow::Result;
use pgvector::Vector;
use tracing::debug;

pub struct Repository {
    pub pool: DbPool,
}

impl Repository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Cosine nearest-neighbour search over indexed chunks.
    /// `collection = None` searches every collection.
    pub async fn search_passages(
        &self,
        query_embedding: Vector,
        limit: i64,
        collection: Option<&str>,
    ) -> Result<Vec<PassageRow>> {
        let rows = sqlx::query_as::<_, PassageRow>(
            r#"SELECT
                chunk_id,
                content,
                service,
                source,
                (1 - (embedding <=> $1))::real AS similarity
               FROM document_chunks
               WHERE ($3::text IS NULL OR collection = $3)
               ORDER BY embedding <=> $1
               LIMIT $2"#,
        )
        .bind(query_embedding)
        .bind(limit)
        .bind(collection)
        .persistent(false)
        .fetch_all(self.pool.get_pool())
        .await?;

        debug!("Found {} passages (limit {})", rows.len(), limit);

        Ok(rows)
    }
}
