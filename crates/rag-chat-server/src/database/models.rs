use sqlx::FromRow;

/// One indexed chunk returned by a nearest-neighbour search
#[derive(Debug, Clone, FromRow)]
pub struct PassageRow {
    pub chunk_id: i64,
    pub content: String,
    pub service: Option<String>,
    pub source: Option<String>,
    pub similarity: f32,
}
