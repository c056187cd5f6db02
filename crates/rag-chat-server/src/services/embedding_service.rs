use crate::config::EmbeddingConfig;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    content: &'a str,
    input: &'a str,
}

/// Client for an embedding server (llama.cpp `/embedding` or OpenAI-style)
#[derive(Clone)]
pub struct EmbeddingService {
    client: Client,
    base_url: String,
    dimension: usize,
}

impl EmbeddingService {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create embedding HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            dimension: config.dimension,
        })
    }

    /// Generate embedding for a single text
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Generating embedding for {} chars", text.len());

        // Send both keys, servers ignore the one they don't use
        let request = EmbeddingRequest {
            content: text,
            input: text,
        };

        let url = format!("{}/embedding", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to connect to embedding server")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Embedding API error ({}): {}", status, body);
        }

        let json_value: Value = response
            .json()
            .await
            .context("Failed to parse embedding response as JSON")?;

        let embedding = parse_embedding(&json_value)?;

        if embedding.len() != self.dimension {
            anyhow::bail!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.dimension,
                embedding.len()
            );
        }

        Ok(embedding)
    }
}

/// Accepts the response shapes seen in the wild:
/// `{"embedding": [...]}`, `[{"embedding": [...]}]`, `[...]`,
/// `{"data": [{"embedding": [...]}]}`, and llama.cpp's nested
/// `[{"embedding": [[...]]}]` (first row is used).
pub fn parse_embedding(value: &Value) -> Result<Vec<f32>> {
    let raw = if let Some(arr) = value.as_array() {
        let first = arr
            .first()
            .context("Empty array returned from embedding server")?;
        if first.is_object() {
            &first["embedding"]
        } else {
            value
        }
    } else if value["embedding"].is_array() {
        &value["embedding"]
    } else if let Some(data) = value["data"].as_array() {
        data.first()
            .map(|d| &d["embedding"])
            .context("Empty data array returned from embedding server")?
    } else {
        anyhow::bail!("Unrecognized embedding response format: {}", value);
    };

    let numbers = match raw.as_array() {
        // Nested per-token/pooled rows, take the first one
        Some(rows) if rows.first().is_some_and(Value::is_array) => rows[0]
            .as_array()
            .context("Malformed nested embedding")?,
        Some(numbers) => numbers,
        None => anyhow::bail!("Unrecognized embedding response format: {}", value),
    };

    let embedding: Vec<f32> = numbers
        .iter()
        .filter_map(|v| v.as_f64().map(|f| f as f32))
        .collect();

    if embedding.is_empty() {
        anyhow::bail!("Generated embedding is empty");
    }

    Ok(embedding)
}
