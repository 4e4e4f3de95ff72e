//! Embedding generation for the vector memory
//!
//! Generates embedding vectors for ingested texts and queries. Embeddings are
//! best-effort: a transport failure degrades to a zero vector (which scores
//! zero against everything) so retrieval never fails a request.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::llm::LlmConfig;

/// Dimension of the fallback zero vector when the embedding call fails
pub const FALLBACK_DIM: usize = 4096;

/// Embedding contract: `embed(text) -> vector`
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Ollama-backed embedder
pub struct OllamaEmbedder {
    config: LlmConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self { config, client })
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.config.model,
            prompt: text,
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.config.base_url))
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body: EmbeddingResponse = response.json().await?;
        Ok(body.embedding)
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Generating embedding for text ({} chars)", text.len());

        match self.request_embedding(text).await {
            Ok(embedding) if !embedding.is_empty() => Ok(embedding),
            Ok(_) => {
                warn!("Embedding API returned an empty vector, using zero vector");
                Ok(vec![0.0; FALLBACK_DIM])
            }
            Err(e) => {
                warn!("Embedding request failed, using zero vector: {}", e);
                Ok(vec![0.0; FALLBACK_DIM])
            }
        }
    }
}

/// Normalize a vector to unit length in place; zero vectors are left as-is
pub fn normalize(vector: &mut [f32]) {
    let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for val in vector.iter_mut() {
            *val /= magnitude;
        }
    }
}

/// Calculate cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}
