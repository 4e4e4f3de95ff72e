//! Text generation service
//!
//! Wraps an Ollama-compatible completion endpoint behind the [`TextGenerator`]
//! trait. The core treats generation as an opaque collaborator: one prompt in,
//! one completion out, transport failures surfaced as task-level errors.

use crate::error::{PaideiaError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Configuration for the generation service
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Base URL of the Ollama server
    pub base_url: String,

    /// Model to use for generation and embeddings
    pub model: String,

    /// Request timeout
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".to_string(),
            model: "llama3.2".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Text completion contract: `generate(prompt) -> text`
///
/// May fail on transport errors; the task graph converts those failures into
/// an error output payload rather than crashing the request.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Ollama-backed generator
pub struct OllamaGenerator {
    config: LlmConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

impl OllamaGenerator {
    /// Create a new generator with custom config
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(PaideiaError::Http)?;

        Ok(Self { config, client })
    }

    /// Create with default config
    pub fn with_default() -> Result<Self> {
        Self::new(LlmConfig::default())
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!("Calling generation API ({} chars)", prompt.len());

        let request = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.config.base_url))
            .json(&request)
            .send()
            .await
            .map_err(PaideiaError::Http)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PaideiaError::LlmApi(format!(
                "generation request failed with status {}: {}",
                status, error_text
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| PaideiaError::LlmApi(format!("failed to parse response: {}", e)))?;

        Ok(body.response)
    }
}
