//! Runtime configuration
//!
//! Settings come from built-in defaults overridden by `PAIDEIA_*` environment
//! variables (e.g. `PAIDEIA_OLLAMA_URL`, `PAIDEIA_MODEL`). There are no
//! secrets: the model backend is a local Ollama server.

use crate::error::Result;
use crate::services::LlmConfig;
use serde::Deserialize;
use std::time::Duration;

/// Application settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Address the HTTP server binds to
    pub listen_addr: String,

    /// Directory holding the database and the memory store file
    pub data_dir: String,

    /// Path to the progress database
    pub database_path: String,

    /// Base URL of the Ollama server
    pub ollama_url: String,

    /// Model used for generation and embeddings
    pub model: String,

    /// Model request timeout in seconds
    pub timeout_secs: u64,
}

impl Settings {
    /// Load settings from defaults and `PAIDEIA_*` environment overrides
    pub fn load() -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("listen_addr", "127.0.0.1:8001")?
            .set_default("data_dir", "data")?
            .set_default("database_path", "data/chat.db")?
            .set_default("ollama_url", "http://127.0.0.1:11434")?
            .set_default("model", "llama3.2")?
            .set_default("timeout_secs", 60_i64)?
            .add_source(config::Environment::with_prefix("PAIDEIA"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Model service configuration derived from these settings
    pub fn llm_config(&self) -> LlmConfig {
        LlmConfig {
            base_url: self.ollama_url.clone(),
            model: self.model.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::load().unwrap();
        assert_eq!(settings.listen_addr, "127.0.0.1:8001");
        assert_eq!(settings.model, "llama3.2");
        assert_eq!(settings.llm_config().timeout, Duration::from_secs(60));
    }
}
