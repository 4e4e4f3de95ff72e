//! Error types for the Paideia study assistant
//!
//! This module provides structured error definitions using thiserror, with
//! anyhow available for error propagation at the binary boundary.

use thiserror::Error;

/// Main error type for Paideia operations
#[derive(Error, Debug)]
pub enum PaideiaError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// LLM generation request failed
    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// Embedding generation failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Session not found
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Quiz attempt not found
    #[error("Quiz attempt not found: {0}")]
    AttemptNotFound(i64),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid operation (e.g., unknown task status)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Paideia operations
pub type Result<T> = std::result::Result<T, PaideiaError>;

impl From<libsql::Error> for PaideiaError {
    fn from(err: libsql::Error) -> Self {
        PaideiaError::Database(err.to_string())
    }
}

/// Convert anyhow::Error to PaideiaError
impl From<anyhow::Error> for PaideiaError {
    fn from(err: anyhow::Error) -> Self {
        PaideiaError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PaideiaError::SessionNotFound("abc123".to_string());
        assert_eq!(err.to_string(), "Session not found: abc123");
    }

    #[test]
    fn test_attempt_not_found_display() {
        let err = PaideiaError::AttemptNotFound(42);
        assert_eq!(err.to_string(), "Quiz attempt not found: 42");
    }
}
