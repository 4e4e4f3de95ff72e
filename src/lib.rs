//! Paideia - Personalized Study Assistant
//!
//! An agentic study backend built around a small task graph: each request
//! retrieves relevant study material from a vector memory, runs exactly one
//! learning task (tutor, quiz, analyze, roadmap, questions) against a local
//! Ollama model, and persists the results as learning progress.
//!
//! # Architecture
//!
//! - **Types**: Core data structures (task kinds, parsed questions, records)
//! - **Services**: Ollama generation and embedding adapters
//! - **Memory**: Vector store with cosine similarity retrieval
//! - **Storage**: libsql-backed progress store (sessions, quizzes, mastery)
//! - **Agent**: The task graph itself
//! - **Orchestrators**: Recommendations and the guided learn cycle
//! - **API**: Axum HTTP server
//!
//! # Example
//!
//! ```ignore
//! use paideia::{StudyAgent, TaskKind, VectorMemory};
//!
//! let response = agent
//!     .run(TaskKind::Quiz, "binary search trees", &[], None)
//!     .await?;
//! ```

pub mod agent;
pub mod api;
pub mod config;
pub mod error;
pub mod learn;
pub mod memory;
pub mod orchestrator;
pub mod quiz;
pub mod services;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use agent::StudyAgent;
pub use config::Settings;
pub use error::{PaideiaError, Result};
pub use learn::LearnOrchestrator;
pub use memory::VectorMemory;
pub use orchestrator::Orchestrator;
pub use quiz::parse_quiz_output;
pub use services::{Embedder, LlmConfig, OllamaEmbedder, OllamaGenerator, TextGenerator};
pub use storage::{libsql::ConnectionMode, libsql::LibsqlProgress, ProgressStore};
pub use types::{AgentResponse, ParsedQuestion, TaskKind, TaskOutput, TaskStatus};
