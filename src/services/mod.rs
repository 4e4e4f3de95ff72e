//! External collaborator services
//!
//! Wraps the two opaque collaborators the core depends on: text generation
//! and embedding generation. Both are exposed behind traits so tests can
//! substitute fakes for the network clients.

pub mod embeddings;
pub mod llm;

pub use embeddings::{cosine_similarity, Embedder, OllamaEmbedder};
pub use llm::{LlmConfig, OllamaGenerator, TextGenerator};
