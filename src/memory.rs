//! Vector memory for context retrieval
//!
//! Stores ingested texts with their embeddings and answers top-k cosine
//! similarity queries. The store persists to a JSON file under the data
//! directory and reloads on startup, so ingested material survives restarts.
//!
//! Retrieval is a best-effort collaborator: an empty store, an empty query,
//! or a failed embedding all produce an empty or low-scoring result list,
//! never an error.

use crate::error::Result;
use crate::services::embeddings::{cosine_similarity, normalize, Embedder};
use crate::types::RetrievedSnippet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const STORE_FILE: &str = "memory_store.json";

/// One ingested document with its normalized embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MemoryEntry {
    id: String,
    text: String,
    #[serde(default)]
    meta: HashMap<String, Value>,
    embedding: Vec<f32>,
}

/// Vector memory backed by cosine similarity over normalized embeddings
pub struct VectorMemory {
    embedder: Arc<dyn Embedder>,
    entries: RwLock<Vec<MemoryEntry>>,
    store_path: Option<PathBuf>,
}

impl VectorMemory {
    /// Create a memory store persisting under `data_dir`, loading any
    /// previously saved entries
    pub fn new(embedder: Arc<dyn Embedder>, data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let store_path = data_dir.join(STORE_FILE);
        let entries = Self::load(&store_path)?;
        if !entries.is_empty() {
            info!("Loaded {} memory entries from {:?}", entries.len(), store_path);
        }

        Ok(Self {
            embedder,
            entries: RwLock::new(entries),
            store_path: Some(store_path),
        })
    }

    /// Create an in-memory store with no persistence (for tests)
    pub fn ephemeral(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(Vec::new()),
            store_path: None,
        }
    }

    fn load(path: &Path) -> Result<Vec<MemoryEntry>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(path)?;
        match serde_json::from_str(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!("Memory store at {:?} is unreadable, starting empty: {}", path, e);
                Ok(Vec::new())
            }
        }
    }

    fn save(&self, entries: &[MemoryEntry]) {
        let Some(path) = &self.store_path else {
            return;
        };
        match serde_json::to_string(entries) {
            Ok(raw) => {
                if let Err(e) = std::fs::write(path, raw) {
                    warn!("Failed to persist memory store: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialize memory store: {}", e),
        }
    }

    /// Ingest texts; returns one generated id per text, in order
    pub async fn add_texts(
        &self,
        texts: Vec<String>,
        metadatas: Option<Vec<HashMap<String, Value>>>,
    ) -> Result<Vec<String>> {
        let metas = metadatas.unwrap_or_else(|| vec![HashMap::new(); texts.len()]);

        let mut new_entries = Vec::with_capacity(texts.len());
        let mut ids = Vec::with_capacity(texts.len());
        for (text, meta) in texts.into_iter().zip(metas.into_iter()) {
            let mut embedding = self.embedder.embed(&text).await?;
            normalize(&mut embedding);
            let id = uuid::Uuid::new_v4().to_string();
            ids.push(id.clone());
            new_entries.push(MemoryEntry {
                id,
                text,
                meta,
                embedding,
            });
        }

        let mut entries = self.entries.write().await;
        entries.extend(new_entries);
        self.save(&entries);
        debug!("Memory store now holds {} entries", entries.len());

        Ok(ids)
    }

    /// Top-k similarity search; never fails
    ///
    /// An empty store yields an empty list. A query whose embedding fails
    /// (zero vector) scores zero against everything, yielding low-relevance
    /// results rather than an error.
    pub async fn similarity_search(&self, query: &str, k: usize) -> Vec<RetrievedSnippet> {
        let entries = self.entries.read().await;
        if entries.is_empty() {
            return Vec::new();
        }

        let query_embedding = match self.embedder.embed(query).await {
            Ok(mut embedding) => {
                normalize(&mut embedding);
                embedding
            }
            Err(e) => {
                warn!("Query embedding failed, returning no results: {}", e);
                return Vec::new();
            }
        };

        let mut scored: Vec<RetrievedSnippet> = entries
            .iter()
            .map(|entry| RetrievedSnippet {
                text: entry.text.clone(),
                score: cosine_similarity(&query_embedding, &entry.embedding),
                meta: entry.meta.clone(),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }

    /// Number of stored entries
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store is empty
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Deterministic embedder: maps known words onto fixed axes
    struct KeywordEmbedder;

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let lower = text.to_lowercase();
            let axes = ["array", "pointer", "recursion", "graph"];
            let mut v = vec![0.01; axes.len()];
            for (i, word) in axes.iter().enumerate() {
                if lower.contains(word) {
                    v[i] = 1.0;
                }
            }
            Ok(v)
        }
    }

    #[tokio::test]
    async fn test_empty_store_returns_nothing() {
        let memory = VectorMemory::ephemeral(Arc::new(KeywordEmbedder));
        assert!(memory.similarity_search("arrays", 5).await.is_empty());
    }

    #[tokio::test]
    async fn test_add_and_search() {
        let memory = VectorMemory::ephemeral(Arc::new(KeywordEmbedder));
        let ids = memory
            .add_texts(
                vec![
                    "array basics and indexing".to_string(),
                    "pointer arithmetic".to_string(),
                    "graph traversal".to_string(),
                ],
                None,
            )
            .await
            .unwrap();
        assert_eq!(ids.len(), 3);
        assert_eq!(memory.len().await, 3);

        let results = memory.similarity_search("tell me about array layout", 2).await;
        assert_eq!(results.len(), 2);
        assert!(results[0].text.contains("array"));
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();

        {
            let memory =
                VectorMemory::new(Arc::new(KeywordEmbedder), dir.path()).unwrap();
            memory
                .add_texts(vec!["recursion and base cases".to_string()], None)
                .await
                .unwrap();
        }

        let reloaded = VectorMemory::new(Arc::new(KeywordEmbedder), dir.path()).unwrap();
        assert_eq!(reloaded.len().await, 1);
        let results = reloaded.similarity_search("recursion", 1).await;
        assert_eq!(results.len(), 1);
        assert!(results[0].text.contains("recursion"));
    }
}
