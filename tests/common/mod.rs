//! Shared test fixtures: scripted model services and a wired-up agent
#![allow(dead_code)]

use async_trait::async_trait;
use paideia::error::Result;
use paideia::services::{Embedder, TextGenerator};
use paideia::storage::test_utils::create_test_store;
use paideia::storage::ProgressStore;
use paideia::{LibsqlProgress, StudyAgent, VectorMemory};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Generator that replays scripted responses and records every prompt
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(String::from).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "ok".to_string()))
    }
}

/// Generator that always fails, for exercising the error output path
pub struct FailingGenerator;

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(paideia::PaideiaError::LlmApi(
            "model backend unavailable".to_string(),
        ))
    }
}

/// Deterministic embedder mapping known words onto fixed axes
pub struct KeywordEmbedder;

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

/// A fully wired agent over a temp-file store, an ephemeral memory, and the
/// given generator
pub async fn build_agent(
    generator: Arc<dyn TextGenerator>,
) -> (Arc<StudyAgent>, Arc<LibsqlProgress>, Arc<VectorMemory>) {
    let store = create_test_store().await.expect("failed to create store");
    let memory = Arc::new(VectorMemory::ephemeral(Arc::new(KeywordEmbedder)));
    let agent = Arc::new(StudyAgent::new(
        memory.clone(),
        generator,
        store.clone() as Arc<dyn ProgressStore>,
    ));
    (agent, store, memory)
}

/// Raw quiz text in the format the quiz prompt asks the model for
pub const SAMPLE_QUIZ: &str = "Q: What is the height of a balanced binary tree with n nodes? \
A) O(n) B) O(log n) C) O(1) D) O(n^2) Answer: B Explanation: Balancing keeps depth logarithmic.\n\
Q: Which traversal visits the root first? \
A) Inorder B) Postorder C) Preorder D) Level-order, Answer: C, Explanation: Preorder is root-left-right.";
