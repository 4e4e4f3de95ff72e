//! Study task graph
//!
//! [`StudyAgent`] runs one learning task per request: retrieve context, then
//! dispatch to exactly one task handler, then persist the side effects (user
//! and assistant messages, quiz attempts, weak topics). Handler failures are
//! converted into an error output payload so a model outage degrades the
//! response instead of failing the request.

use crate::error::Result;
use crate::memory::VectorMemory;
use crate::quiz::parse_quiz_output;
use crate::services::TextGenerator;
use crate::storage::ProgressStore;
use crate::types::{
    AgentResponse, ChatRole, ParsedQuestion, RetrievedSnippet, TaskKind, TaskOutput,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Number of snippets retrieved per request
const RETRIEVAL_K: usize = 5;

/// Weak topics injected into a quiz prompt, at most
const QUIZ_FOCUS_TOPICS: usize = 3;

/// The study assistant's task graph: retrieve, dispatch, persist
pub struct StudyAgent {
    memory: Arc<VectorMemory>,
    generator: Arc<dyn TextGenerator>,
    store: Arc<dyn ProgressStore>,
}

impl StudyAgent {
    pub fn new(
        memory: Arc<VectorMemory>,
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn ProgressStore>,
    ) -> Self {
        Self {
            memory,
            generator,
            store,
        }
    }

    /// Run one task end to end
    ///
    /// Ensures the session, logs the user message, retrieves context, runs
    /// the task handler, then logs the assistant message plus any task
    /// side effects. `history` carries recent message contents for the
    /// analyze task, which reads it together with the request text; other
    /// tasks ignore it.
    pub async fn run(
        &self,
        task: TaskKind,
        user_input: &str,
        history: &[String],
        session_id: Option<&str>,
    ) -> Result<AgentResponse> {
        let session_id = self.store.ensure_session(session_id).await?;
        self.store
            .log_message(&session_id, ChatRole::User, user_input, Some(task), &json!({}))
            .await?;

        let retrieved = self.memory.similarity_search(user_input, RETRIEVAL_K).await;
        debug!(task = %task, snippets = retrieved.len(), "Dispatching task");

        let outcome = match task {
            TaskKind::Tutor => self.tutor(user_input, &retrieved).await,
            TaskKind::Quiz => self.quiz(&session_id, user_input, &retrieved).await,
            TaskKind::Analyze => self.analyze(user_input, history).await,
            TaskKind::Roadmap => self.roadmap(user_input, &retrieved).await,
            TaskKind::Questions => self.questions(user_input, &retrieved).await,
        };

        let output = match outcome {
            Ok(output) => output,
            Err(e) => {
                warn!(task = %task, "Task handler failed: {}", e);
                return Ok(AgentResponse {
                    task,
                    output: TaskOutput::Error {
                        error: e.to_string(),
                    },
                    meta: HashMap::new(),
                    session_id: Some(session_id),
                });
            }
        };

        let mut meta: HashMap<String, Value> = HashMap::new();
        meta.insert("retrieved".to_string(), serde_json::to_value(&retrieved)?);

        let output = self
            .persist_outcome(&session_id, task, user_input, output, &mut meta)
            .await?;

        Ok(AgentResponse {
            task,
            output,
            meta,
            session_id: Some(session_id),
        })
    }

    /// Log the attempt and assistant message, back-filling question ids
    async fn persist_outcome(
        &self,
        session_id: &str,
        task: TaskKind,
        user_input: &str,
        output: TaskOutput,
        meta: &mut HashMap<String, Value>,
    ) -> Result<TaskOutput> {
        let output = if let TaskOutput::Quiz { raw, mut questions } = output {
            let (attempt_id, question_ids) = self
                .store
                .log_quiz_attempt(
                    session_id,
                    user_input,
                    &raw,
                    &questions,
                    Some(task),
                    &Value::Object(meta.clone().into_iter().collect()),
                )
                .await?;
            for (question, id) in questions.iter_mut().zip(question_ids) {
                question.id = Some(id);
            }
            meta.insert("quiz_attempt_id".to_string(), json!(attempt_id));
            TaskOutput::Quiz { raw, questions }
        } else {
            output
        };

        self.store
            .log_message(
                session_id,
                ChatRole::Assistant,
                &output.as_message_text(),
                Some(task),
                &Value::Object(meta.clone().into_iter().collect()),
            )
            .await?;

        if let TaskOutput::Analysis { summary } = &output {
            if !summary.trim().is_empty() {
                self.store.log_weak_topics(session_id, summary).await?;
            }
        }

        Ok(output)
    }

    async fn tutor(
        &self,
        user_input: &str,
        retrieved: &[RetrievedSnippet],
    ) -> Result<TaskOutput> {
        let ctx = retrieved
            .iter()
            .map(|r| format!("[Score {:.2}] {}", r.score, r.text))
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = format!(
            "You are a helpful tutor. Use the provided context to answer clearly, \
             step-by-step, with examples when helpful.\n\n\
             Context:\n{}\n\n\
             Question: {}\n\
             Answer:",
            ctx, user_input
        );
        let answer = self.generator.generate(&prompt).await?;
        let citations = retrieved
            .iter()
            .map(|r| serde_json::to_value(&r.meta).unwrap_or(Value::Null))
            .collect();
        Ok(TaskOutput::Tutor { answer, citations })
    }

    async fn quiz(
        &self,
        session_id: &str,
        user_input: &str,
        retrieved: &[RetrievedSnippet],
    ) -> Result<TaskOutput> {
        // Without a topic there is nothing to quiz on; short-circuit before
        // spending a model call.
        if user_input.trim().is_empty() {
            return Ok(TaskOutput::Quiz {
                raw: "Please enter a topic for the quiz.".to_string(),
                questions: Vec::new(),
            });
        }

        let weak_topics_focus = match self.store.get_weak_topics(session_id).await {
            Ok(topics) if !topics.is_empty() => {
                let lines = topics
                    .iter()
                    .take(QUIZ_FOCUS_TOPICS)
                    .map(|t| format!("- {}: {}", t.title, t.detail))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!(
                    "\n\n**IMPORTANT: Focus heavily on these weak areas:**\n{}",
                    lines
                )
            }
            Ok(_) => String::new(),
            Err(e) => {
                warn!("Could not load weak topics: {}", e);
                String::new()
            }
        };

        let ctx = snippet_context(retrieved);
        let prompt = format!(
            "Create a 5-question multiple choice quiz (A-D) about the topic. \
             Provide the correct option letter and one-sentence explanation after each question.\n\
             {}\n\
             Format strictly as: Q:..., A) ..., B) ..., C) ..., D) ..., Answer: <letter>, Explanation: ...\n\n\
             Context (may be empty):\n{}\n\nTopic: {}\n",
            weak_topics_focus, ctx, user_input
        );
        let raw = self.generator.generate(&prompt).await?;
        let questions: Vec<ParsedQuestion> = parse_quiz_output(&raw);
        Ok(TaskOutput::Quiz { raw, questions })
    }

    async fn analyze(&self, user_input: &str, history: &[String]) -> Result<TaskOutput> {
        let start = history.len().saturating_sub(20);
        let mut history_text = history[start..].join("\n");
        // The request text counts as the newest entry; the learn cycle sends
        // its wrong-answer digest this way with no other history.
        if !user_input.trim().is_empty() {
            if !history_text.is_empty() {
                history_text.push('\n');
            }
            history_text.push_str(user_input);
        }
        let prompt = format!(
            "Given the learner's recent interactions and quiz results, identify 3 weakest subtopics, \
             likely misconceptions, and give 3 targeted next steps. Return compact bullet points.\n\n\
             History:\n{}\n",
            history_text
        );
        let summary = self.generator.generate(&prompt).await?;
        Ok(TaskOutput::Analysis { summary })
    }

    async fn roadmap(
        &self,
        user_input: &str,
        retrieved: &[RetrievedSnippet],
    ) -> Result<TaskOutput> {
        let ctx = snippet_context(retrieved);
        let prompt = format!(
            "Create a 2-week personalized study roadmap broken into daily tasks. \
             Include objectives, recommended resources, and estimated hours per day. \
             Tailor to the learner's weaknesses if present.\n\n\
             Context:\n{}\n\nFocus: {}\n",
            ctx, user_input
        );
        let plan = self.generator.generate(&prompt).await?;
        Ok(TaskOutput::Roadmap { plan })
    }

    async fn questions(
        &self,
        user_input: &str,
        retrieved: &[RetrievedSnippet],
    ) -> Result<TaskOutput> {
        let ctx = snippet_context(retrieved);
        let prompt = format!(
            "Generate 5 focused, diverse practice questions (short-answer) for the learner's input.\n\
             Return as a numbered list only.\n\n\
             Context (may be empty):\n{}\n\nTopic or prompt: {}\n",
            ctx, user_input
        );
        let questions = self.generator.generate(&prompt).await?;
        Ok(TaskOutput::Questions { questions })
    }
}

fn snippet_context(retrieved: &[RetrievedSnippet]) -> String {
    retrieved
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
