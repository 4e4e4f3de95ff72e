//! Progress store for the study assistant
//!
//! Persists sessions, message history, quiz attempts with their questions and
//! answers, weak topics, roadmap tasks, and per-concept mastery. Each trait
//! method is one logical operation and one transaction: partial writes (an
//! attempt row without its question rows) are never observable.

pub mod libsql;
pub mod test_utils;

use crate::error::Result;
use crate::types::{
    AttemptRecord, ChatRole, MasteryRecord, MessageRecord, ParsedQuestion, RoadmapTaskRecord,
    TaskKind, TaskStatus, WeakTopicRecord,
};
use async_trait::async_trait;
use serde_json::Value;

/// Durable substrate the task graph and orchestrators read and write
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Return the session id, creating a new session when the given id is
    /// absent or unrecognized
    async fn ensure_session(&self, session_id: Option<&str>) -> Result<String>;

    /// Append a message to the session log
    async fn log_message(
        &self,
        session_id: &str,
        role: ChatRole,
        content: &str,
        task: Option<TaskKind>,
        meta: &Value,
    ) -> Result<()>;

    /// Persist a quiz attempt atomically with its parsed questions
    ///
    /// Returns the attempt id and one question id per question, in order. An
    /// attempt with zero questions is still logged so empty or malformed
    /// model output stays observable.
    async fn log_quiz_attempt(
        &self,
        session_id: &str,
        topic: &str,
        raw_output: &str,
        questions: &[ParsedQuestion],
        task: Option<TaskKind>,
        meta: &Value,
    ) -> Result<(i64, Vec<i64>)>;

    /// Record an answer and recompute the attempt's `correct_count`
    ///
    /// Returns `Ok(false)` when the attempt does not belong to the session.
    /// A question id that does not belong to the attempt is dropped (the
    /// answer is still recorded), not treated as fatal.
    #[allow(clippy::too_many_arguments)]
    async fn record_quiz_answer(
        &self,
        session_id: &str,
        attempt_id: i64,
        question_id: Option<i64>,
        selected_index: Option<i64>,
        selected_option: Option<&str>,
        is_correct: bool,
        note: Option<&str>,
        confidence: Option<f64>,
    ) -> Result<bool>;

    /// Full message log in insertion order
    async fn get_history(&self, session_id: &str) -> Result<Vec<MessageRecord>>;

    /// Quiz attempts newest-first, each with its questions in sequence order
    /// and each question's most recent answer
    async fn get_quiz_history(&self, session_id: &str) -> Result<Vec<AttemptRecord>>;

    /// Parse an analysis summary into weak topics and persist them,
    /// auto-creating roadmap tasks for topics not already covered
    async fn log_weak_topics(&self, session_id: &str, summary: &str) -> Result<()>;

    /// Weak topics newest-first
    async fn get_weak_topics(&self, session_id: &str) -> Result<Vec<WeakTopicRecord>>;

    /// Roadmap tasks ordered by status, priority, creation time
    async fn get_roadmap_tasks(&self, session_id: &str) -> Result<Vec<RoadmapTaskRecord>>;

    /// Update a task's status; `Ok(false)` when the task does not belong to
    /// the session
    async fn update_task_status(
        &self,
        session_id: &str,
        task_id: i64,
        status: TaskStatus,
    ) -> Result<bool>;

    /// Accumulate quiz results into a concept's mastery state and recompute
    /// its score; creates the record on first sight of the concept
    async fn update_concept_mastery(
        &self,
        session_id: &str,
        concept: &str,
        correct: i64,
        total: i64,
    ) -> Result<MasteryRecord>;

    /// Mastery records sorted by ascending score, optionally filtered to one
    /// concept
    async fn get_concept_mastery(
        &self,
        session_id: &str,
        concept: Option<&str>,
    ) -> Result<Vec<MasteryRecord>>;
}

/// Parse an analysis summary's bullet lines into `(topic, detail)` pairs
///
/// Each non-empty line has its bullet prefix stripped, then splits on the
/// first `:` or `-`, or an ` – ` separator. A line with no delimiter falls
/// back to topic `weak_topic` with the whole line as detail.
pub fn parse_summary(summary: &str) -> Vec<(String, String)> {
    let mut items = Vec::new();

    for line in summary.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let stripped = line.trim_start_matches(|c| "•-– ".contains(c));

        let (topic, detail) = if let Some((head, tail)) = stripped.split_once(':') {
            (head.trim(), tail.trim())
        } else if let Some((head, tail)) = stripped.split_once('-') {
            (head.trim(), tail.trim())
        } else if let Some((head, tail)) = stripped.split_once(" – ") {
            (head.trim(), tail.trim())
        } else {
            ("weak_topic", stripped)
        };

        if !topic.is_empty() {
            items.push((topic.to_string(), detail.to_string()));
        }
    }

    items
}

/// Capitalize each word, for roadmap task titles
pub(crate) fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
