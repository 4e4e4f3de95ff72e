//! Core data types for the Paideia study assistant
//!
//! This module defines the fundamental data structures used throughout
//! paideia: the closed set of learning tasks, retrieved context snippets,
//! parsed quiz questions, and the records surfaced by the progress store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// The five supported request intents
///
/// Dispatch in the task graph is a pure function of this enum; there is no
/// default path and the handler map is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Context-grounded explanation of a question
    Tutor,

    /// Multiple-choice quiz generation with structured parsing
    Quiz,

    /// Weakness analysis over recent history
    Analyze,

    /// Two-week study plan generation
    Roadmap,

    /// Short-answer practice question generation
    Questions,
}

impl TaskKind {
    /// Stable string label, matching the persisted `task` column
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Tutor => "tutor",
            TaskKind::Quiz => "quiz",
            TaskKind::Analyze => "analyze",
            TaskKind::Roadmap => "roadmap",
            TaskKind::Questions => "questions",
        }
    }

    /// Parse a persisted task label
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "tutor" => Some(TaskKind::Tutor),
            "quiz" => Some(TaskKind::Quiz),
            "analyze" => Some(TaskKind::Analyze),
            "roadmap" => Some(TaskKind::Roadmap),
            "questions" => Some(TaskKind::Questions),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Message author role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
            ChatRole::System => "system",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(ChatRole::User),
            "assistant" => Some(ChatRole::Assistant),
            "system" => Some(ChatRole::System),
            _ => None,
        }
    }
}

/// One ranked snippet returned by the retrieval adapter
///
/// Ephemeral: produced per request, consumed within one task invocation,
/// surfaced to callers only through response metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedSnippet {
    /// Snippet text
    pub text: String,

    /// Similarity score from the vector search
    pub score: f32,

    /// Metadata attached when the text was ingested
    #[serde(default)]
    pub meta: HashMap<String, Value>,
}

/// A question extracted from raw quiz text
///
/// `id` is back-filled with the persisted identifier after a quiz attempt is
/// logged. `correct_index`, when set, always indexes into `options`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedQuestion {
    /// Persisted question id, if the attempt has been stored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// 1-based position in the parsed quiz
    pub sequence: u32,

    /// Question text
    pub question: String,

    /// Option texts in fixed A,B,C,D order (missing letters omitted)
    pub options: Vec<String>,

    /// Index of the correct option, if the answer key matched an option
    pub correct_index: Option<usize>,

    /// Explanation text, empty when the model omitted it
    pub explanation: String,
}

/// Output payload produced by exactly one task handler
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskOutput {
    /// Tutor: explanation grounded in retrieved context
    Tutor {
        answer: String,
        citations: Vec<Value>,
    },

    /// Quiz: raw model text plus parsed question records
    Quiz {
        raw: String,
        questions: Vec<ParsedQuestion>,
    },

    /// Analyze: free-text weakness summary
    Analysis { summary: String },

    /// Roadmap: free-text study plan
    Roadmap { plan: String },

    /// Questions: numbered practice questions, unparsed
    Questions { questions: String },

    /// Any failure during graph execution, converted to a normal response
    Error { error: String },
}

impl TaskOutput {
    /// Flatten the output to the text logged as the assistant message
    pub fn as_message_text(&self) -> String {
        match self {
            TaskOutput::Tutor { answer, .. } => answer.clone(),
            TaskOutput::Roadmap { plan } => plan.clone(),
            other => serde_json::to_string(other).unwrap_or_default(),
        }
    }
}

/// Full response from one task graph run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    pub task: TaskKind,
    pub output: TaskOutput,
    #[serde(default)]
    pub meta: HashMap<String, Value>,
    pub session_id: Option<String>,
}

/// Roadmap task status; both transitions are permitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Complete,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Complete => "complete",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "complete" => Some(TaskStatus::Complete),
            _ => None,
        }
    }
}

/// A message from the append-only session log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub role: ChatRole,
    pub content: String,
    pub task: Option<TaskKind>,
    #[serde(default)]
    pub meta: Value,
    pub created_at: DateTime<Utc>,
}

/// The most recent answer recorded for a question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub selected_index: Option<i64>,
    pub selected_option: Option<String>,
    pub is_correct: bool,
    pub note: Option<String>,
    pub confidence: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// A persisted quiz question with its latest answer, if any
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: i64,
    pub sequence: u32,
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: Option<usize>,
    pub explanation: String,
    pub answer: Option<AnswerRecord>,
}

/// A quiz attempt with its questions in sequence order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub attempt_id: i64,
    pub task: Option<TaskKind>,
    pub topic: String,
    pub total_questions: i64,
    pub correct_count: i64,
    #[serde(default)]
    pub meta: Value,
    pub created_at: DateTime<Utc>,
    pub questions: Vec<QuestionRecord>,
}

impl AttemptRecord {
    /// Fraction of questions answered correctly; a zero-question attempt
    /// counts as zero accuracy rather than dividing by zero
    pub fn accuracy(&self) -> f64 {
        self.correct_count as f64 / self.total_questions.max(1) as f64
    }
}

/// A learner sub-topic flagged by analysis as needing more practice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeakTopicRecord {
    pub id: i64,
    pub title: String,
    pub detail: String,
    pub severity: Option<String>,
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An actionable to-do item, usually auto-derived from a weak topic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadmapTaskRecord {
    pub id: i64,
    pub title: String,
    pub detail: String,
    pub status: TaskStatus,
    pub priority: i64,
    pub weak_topic_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Accumulated per-concept mastery state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasteryRecord {
    pub id: i64,
    pub concept: String,
    pub mastery_score: f64,
    pub total_questions: i64,
    pub correct_answers: i64,
    pub quiz_attempts: i64,
    pub last_practiced: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Compute the 0-100 mastery score from accumulated counts
///
/// Raw accuracy is damped toward zero until five attempts of evidence have
/// accumulated, then carries full weight. Pure function of the stored counts:
/// recomputing from the same state always yields the same score.
pub fn mastery_score(total_questions: i64, correct_answers: i64, quiz_attempts: i64) -> f64 {
    if total_questions <= 0 {
        return 0.0;
    }
    let accuracy = (correct_answers as f64 / total_questions as f64) * 100.0;
    let confidence_factor = (quiz_attempts as f64 / 5.0).min(1.0);
    accuracy * confidence_factor
}
