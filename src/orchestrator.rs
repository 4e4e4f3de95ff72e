//! Learning-state orchestration
//!
//! Derives recommendations from the progress store: per-topic accuracy over
//! recent quiz attempts, whether a weakness analysis is due, and what the
//! learner should do next. Pure reads over stored state; the only writes in
//! the system happen inside the task graph and the store itself.

use crate::error::Result;
use crate::storage::ProgressStore;
use crate::types::{ChatRole, TaskKind, WeakTopicRecord};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Attempts considered when computing recent per-topic accuracy
const RECENT_ATTEMPTS: usize = 3;

/// A topic averaging below the accuracy threshold over recent attempts
#[derive(Debug, Clone, Serialize)]
pub struct WeakArea {
    pub topic: String,
    pub accuracy: f64,
    pub attempts: usize,
}

/// Recent-performance summary
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
    pub weak_areas: Vec<WeakArea>,
    pub recommendations: Vec<String>,
    pub overall_accuracy: f64,
}

/// The next step the learner should take
#[derive(Debug, Clone, Serialize)]
pub struct NextAction {
    pub action: TaskKind,
    pub reason: String,
    pub suggestion: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub focused: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weak_topics: Option<Vec<WeakTopicRecord>>,
}

/// Context assembled for one pass through the learning cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleContext {
    pub weak_topics: Vec<WeakTopicRecord>,
    pub quiz_history_count: usize,
    pub should_focus: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_areas: Option<Vec<String>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub update_roadmap: bool,
    pub next_recommended_action: NextAction,
}

/// Read-side orchestrator over the progress store
pub struct Orchestrator {
    store: Arc<dyn ProgressStore>,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self { store }
    }

    /// Average accuracy per topic over the three most recent attempts,
    /// flagging topics below 70%
    pub async fn analyze_quiz_performance(&self, session_id: &str) -> Result<PerformanceReport> {
        let quiz_history = self.store.get_quiz_history(session_id).await?;
        if quiz_history.is_empty() {
            return Ok(PerformanceReport {
                weak_areas: Vec::new(),
                recommendations: Vec::new(),
                overall_accuracy: 0.0,
            });
        }

        // BTreeMap keeps the report's topic order stable across runs.
        let mut topic_accuracy: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for attempt in quiz_history.iter().take(RECENT_ATTEMPTS) {
            topic_accuracy
                .entry(attempt.topic.clone())
                .or_default()
                .push(attempt.accuracy());
        }

        let mut weak_areas = Vec::new();
        for (topic, accuracies) in &topic_accuracy {
            let avg = accuracies.iter().sum::<f64>() / accuracies.len() as f64;
            if avg < 0.7 {
                weak_areas.push(WeakArea {
                    topic: topic.clone(),
                    accuracy: avg,
                    attempts: accuracies.len(),
                });
            }
        }

        let recommendations = if weak_areas.is_empty() {
            Vec::new()
        } else {
            vec![
                "Take focused quizzes on weak areas".to_string(),
                "Review study materials for struggling topics".to_string(),
                "Check roadmap for targeted practice tasks".to_string(),
            ]
        };

        let overall_accuracy = if topic_accuracy.is_empty() {
            0.0
        } else {
            topic_accuracy
                .values()
                .map(|accs| accs.iter().sum::<f64>() / accs.len() as f64)
                .sum::<f64>()
                / topic_accuracy.len() as f64
        };

        Ok(PerformanceReport {
            weak_areas,
            recommendations,
            overall_accuracy,
        })
    }

    /// Whether a weakness analysis is due: at least three attempts and the
    /// most recent one scored below 60%
    pub async fn should_trigger_analysis(&self, session_id: &str) -> Result<bool> {
        let quiz_history = self.store.get_quiz_history(session_id).await?;
        if quiz_history.len() < 3 {
            return Ok(false);
        }
        // Attempts come back newest-first.
        Ok(quiz_history[0].accuracy() < 0.6)
    }

    /// Walk the recommendation ladder for the session's current state
    pub async fn get_next_recommended_action(&self, session_id: &str) -> Result<NextAction> {
        let weak_topics = self.store.get_weak_topics(session_id).await?;
        let quiz_history = self.store.get_quiz_history(session_id).await?;
        let history = self.store.get_history(session_id).await?;

        if history.len() < 3 {
            return Ok(NextAction {
                action: TaskKind::Tutor,
                reason: "Start by learning foundational concepts".to_string(),
                suggestion: "Ask questions to understand key topics".to_string(),
                focused: false,
                weak_topics: None,
            });
        }

        if quiz_history.len() < 2 {
            return Ok(NextAction {
                action: TaskKind::Quiz,
                reason: "Test your understanding with a quiz".to_string(),
                suggestion: "Generate a quiz on what you've learned".to_string(),
                focused: false,
                weak_topics: None,
            });
        }

        if !weak_topics.is_empty() {
            let titles = weak_topics
                .iter()
                .take(3)
                .map(|t| t.title.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            return Ok(NextAction {
                action: TaskKind::Quiz,
                reason: "Focus on identified weak areas".to_string(),
                suggestion: format!("Take a targeted quiz on: {}", titles),
                focused: true,
                weak_topics: Some(weak_topics),
            });
        }

        if quiz_history.len() >= 3 {
            let analyzed = history
                .iter()
                .any(|m| m.task == Some(TaskKind::Analyze) && m.role == ChatRole::Assistant);
            if !analyzed {
                return Ok(NextAction {
                    action: TaskKind::Analyze,
                    reason: "Analyze your learning progress".to_string(),
                    suggestion: "Review weak areas and get personalized recommendations"
                        .to_string(),
                    focused: false,
                    weak_topics: None,
                });
            }
        }

        Ok(NextAction {
            action: TaskKind::Roadmap,
            reason: "Create a study plan".to_string(),
            suggestion: "Generate a personalized learning roadmap".to_string(),
            focused: false,
            weak_topics: None,
        })
    }

    /// Assemble the task context for one pass through the learning cycle
    pub async fn orchestrate_learning_cycle(
        &self,
        session_id: &str,
        current_task: TaskKind,
    ) -> Result<CycleContext> {
        let weak_topics = self.store.get_weak_topics(session_id).await?;
        let quiz_history = self.store.get_quiz_history(session_id).await?;
        debug!(
            task = %current_task,
            weak_topics = weak_topics.len(),
            attempts = quiz_history.len(),
            "Orchestrating learning cycle"
        );

        let focus_areas = if current_task == TaskKind::Quiz && !weak_topics.is_empty() {
            Some(
                weak_topics
                    .iter()
                    .take(3)
                    .map(|t| format!("{}: {}", t.title, t.detail))
                    .collect(),
            )
        } else {
            None
        };

        let next_recommended_action = self.get_next_recommended_action(session_id).await?;

        Ok(CycleContext {
            should_focus: !weak_topics.is_empty(),
            quiz_history_count: quiz_history.len(),
            focus_areas,
            update_roadmap: current_task == TaskKind::Analyze,
            next_recommended_action,
            weak_topics,
        })
    }
}
