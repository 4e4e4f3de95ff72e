//! Guided concept-mastery cycle
//!
//! Drives the learn -> quiz -> analyze loop for a single concept: the tutor
//! teaches it, a quiz tests it, and the analysis phase folds the results into
//! the concept's mastery score and decides whether another focused quiz is
//! needed. Repeats until the score clears the practice threshold.

use crate::agent::StudyAgent;
use crate::error::{PaideiaError, Result};
use crate::storage::ProgressStore;
use crate::types::{MasteryRecord, ParsedQuestion, TaskKind, TaskOutput};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Below this mastery score the concept gets another focused quiz
const PRACTICE_THRESHOLD: f64 = 80.0;

/// Result of the teach phase
#[derive(Debug, Clone, Serialize)]
pub struct LearnStart {
    pub phase: &'static str,
    pub concept: String,
    pub session_id: String,
    pub teaching: String,
    pub next_action: &'static str,
    pub message: String,
}

/// Result of the quiz phase
#[derive(Debug, Clone, Serialize)]
pub struct ConceptQuiz {
    pub phase: &'static str,
    pub concept: String,
    pub session_id: String,
    pub attempt_id: Option<i64>,
    pub questions: Vec<ParsedQuestion>,
    pub raw: String,
    pub next_action: &'static str,
    pub message: String,
}

/// A question the learner got wrong, for the analysis prompt
#[derive(Debug, Clone, Serialize)]
pub struct WrongQuestion {
    pub question: String,
    pub correct_answer: String,
    pub user_answer: String,
}

/// Result of the analyze phase
#[derive(Debug, Clone, Serialize)]
pub struct QuizAnalysis {
    pub phase: &'static str,
    pub concept: String,
    pub session_id: String,
    pub mastery: MasteryRecord,
    pub analysis: String,
    pub wrong_questions: Vec<WrongQuestion>,
    pub needs_practice: bool,
    pub next_action: &'static str,
    pub message: String,
}

/// Progress report for one concept or for the whole session
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum LearningProgress {
    Concept(ConceptProgress),
    Overview(ProgressOverview),
}

#[derive(Debug, Clone, Serialize)]
pub struct ConceptProgress {
    pub concept: String,
    pub status: &'static str,
    pub mastery_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mastery: Option<MasteryRecord>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressOverview {
    pub concepts: Vec<MasteryRecord>,
    pub total_concepts: usize,
    pub mastered: usize,
    pub in_progress: usize,
    pub needs_work: usize,
}

/// Orchestrates the complete learning journey for a specific concept
pub struct LearnOrchestrator {
    agent: Arc<StudyAgent>,
    store: Arc<dyn ProgressStore>,
}

impl LearnOrchestrator {
    pub fn new(agent: Arc<StudyAgent>, store: Arc<dyn ProgressStore>) -> Self {
        Self { agent, store }
    }

    /// Phase 1: have the tutor teach the concept
    pub async fn start_learning(
        &self,
        session_id: Option<&str>,
        concept: &str,
    ) -> Result<LearnStart> {
        let session_id = self.store.ensure_session(session_id).await?;

        let teaching_prompt = format!(
            "Please teach me about {}. Explain it clearly with examples and key points.",
            concept
        );
        let result = self
            .agent
            .run(TaskKind::Tutor, &teaching_prompt, &[], Some(&session_id))
            .await?;

        let teaching = match result.output {
            TaskOutput::Tutor { answer, .. } => answer,
            _ => String::new(),
        };

        Ok(LearnStart {
            phase: "learn",
            concept: concept.to_string(),
            session_id,
            teaching,
            next_action: "quiz",
            message: format!("Learned about {}. Ready to test your knowledge?", concept),
        })
    }

    /// Phase 2: quiz the concept, optionally steering toward its weak areas
    pub async fn generate_concept_quiz(
        &self,
        session_id: &str,
        concept: &str,
        focus_weak_areas: bool,
    ) -> Result<ConceptQuiz> {
        let mut quiz_prompt = concept.to_string();

        if focus_weak_areas {
            let weak_topics = self.store.get_weak_topics(session_id).await?;
            let concept_lower = concept.to_lowercase();
            let details = weak_topics
                .iter()
                .filter(|t| t.title.to_lowercase().contains(&concept_lower))
                .take(3)
                .map(|t| t.detail.as_str())
                .collect::<Vec<_>>();
            if !details.is_empty() {
                quiz_prompt = format!("{} - Focus on: {}", concept, details.join(", "));
            }
        }

        let result = self
            .agent
            .run(TaskKind::Quiz, &quiz_prompt, &[], Some(session_id))
            .await?;

        let attempt_id = result
            .meta
            .get("quiz_attempt_id")
            .and_then(|v| v.as_i64());
        let (raw, questions) = match result.output {
            TaskOutput::Quiz { raw, questions } => (raw, questions),
            _ => (String::new(), Vec::new()),
        };

        Ok(ConceptQuiz {
            phase: "quiz",
            concept: concept.to_string(),
            session_id: session_id.to_string(),
            attempt_id,
            questions,
            raw,
            next_action: "submit_answers",
            message: format!(
                "Quiz generated for {}. Answer the questions to assess your understanding.",
                concept
            ),
        })
    }

    /// Phase 3: fold the attempt into mastery and analyze the wrong answers
    pub async fn analyze_quiz_results(
        &self,
        session_id: &str,
        attempt_id: i64,
        concept: &str,
    ) -> Result<QuizAnalysis> {
        let quiz_history = self.store.get_quiz_history(session_id).await?;
        let attempt = quiz_history
            .iter()
            .find(|a| a.attempt_id == attempt_id)
            .ok_or(PaideiaError::AttemptNotFound(attempt_id))?;

        let mastery = self
            .store
            .update_concept_mastery(
                session_id,
                concept,
                attempt.correct_count,
                attempt.total_questions,
            )
            .await?;

        let wrong_questions: Vec<WrongQuestion> = attempt
            .questions
            .iter()
            .filter_map(|q| {
                let answer = q.answer.as_ref()?;
                if answer.is_correct {
                    return None;
                }
                let correct_answer = q
                    .correct_index
                    .and_then(|i| q.options.get(i))
                    .cloned()
                    .unwrap_or_else(|| "Unknown".to_string());
                Some(WrongQuestion {
                    question: q.question.clone(),
                    correct_answer,
                    user_answer: answer
                        .selected_option
                        .clone()
                        .unwrap_or_else(|| "No answer".to_string()),
                })
            })
            .collect();

        let analysis = if wrong_questions.is_empty() {
            format!("Perfect score! You've mastered {}.", concept)
        } else {
            let wrong_text = wrong_questions
                .iter()
                .map(|w| {
                    format!(
                        "- Q: {}\n  Correct: {}\n  User answered: {}",
                        w.question, w.correct_answer, w.user_answer
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            let analysis_prompt = format!(
                "Analyze the learner's quiz performance on \"{concept}\":\n\n\
                 Total: {total} questions, Correct: {correct}\n\n\
                 Wrong answers:\n{wrong_text}\n\n\
                 Identify 2-3 specific sub-topics or concepts within \"{concept}\" that need more practice.\n\
                 Format as bullet points with brief explanations.",
                concept = concept,
                total = attempt.total_questions,
                correct = attempt.correct_count,
                wrong_text = wrong_text,
            );

            let result = self
                .agent
                .run(TaskKind::Analyze, &analysis_prompt, &[], Some(session_id))
                .await?;
            match result.output {
                TaskOutput::Analysis { summary } => summary,
                _ => "Review the incorrect answers".to_string(),
            }
        };

        let needs_practice = mastery.mastery_score < PRACTICE_THRESHOLD;
        info!(
            concept = %concept,
            score = mastery.mastery_score,
            needs_practice,
            "Concept mastery updated"
        );

        Ok(QuizAnalysis {
            phase: "analyze",
            concept: concept.to_string(),
            session_id: session_id.to_string(),
            message: format!("Analysis complete. Mastery: {:.1}%", mastery.mastery_score),
            mastery,
            analysis,
            wrong_questions,
            needs_practice,
            next_action: if needs_practice {
                "focused_quiz"
            } else {
                "complete"
            },
        })
    }

    /// Progress for one concept, or an overview of all of them
    pub async fn get_learning_progress(
        &self,
        session_id: &str,
        concept: Option<&str>,
    ) -> Result<LearningProgress> {
        let masteries = self.store.get_concept_mastery(session_id, concept).await?;

        if let Some(concept) = concept {
            let Some(mastery) = masteries.into_iter().next() else {
                return Ok(LearningProgress::Concept(ConceptProgress {
                    concept: concept.to_string(),
                    status: "not_started",
                    mastery_score: 0.0,
                    mastery: None,
                    message: format!("Start learning {}", concept),
                }));
            };

            let score = mastery.mastery_score;
            let (status, message) = if score >= 90.0 {
                ("mastered", format!("Mastered {}", concept))
            } else if score >= 70.0 {
                ("proficient", format!("Proficient in {}", concept))
            } else if score >= 50.0 {
                ("learning", format!("Still learning {}", concept))
            } else {
                ("needs_practice", format!("{} needs more practice", concept))
            };

            return Ok(LearningProgress::Concept(ConceptProgress {
                concept: concept.to_string(),
                status,
                mastery_score: score,
                mastery: Some(mastery),
                message,
            }));
        }

        let mastered = masteries.iter().filter(|m| m.mastery_score >= 90.0).count();
        let in_progress = masteries
            .iter()
            .filter(|m| (50.0..90.0).contains(&m.mastery_score))
            .count();
        let needs_work = masteries.iter().filter(|m| m.mastery_score < 50.0).count();

        Ok(LearningProgress::Overview(ProgressOverview {
            total_concepts: masteries.len(),
            mastered,
            in_progress,
            needs_work,
            concepts: masteries,
        }))
    }
}
