//! Recommendation ladder and performance analysis tests

mod common;

use paideia::orchestrator::Orchestrator;
use paideia::parse_quiz_output;
use paideia::storage::test_utils::create_test_store;
use paideia::storage::ProgressStore;
use paideia::types::{ChatRole, TaskKind};
use serde_json::json;
use std::sync::Arc;

async fn log_attempt_with_score(
    store: &Arc<paideia::LibsqlProgress>,
    session: &str,
    topic: &str,
    correct: usize,
) -> i64 {
    let questions = parse_quiz_output(common::SAMPLE_QUIZ);
    let (attempt_id, question_ids) = store
        .log_quiz_attempt(session, topic, "raw", &questions, Some(TaskKind::Quiz), &json!({}))
        .await
        .unwrap();
    for (i, qid) in question_ids.iter().enumerate() {
        store
            .record_quiz_answer(
                session,
                attempt_id,
                Some(*qid),
                Some(0),
                None,
                i < correct,
                None,
                None,
            )
            .await
            .unwrap();
    }
    attempt_id
}

async fn log_messages(store: &Arc<paideia::LibsqlProgress>, session: &str, n: usize) {
    for i in 0..n {
        store
            .log_message(
                session,
                ChatRole::User,
                &format!("message {}", i),
                Some(TaskKind::Tutor),
                &json!({}),
            )
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_new_session_recommends_tutor() {
    let store = create_test_store().await.unwrap();
    let session = store.ensure_session(None).await.unwrap();
    let orchestrator = Orchestrator::new(store.clone());

    let action = orchestrator
        .get_next_recommended_action(&session)
        .await
        .unwrap();
    assert_eq!(action.action, TaskKind::Tutor);
    assert!(!action.focused);
}

#[tokio::test]
async fn test_talked_but_unquizzed_recommends_quiz() {
    let store = create_test_store().await.unwrap();
    let session = store.ensure_session(None).await.unwrap();
    log_messages(&store, &session, 4).await;

    let orchestrator = Orchestrator::new(store.clone());
    let action = orchestrator
        .get_next_recommended_action(&session)
        .await
        .unwrap();
    assert_eq!(action.action, TaskKind::Quiz);
    assert!(!action.focused);
}

#[tokio::test]
async fn test_weak_topics_recommend_focused_quiz() {
    let store = create_test_store().await.unwrap();
    let session = store.ensure_session(None).await.unwrap();
    log_messages(&store, &session, 4).await;
    log_attempt_with_score(&store, &session, "trees", 1).await;
    log_attempt_with_score(&store, &session, "trees", 1).await;
    store
        .log_weak_topics(&session, "- tree rotations: mixes up left and right")
        .await
        .unwrap();

    let orchestrator = Orchestrator::new(store.clone());
    let action = orchestrator
        .get_next_recommended_action(&session)
        .await
        .unwrap();
    assert_eq!(action.action, TaskKind::Quiz);
    assert!(action.focused);
    assert!(action.suggestion.contains("tree rotations"));
    assert!(action.weak_topics.is_some());
}

#[tokio::test]
async fn test_many_attempts_without_analysis_recommend_analyze() {
    let store = create_test_store().await.unwrap();
    let session = store.ensure_session(None).await.unwrap();
    log_messages(&store, &session, 4).await;
    for _ in 0..3 {
        log_attempt_with_score(&store, &session, "trees", 2).await;
    }

    let orchestrator = Orchestrator::new(store.clone());
    let action = orchestrator
        .get_next_recommended_action(&session)
        .await
        .unwrap();
    assert_eq!(action.action, TaskKind::Analyze);

    // Once an analysis message exists, the ladder falls through to roadmap.
    store
        .log_message(
            &session,
            ChatRole::Assistant,
            "weakness summary",
            Some(TaskKind::Analyze),
            &json!({}),
        )
        .await
        .unwrap();
    let action = orchestrator
        .get_next_recommended_action(&session)
        .await
        .unwrap();
    assert_eq!(action.action, TaskKind::Roadmap);
}

#[tokio::test]
async fn test_performance_report_flags_weak_topics() {
    let store = create_test_store().await.unwrap();
    let session = store.ensure_session(None).await.unwrap();

    // Two-question attempts: 1/2 on graphs (weak), 2/2 on arrays (fine).
    log_attempt_with_score(&store, &session, "graphs", 1).await;
    log_attempt_with_score(&store, &session, "arrays", 2).await;

    let orchestrator = Orchestrator::new(store.clone());
    let report = orchestrator
        .analyze_quiz_performance(&session)
        .await
        .unwrap();
    assert_eq!(report.weak_areas.len(), 1);
    assert_eq!(report.weak_areas[0].topic, "graphs");
    assert!((report.weak_areas[0].accuracy - 0.5).abs() < 1e-9);
    assert_eq!(report.recommendations.len(), 3);
    assert!((report.overall_accuracy - 0.75).abs() < 1e-9);
}

#[tokio::test]
async fn test_performance_report_empty_history() {
    let store = create_test_store().await.unwrap();
    let session = store.ensure_session(None).await.unwrap();

    let orchestrator = Orchestrator::new(store.clone());
    let report = orchestrator
        .analyze_quiz_performance(&session)
        .await
        .unwrap();
    assert!(report.weak_areas.is_empty());
    assert!(report.recommendations.is_empty());
    assert_eq!(report.overall_accuracy, 0.0);
}

#[tokio::test]
async fn test_analysis_trigger_requires_three_attempts_and_low_score() {
    let store = create_test_store().await.unwrap();
    let session = store.ensure_session(None).await.unwrap();
    let orchestrator = Orchestrator::new(store.clone());

    assert!(!orchestrator.should_trigger_analysis(&session).await.unwrap());

    log_attempt_with_score(&store, &session, "trees", 0).await;
    log_attempt_with_score(&store, &session, "trees", 0).await;
    // Two attempts are not enough, however bad.
    assert!(!orchestrator.should_trigger_analysis(&session).await.unwrap());

    // Third attempt scores 1/2 = 50%, below the 60% threshold.
    log_attempt_with_score(&store, &session, "trees", 1).await;
    assert!(orchestrator.should_trigger_analysis(&session).await.unwrap());

    // A good most-recent attempt clears the trigger.
    log_attempt_with_score(&store, &session, "trees", 2).await;
    assert!(!orchestrator.should_trigger_analysis(&session).await.unwrap());
}

#[tokio::test]
async fn test_learning_cycle_context() {
    let store = create_test_store().await.unwrap();
    let session = store.ensure_session(None).await.unwrap();
    let orchestrator = Orchestrator::new(store.clone());

    store
        .log_weak_topics(&session, "- recursion: base cases\n- pointers: aliasing")
        .await
        .unwrap();
    log_attempt_with_score(&store, &session, "recursion", 1).await;

    let context = orchestrator
        .orchestrate_learning_cycle(&session, TaskKind::Quiz)
        .await
        .unwrap();
    assert!(context.should_focus);
    assert_eq!(context.quiz_history_count, 1);
    let focus = context.focus_areas.expect("quiz task should carry focus areas");
    assert_eq!(focus.len(), 2);
    assert!(focus[0].contains(':'));
    assert!(!context.update_roadmap);

    let context = orchestrator
        .orchestrate_learning_cycle(&session, TaskKind::Analyze)
        .await
        .unwrap();
    assert!(context.update_roadmap);
    assert!(context.focus_areas.is_none());
}
