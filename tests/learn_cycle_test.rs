//! End-to-end tests for the task graph and the guided learn cycle

mod common;

use common::{build_agent, FailingGenerator, ScriptedGenerator};
use paideia::storage::ProgressStore;
use paideia::types::{ChatRole, TaskKind, TaskOutput};
use paideia::LearnOrchestrator;
use std::sync::Arc;

#[tokio::test]
async fn test_tutor_run_logs_both_messages() {
    let generator = Arc::new(ScriptedGenerator::new(vec!["Arrays are contiguous."]));
    let (agent, store, memory) = build_agent(generator.clone()).await;

    memory
        .add_texts(vec!["array basics and indexing".to_string()], None)
        .await
        .unwrap();

    let response = agent
        .run(TaskKind::Tutor, "what is an array?", &[], None)
        .await
        .unwrap();

    let session_id = response.session_id.clone().expect("session assigned");
    match &response.output {
        TaskOutput::Tutor { answer, citations } => {
            assert_eq!(answer, "Arrays are contiguous.");
            assert_eq!(citations.len(), 1);
        }
        other => panic!("expected tutor output, got {:?}", other),
    }
    assert!(response.meta.contains_key("retrieved"));

    // Context snippets flow into the prompt.
    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("array basics and indexing"));
    assert!(prompts[0].contains("what is an array?"));

    let history = store.get_history(&session_id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, ChatRole::User);
    assert_eq!(history[1].role, ChatRole::Assistant);
    assert_eq!(history[1].content, "Arrays are contiguous.");
}

#[tokio::test]
async fn test_quiz_run_parses_and_persists_attempt() {
    let generator = Arc::new(ScriptedGenerator::new(vec![common::SAMPLE_QUIZ]));
    let (agent, store, _memory) = build_agent(generator.clone()).await;

    let response = agent
        .run(TaskKind::Quiz, "binary trees", &[], None)
        .await
        .unwrap();
    let session_id = response.session_id.clone().unwrap();

    let TaskOutput::Quiz { raw, questions } = &response.output else {
        panic!("expected quiz output");
    };
    assert_eq!(raw, common::SAMPLE_QUIZ);
    assert_eq!(questions.len(), 2);
    // Ids are back-filled from the persisted attempt.
    assert!(questions.iter().all(|q| q.id.is_some()));
    assert!(response.meta.contains_key("quiz_attempt_id"));

    let attempts = store.get_quiz_history(&session_id).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].topic, "binary trees");
    assert_eq!(attempts[0].total_questions, 2);
}

#[tokio::test]
async fn test_quiz_without_topic_skips_the_model() {
    let generator = Arc::new(ScriptedGenerator::new(vec![]));
    let (agent, store, _memory) = build_agent(generator.clone()).await;

    let response = agent.run(TaskKind::Quiz, "   ", &[], None).await.unwrap();
    let session_id = response.session_id.clone().unwrap();

    let TaskOutput::Quiz { raw, questions } = &response.output else {
        panic!("expected quiz output");
    };
    assert_eq!(raw, "Please enter a topic for the quiz.");
    assert!(questions.is_empty());
    assert_eq!(generator.calls(), 0);

    // The empty attempt is still observable in history.
    let attempts = store.get_quiz_history(&session_id).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].total_questions, 0);
}

#[tokio::test]
async fn test_quiz_prompt_carries_weak_topic_focus() {
    let generator = Arc::new(ScriptedGenerator::new(vec![common::SAMPLE_QUIZ]));
    let (agent, store, _memory) = build_agent(generator.clone()).await;

    let session_id = store.ensure_session(None).await.unwrap();
    store
        .log_weak_topics(&session_id, "- tree rotations: mixes up directions")
        .await
        .unwrap();

    agent
        .run(TaskKind::Quiz, "trees", &[], Some(&session_id))
        .await
        .unwrap();

    let prompts = generator.prompts();
    assert!(prompts[0].contains("Focus heavily on these weak areas"));
    assert!(prompts[0].contains("tree rotations"));
}

#[tokio::test]
async fn test_analyze_run_persists_weak_topics() {
    let summary = "- recursion: struggles with base cases\n- pointers: aliasing confusion";
    let generator = Arc::new(ScriptedGenerator::new(vec![summary]));
    let (agent, store, _memory) = build_agent(generator.clone()).await;

    let history = vec!["explain recursion".to_string(), "quiz result 1/5".to_string()];
    let response = agent
        .run(TaskKind::Analyze, "how am I doing?", &history, None)
        .await
        .unwrap();
    let session_id = response.session_id.clone().unwrap();

    let TaskOutput::Analysis { summary: got } = &response.output else {
        panic!("expected analysis output");
    };
    assert_eq!(got, summary);
    assert!(generator.prompts()[0].contains("quiz result 1/5"));

    let topics = store.get_weak_topics(&session_id).await.unwrap();
    assert_eq!(topics.len(), 2);
    let tasks = store.get_roadmap_tasks(&session_id).await.unwrap();
    assert_eq!(tasks.len(), 2);
}

#[tokio::test]
async fn test_analyze_prompt_carries_the_request_text() {
    let generator = Arc::new(ScriptedGenerator::new(vec!["- traversals: order confusion"]));
    let (agent, _store, _memory) = build_agent(generator.clone()).await;

    agent
        .run(
            TaskKind::Analyze,
            "Wrong answers:\n- Q: traversal order\n  Correct: Preorder\n  User answered: Inorder",
            &[],
            None,
        )
        .await
        .unwrap();

    // With no history at all, the request text alone reaches the model.
    let prompt = &generator.prompts()[0];
    assert!(prompt.contains("User answered: Inorder"));
    assert!(prompt.contains("Correct: Preorder"));
}

#[tokio::test]
async fn test_model_failure_becomes_error_output() {
    let (agent, store, _memory) = build_agent(Arc::new(FailingGenerator)).await;

    let response = agent
        .run(TaskKind::Roadmap, "learn rust", &[], None)
        .await
        .unwrap();
    let session_id = response.session_id.clone().unwrap();

    let TaskOutput::Error { error } = &response.output else {
        panic!("expected error output");
    };
    assert!(error.contains("model backend unavailable"));

    // The user message is logged; no assistant message for the failed run.
    let history = store.get_history(&session_id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].role, ChatRole::User);
}

#[tokio::test]
async fn test_learn_cycle_end_to_end() {
    let generator = Arc::new(ScriptedGenerator::new(vec![
        "A tree is a hierarchical structure.",
        common::SAMPLE_QUIZ,
        "- tree height: confuses depth and height",
    ]));
    let (agent, store, _memory) = build_agent(generator.clone()).await;
    let learn = LearnOrchestrator::new(agent, store.clone());

    // Phase 1: teach.
    let start = learn.start_learning(None, "trees").await.unwrap();
    assert_eq!(start.phase, "learn");
    assert_eq!(start.teaching, "A tree is a hierarchical structure.");
    assert_eq!(start.next_action, "quiz");
    let session_id = start.session_id.clone();

    // Phase 2: quiz.
    let quiz = learn
        .generate_concept_quiz(&session_id, "trees", false)
        .await
        .unwrap();
    assert_eq!(quiz.phase, "quiz");
    assert_eq!(quiz.questions.len(), 2);
    let attempt_id = quiz.attempt_id.expect("attempt id present");

    // Answer one of two correctly.
    store
        .record_quiz_answer(
            &session_id,
            attempt_id,
            quiz.questions[0].id,
            Some(1),
            Some("O(log n)"),
            true,
            None,
            None,
        )
        .await
        .unwrap();
    store
        .record_quiz_answer(
            &session_id,
            attempt_id,
            quiz.questions[1].id,
            Some(0),
            Some("Inorder"),
            false,
            None,
            None,
        )
        .await
        .unwrap();

    // Phase 3: analyze.
    let analysis = learn
        .analyze_quiz_results(&session_id, attempt_id, "trees")
        .await
        .unwrap();
    assert_eq!(analysis.phase, "analyze");
    assert_eq!(analysis.wrong_questions.len(), 1);
    assert_eq!(analysis.wrong_questions[0].user_answer, "Inorder");
    assert_eq!(analysis.wrong_questions[0].correct_answer, "Preorder");
    // 50% accuracy damped by one attempt: well below the practice threshold.
    assert!(analysis.needs_practice);
    assert_eq!(analysis.next_action, "focused_quiz");
    assert!(analysis.analysis.contains("tree height"));
    assert!((analysis.mastery.mastery_score - 10.0).abs() < 1e-9);

    // The analysis prompt names the wrong answer.
    let prompts = generator.prompts();
    assert!(prompts.last().unwrap().contains("Inorder"));
}

#[tokio::test]
async fn test_perfect_score_skips_analysis_model_call() {
    let generator = Arc::new(ScriptedGenerator::new(vec![common::SAMPLE_QUIZ]));
    let (agent, store, _memory) = build_agent(generator.clone()).await;
    let learn = LearnOrchestrator::new(agent, store.clone());

    let session_id = store.ensure_session(None).await.unwrap();
    let quiz = learn
        .generate_concept_quiz(&session_id, "trees", false)
        .await
        .unwrap();
    let attempt_id = quiz.attempt_id.unwrap();

    for (question, correct_option) in quiz.questions.iter().zip(["O(log n)", "Preorder"]) {
        store
            .record_quiz_answer(
                &session_id,
                attempt_id,
                question.id,
                question.correct_index.map(|i| i as i64),
                Some(correct_option),
                true,
                None,
                None,
            )
            .await
            .unwrap();
    }

    let calls_before = generator.calls();
    let analysis = learn
        .analyze_quiz_results(&session_id, attempt_id, "trees")
        .await
        .unwrap();
    assert_eq!(generator.calls(), calls_before);
    assert!(analysis.wrong_questions.is_empty());
    assert!(analysis.analysis.contains("Perfect score"));
    // 100% accuracy, one attempt: 100 * 1/5 = 20, still needs practice.
    assert!(analysis.needs_practice);
}

#[tokio::test]
async fn test_unknown_attempt_is_an_error() {
    let (agent, store, _memory) = build_agent(Arc::new(ScriptedGenerator::new(vec![]))).await;
    let learn = LearnOrchestrator::new(agent, store.clone());
    let session_id = store.ensure_session(None).await.unwrap();

    let err = learn
        .analyze_quiz_results(&session_id, 42, "trees")
        .await
        .unwrap_err();
    assert!(matches!(err, paideia::PaideiaError::AttemptNotFound(42)));
}

#[tokio::test]
async fn test_focused_quiz_prompt_includes_concept_weak_details() {
    let generator = Arc::new(ScriptedGenerator::new(vec![common::SAMPLE_QUIZ]));
    let (agent, store, _memory) = build_agent(generator.clone()).await;
    let learn = LearnOrchestrator::new(agent, store.clone());

    let session_id = store.ensure_session(None).await.unwrap();
    store
        .log_weak_topics(
            &session_id,
            "- trees balance: rotations\n- graphs: unrelated topic",
        )
        .await
        .unwrap();

    learn
        .generate_concept_quiz(&session_id, "trees", true)
        .await
        .unwrap();

    // Only weak topics whose title mentions the concept are pulled in.
    let prompt = &generator.prompts()[0];
    assert!(prompt.contains("trees - Focus on: rotations"));
}

#[tokio::test]
async fn test_learning_progress_statuses() {
    let (agent, store, _memory) = build_agent(Arc::new(ScriptedGenerator::new(vec![]))).await;
    let learn = LearnOrchestrator::new(agent, store.clone());
    let session_id = store.ensure_session(None).await.unwrap();

    // Unknown concept reports not_started.
    let progress = learn
        .get_learning_progress(&session_id, Some("sorting"))
        .await
        .unwrap();
    let paideia::learn::LearningProgress::Concept(concept) = progress else {
        panic!("expected concept progress");
    };
    assert_eq!(concept.status, "not_started");
    assert_eq!(concept.mastery_score, 0.0);

    // Drive a concept to full mastery: five perfect attempts saturate the
    // confidence factor.
    for _ in 0..5 {
        store
            .update_concept_mastery(&session_id, "sorting", 5, 5)
            .await
            .unwrap();
    }
    let progress = learn
        .get_learning_progress(&session_id, Some("sorting"))
        .await
        .unwrap();
    let paideia::learn::LearningProgress::Concept(concept) = progress else {
        panic!("expected concept progress");
    };
    assert_eq!(concept.status, "mastered");

    // Overview buckets the concepts by score.
    store
        .update_concept_mastery(&session_id, "graphs", 1, 5)
        .await
        .unwrap();
    let progress = learn.get_learning_progress(&session_id, None).await.unwrap();
    let paideia::learn::LearningProgress::Overview(overview) = progress else {
        panic!("expected overview");
    };
    assert_eq!(overview.total_concepts, 2);
    assert_eq!(overview.mastered, 1);
    assert_eq!(overview.needs_work, 1);
}
