//! HTTP API server

use crate::agent::StudyAgent;
use crate::error::PaideiaError;
use crate::learn::LearnOrchestrator;
use crate::memory::VectorMemory;
use crate::orchestrator::Orchestrator;
use crate::storage::ProgressStore;
use crate::types::{ChatRole, TaskKind, TaskStatus};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Server address
    pub addr: SocketAddr,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            addr: ([127, 0, 0, 1], 8001).into(),
        }
    }
}

/// API server state
#[derive(Clone)]
struct AppState {
    memory: Arc<VectorMemory>,
    store: Arc<dyn ProgressStore>,
    agent: Arc<StudyAgent>,
    orchestrator: Arc<Orchestrator>,
    learn: Arc<LearnOrchestrator>,
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(
        config: ApiServerConfig,
        memory: Arc<VectorMemory>,
        store: Arc<dyn ProgressStore>,
        agent: Arc<StudyAgent>,
        orchestrator: Arc<Orchestrator>,
        learn: Arc<LearnOrchestrator>,
    ) -> Self {
        Self {
            config,
            state: AppState {
                memory,
                store,
                agent,
                orchestrator,
                learn,
            },
        }
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/api/health", get(health_handler))
            .route("/api/memory", post(ingest_memory_handler))
            .route("/api/agent", post(run_agent_handler))
            .route("/api/history", get(history_handler))
            .route("/api/weak-topics", get(weak_topics_handler))
            .route("/api/analysis", get(analysis_handler))
            .route("/api/quiz-history", get(quiz_history_handler))
            .route("/api/roadmap", get(roadmap_handler))
            .route("/api/roadmap/task-status", post(task_status_handler))
            .route("/api/quiz-answer", post(quiz_answer_handler))
            .route("/api/recommendations", get(recommendations_handler))
            .route("/api/learn/start", post(learn_start_handler))
            .route("/api/learn/quiz", post(learn_quiz_handler))
            .route("/api/learn/analyze", post(learn_analyze_handler))
            .route("/api/learn/progress", get(learn_progress_handler))
            .route("/api/mastery", get(mastery_handler))
            .with_state(state)
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Bind and serve until the process exits
    pub async fn serve(self) -> anyhow::Result<()> {
        let router = Self::build_router(self.state);
        let listener = tokio::net::TcpListener::bind(self.config.addr).await?;
        info!("API server listening on http://{}", self.config.addr);
        axum::serve(listener, router).await?;
        Ok(())
    }
}

/// Error responder: storage and model failures become JSON error bodies
struct ApiError(PaideiaError);

impl From<PaideiaError> for ApiError {
    fn from(e: PaideiaError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PaideiaError::AttemptNotFound(_) | PaideiaError::SessionNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            PaideiaError::InvalidOperation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            warn!("Request failed: {}", self.0);
        }
        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Deserialize)]
struct SessionQuery {
    session_id: String,
    concept: Option<String>,
}

impl SessionQuery {
    fn validate(&self) -> ApiResult<&str> {
        if self.session_id.is_empty() {
            return Err(ApiError(PaideiaError::InvalidOperation(
                "session_id is required".to_string(),
            )));
        }
        Ok(&self.session_id)
    }
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

#[derive(Debug, Deserialize)]
struct IngestRequest {
    #[serde(default)]
    texts: Vec<String>,
}

async fn ingest_memory_handler(
    State(state): State<AppState>,
    Json(req): Json<IngestRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let texts: Vec<String> = req.texts.into_iter().filter(|t| !t.is_empty()).collect();
    if texts.is_empty() {
        return Ok(Json(json!({ "added": 0, "ids": [] })));
    }
    let ids = state.memory.add_texts(texts, None).await?;
    Ok(Json(json!({ "added": ids.len(), "ids": ids })))
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[allow(dead_code)]
    role: ChatRole,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AgentRequest {
    task: TaskKind,
    input: String,
    #[serde(default)]
    history: Option<Vec<ChatMessage>>,
    session_id: Option<String>,
}

async fn run_agent_handler(
    State(state): State<AppState>,
    Json(req): Json<AgentRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let history: Vec<String> = req
        .history
        .unwrap_or_default()
        .into_iter()
        .map(|m| m.content)
        .collect();
    let response = state
        .agent
        .run(req.task, &req.input, &history, req.session_id.as_deref())
        .await?;
    Ok(Json(serde_json::to_value(&response).map_err(PaideiaError::from)?))
}

async fn history_handler(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let session_id = query.validate()?;
    let messages = state.store.get_history(session_id).await?;
    Ok(Json(json!({ "session_id": session_id, "messages": messages })))
}

async fn weak_topics_handler(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let session_id = query.validate()?;
    let weak_topics = state.store.get_weak_topics(session_id).await?;
    Ok(Json(json!({ "session_id": session_id, "weak_topics": weak_topics })))
}

/// Latest analysis summary, if the session has one
async fn analysis_handler(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let session_id = query.validate()?;
    let history = state.store.get_history(session_id).await?;
    let latest = history
        .iter()
        .rev()
        .find(|m| m.task == Some(TaskKind::Analyze) && m.role == ChatRole::Assistant);
    match latest {
        Some(msg) => Ok(Json(json!({
            "session_id": session_id,
            "summary": msg.content,
            "timestamp": msg.created_at,
        }))),
        None => Ok(Json(json!({ "session_id": session_id, "summary": null }))),
    }
}

async fn quiz_history_handler(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let session_id = query.validate()?;
    let quiz_history = state.store.get_quiz_history(session_id).await?;
    Ok(Json(json!({ "session_id": session_id, "quiz_history": quiz_history })))
}

async fn roadmap_handler(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let session_id = query.validate()?;
    let tasks = state.store.get_roadmap_tasks(session_id).await?;
    Ok(Json(json!({ "session_id": session_id, "tasks": tasks })))
}

#[derive(Debug, Deserialize)]
struct TaskStatusUpdate {
    session_id: String,
    task_id: i64,
    status: TaskStatus,
}

async fn task_status_handler(
    State(state): State<AppState>,
    Json(payload): Json<TaskStatusUpdate>,
) -> ApiResult<Json<serde_json::Value>> {
    let updated = state
        .store
        .update_task_status(&payload.session_id, payload.task_id, payload.status)
        .await?;
    if !updated {
        return Err(ApiError(PaideiaError::InvalidOperation(
            "Task not found or invalid status".to_string(),
        )));
    }
    Ok(Json(json!({ "status": "ok" })))
}

#[derive(Debug, Deserialize)]
struct QuizAnswerSubmission {
    session_id: String,
    attempt_id: i64,
    question_id: Option<i64>,
    selected_index: Option<i64>,
    #[serde(default)]
    selected_option: Option<String>,
    is_correct: bool,
    #[serde(default)]
    note: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

async fn quiz_answer_handler(
    State(state): State<AppState>,
    Json(payload): Json<QuizAnswerSubmission>,
) -> ApiResult<Json<serde_json::Value>> {
    let recorded = state
        .store
        .record_quiz_answer(
            &payload.session_id,
            payload.attempt_id,
            payload.question_id,
            payload.selected_index,
            payload.selected_option.as_deref(),
            payload.is_correct,
            payload.note.as_deref(),
            payload.confidence,
        )
        .await?;
    if !recorded {
        return Err(ApiError(PaideiaError::InvalidOperation(
            "Failed to record answer".to_string(),
        )));
    }
    Ok(Json(json!({ "status": "ok" })))
}

async fn recommendations_handler(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let session_id = query.validate()?;
    let next_action = state
        .orchestrator
        .get_next_recommended_action(session_id)
        .await?;
    let performance = state
        .orchestrator
        .analyze_quiz_performance(session_id)
        .await?;
    Ok(Json(json!({
        "session_id": session_id,
        "next_action": next_action,
        "performance": performance,
    })))
}

#[derive(Debug, Deserialize)]
struct LearnStartRequest {
    session_id: Option<String>,
    concept: String,
}

async fn learn_start_handler(
    State(state): State<AppState>,
    Json(payload): Json<LearnStartRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let result = state
        .learn
        .start_learning(payload.session_id.as_deref(), &payload.concept)
        .await?;
    Ok(Json(serde_json::to_value(&result).map_err(PaideiaError::from)?))
}

#[derive(Debug, Deserialize)]
struct LearnQuizRequest {
    session_id: String,
    concept: String,
    #[serde(default)]
    focus_weak_areas: bool,
}

async fn learn_quiz_handler(
    State(state): State<AppState>,
    Json(payload): Json<LearnQuizRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let result = state
        .learn
        .generate_concept_quiz(&payload.session_id, &payload.concept, payload.focus_weak_areas)
        .await?;
    Ok(Json(serde_json::to_value(&result).map_err(PaideiaError::from)?))
}

#[derive(Debug, Deserialize)]
struct LearnAnalyzeRequest {
    session_id: String,
    attempt_id: i64,
    concept: String,
}

async fn learn_analyze_handler(
    State(state): State<AppState>,
    Json(payload): Json<LearnAnalyzeRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let result = state
        .learn
        .analyze_quiz_results(&payload.session_id, payload.attempt_id, &payload.concept)
        .await?;
    Ok(Json(serde_json::to_value(&result).map_err(PaideiaError::from)?))
}

async fn learn_progress_handler(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let session_id = query.validate()?;
    let result = state
        .learn
        .get_learning_progress(session_id, query.concept.as_deref())
        .await?;
    Ok(Json(serde_json::to_value(&result).map_err(PaideiaError::from)?))
}

async fn mastery_handler(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let session_id = query.validate()?;
    let masteries = state.store.get_concept_mastery(session_id, None).await?;
    Ok(Json(json!({ "session_id": session_id, "masteries": masteries })))
}
