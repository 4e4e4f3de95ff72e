//! LibSQL progress store implementation
//!
//! Stores learning progress in SQLite via libsql. Every logical operation
//! runs inside a single transaction, so concurrent requests never observe
//! partial writes (e.g., a quiz attempt row without its question rows).

use crate::error::{PaideiaError, Result};
use crate::storage::{parse_summary, title_case, ProgressStore};
use crate::types::{
    mastery_score, AnswerRecord, AttemptRecord, ChatRole, MasteryRecord, MessageRecord,
    ParsedQuestion, QuestionRecord, RoadmapTaskRecord, TaskKind, TaskStatus, WeakTopicRecord,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{params, Builder, Connection, Database};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info};

/// Embedded schema, applied on startup
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS chat_sessions (
    id TEXT PRIMARY KEY NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL REFERENCES chat_sessions(id),
    role TEXT NOT NULL CHECK(role IN ('user', 'assistant', 'system')),
    content TEXT NOT NULL,
    task TEXT,
    meta TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS weak_topics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL REFERENCES chat_sessions(id),
    topic TEXT NOT NULL,
    detail TEXT NOT NULL DEFAULT '',
    severity TEXT,
    source TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS quiz_attempts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL REFERENCES chat_sessions(id),
    task TEXT,
    topic TEXT NOT NULL DEFAULT '',
    raw_output TEXT NOT NULL DEFAULT '',
    total_questions INTEGER NOT NULL DEFAULT 0,
    correct_count INTEGER NOT NULL DEFAULT 0,
    meta TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS quiz_questions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    attempt_id INTEGER NOT NULL REFERENCES quiz_attempts(id) ON DELETE CASCADE,
    sequence INTEGER NOT NULL,
    question TEXT NOT NULL,
    options TEXT NOT NULL DEFAULT '[]',
    correct_index INTEGER,
    explanation TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS quiz_answers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    attempt_id INTEGER NOT NULL REFERENCES quiz_attempts(id) ON DELETE CASCADE,
    question_id INTEGER REFERENCES quiz_questions(id) ON DELETE SET NULL,
    selected_index INTEGER,
    selected_option TEXT,
    is_correct INTEGER NOT NULL DEFAULT 0,
    note TEXT,
    confidence REAL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS roadmap_tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL REFERENCES chat_sessions(id),
    title TEXT NOT NULL,
    detail TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT 'pending' CHECK(status IN ('pending', 'complete')),
    priority INTEGER NOT NULL DEFAULT 3,
    weak_topic_id INTEGER REFERENCES weak_topics(id),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS concept_mastery (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL REFERENCES chat_sessions(id),
    concept TEXT NOT NULL,
    mastery_score REAL NOT NULL DEFAULT 0.0,
    total_questions INTEGER NOT NULL DEFAULT 0,
    correct_answers INTEGER NOT NULL DEFAULT 0,
    quiz_attempts INTEGER NOT NULL DEFAULT 0,
    last_practiced TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (session_id, concept)
);

CREATE INDEX IF NOT EXISTS idx_messages_session ON messages(session_id);
CREATE INDEX IF NOT EXISTS idx_weak_topics_session ON weak_topics(session_id);
CREATE INDEX IF NOT EXISTS idx_quiz_attempts_session ON quiz_attempts(session_id);
CREATE INDEX IF NOT EXISTS idx_quiz_questions_attempt ON quiz_questions(attempt_id);
CREATE INDEX IF NOT EXISTS idx_quiz_answers_attempt ON quiz_answers(attempt_id);
CREATE INDEX IF NOT EXISTS idx_roadmap_tasks_session ON roadmap_tasks(session_id);
CREATE INDEX IF NOT EXISTS idx_concept_mastery_session ON concept_mastery(session_id);
"#;

/// Database connection mode
#[derive(Debug, Clone)]
pub enum ConnectionMode {
    /// Local file-based database
    Local(String),
    /// In-memory database (for testing)
    InMemory,
}

/// LibSQL-backed progress store
pub struct LibsqlProgress {
    db: Database,
}

impl LibsqlProgress {
    /// Open (or create) a progress database and apply the schema
    pub async fn new(mode: ConnectionMode) -> Result<Self> {
        let db = match mode {
            ConnectionMode::Local(ref path) => {
                if let Some(parent) = std::path::Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                info!("Opening progress database at {}", path);
                Builder::new_local(path).build().await.map_err(|e| {
                    PaideiaError::Database(format!("failed to open database {}: {}", path, e))
                })?
            }
            ConnectionMode::InMemory => Builder::new_local(":memory:").build().await.map_err(
                |e| PaideiaError::Database(format!("failed to open in-memory database: {}", e)),
            )?,
        };

        let store = Self { db };
        store.init_schema().await?;
        Ok(store)
    }

    /// Open a local database at the given path
    pub async fn new_local(path: &str) -> Result<Self> {
        Self::new(ConnectionMode::Local(path.to_string())).await
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(SCHEMA).await?;
        debug!("Progress schema applied");
        Ok(())
    }

    fn get_conn(&self) -> Result<Connection> {
        self.db
            .connect()
            .map_err(|e| PaideiaError::Database(format!("failed to get connection: {}", e)))
    }

    async fn session_exists(&self, conn: &Connection, session_id: &str) -> Result<bool> {
        let mut rows = conn
            .query(
                "SELECT 1 FROM chat_sessions WHERE id = ?",
                params![session_id],
            )
            .await?;
        Ok(rows.next().await?.is_some())
    }

    /// Auto-create one roadmap task per weak topic, deduplicated on
    /// `(title, detail)` within the session
    async fn create_tasks_from_weak_topics(
        tx: &libsql::Transaction,
        session_id: &str,
        weak_topics: &[(i64, String, String)],
    ) -> Result<()> {
        let mut existing = std::collections::HashSet::new();
        let mut rows = tx
            .query(
                "SELECT title, detail FROM roadmap_tasks WHERE session_id = ?",
                params![session_id],
            )
            .await?;
        while let Some(row) = rows.next().await? {
            let title: String = row.get(0)?;
            let detail: String = row.get(1)?;
            existing.insert((title, detail));
        }

        for (topic_id, topic, detail) in weak_topics {
            let title = format!("Review {}", title_case(topic));
            let detail = if detail.is_empty() {
                format!("Practice {} until it feels comfortable.", topic)
            } else {
                detail.clone()
            };
            let key = (title.clone(), detail.clone());
            if existing.contains(&key) {
                continue;
            }
            let now = Utc::now().to_rfc3339();
            tx.execute(
                r#"
                INSERT INTO roadmap_tasks (session_id, title, detail, status, priority, weak_topic_id, created_at, updated_at)
                VALUES (?, ?, ?, 'pending', 1, ?, ?, ?)
                "#,
                params![session_id, title, detail, *topic_id, now.clone(), now],
            )
            .await?;
            existing.insert(key);
        }

        Ok(())
    }
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| PaideiaError::Other(format!("invalid timestamp '{}': {}", raw, e)))
}

fn parse_meta(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or(Value::Null)
}

fn decode_options(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

#[async_trait]
impl ProgressStore for LibsqlProgress {
    async fn ensure_session(&self, session_id: Option<&str>) -> Result<String> {
        let conn = self.get_conn()?;

        if let Some(id) = session_id {
            if self.session_exists(&conn, id).await? {
                return Ok(id.to_string());
            }
        }

        let new_id = uuid::Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO chat_sessions (id, created_at) VALUES (?, ?)",
            params![new_id.clone(), Utc::now().to_rfc3339()],
        )
        .await?;
        debug!("Created session {}", new_id);
        Ok(new_id)
    }

    async fn log_message(
        &self,
        session_id: &str,
        role: ChatRole,
        content: &str,
        task: Option<TaskKind>,
        meta: &Value,
    ) -> Result<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO messages (session_id, role, content, task, meta, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                session_id,
                role.as_str(),
                content,
                task.map(|t| t.as_str()),
                serde_json::to_string(meta)?,
                Utc::now().to_rfc3339(),
            ],
        )
        .await?;
        Ok(())
    }

    async fn log_quiz_attempt(
        &self,
        session_id: &str,
        topic: &str,
        raw_output: &str,
        questions: &[ParsedQuestion],
        task: Option<TaskKind>,
        meta: &Value,
    ) -> Result<(i64, Vec<i64>)> {
        let conn = self.get_conn()?;
        let tx = conn.transaction().await?;

        tx.execute(
            r#"
            INSERT INTO quiz_attempts (session_id, task, topic, raw_output, total_questions, correct_count, meta, created_at)
            VALUES (?, ?, ?, ?, ?, 0, ?, ?)
            "#,
            params![
                session_id,
                task.map(|t| t.as_str()),
                topic,
                raw_output,
                questions.len() as i64,
                serde_json::to_string(meta)?,
                Utc::now().to_rfc3339(),
            ],
        )
        .await?;
        let attempt_id = tx.last_insert_rowid();

        let mut question_ids = Vec::with_capacity(questions.len());
        for question in questions {
            tx.execute(
                r#"
                INSERT INTO quiz_questions (attempt_id, sequence, question, options, correct_index, explanation)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
                params![
                    attempt_id,
                    question.sequence as i64,
                    question.question.clone(),
                    serde_json::to_string(&question.options)?,
                    question.correct_index.map(|i| i as i64),
                    question.explanation.clone(),
                ],
            )
            .await?;
            question_ids.push(tx.last_insert_rowid());
        }

        tx.commit().await?;
        debug!(
            "Logged quiz attempt {} with {} questions",
            attempt_id,
            question_ids.len()
        );
        Ok((attempt_id, question_ids))
    }

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
    ) -> Result<bool> {
        let conn = self.get_conn()?;
        let tx = conn.transaction().await?;

        let mut rows = tx
            .query(
                "SELECT session_id FROM quiz_attempts WHERE id = ?",
                params![attempt_id],
            )
            .await?;
        let owner: Option<String> = match rows.next().await? {
            Some(row) => Some(row.get(0)?),
            None => None,
        };
        if owner.as_deref() != Some(session_id) {
            // Attempt missing or owned by another session: explicit failure.
            return Ok(false);
        }

        // A question id that does not belong to this attempt is dropped, not
        // treated as fatal; the answer is still recorded against the attempt.
        let mut question_id = question_id;
        if let Some(qid) = question_id {
            let mut rows = tx
                .query(
                    "SELECT attempt_id FROM quiz_questions WHERE id = ?",
                    params![qid],
                )
                .await?;
            let belongs = match rows.next().await? {
                Some(row) => row.get::<i64>(0)? == attempt_id,
                None => false,
            };
            if !belongs {
                question_id = None;
            }
        }

        tx.execute(
            r#"
            INSERT INTO quiz_answers (attempt_id, question_id, selected_index, selected_option, is_correct, note, confidence, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                attempt_id,
                question_id,
                selected_index,
                selected_option,
                is_correct as i64,
                note,
                confidence,
                Utc::now().to_rfc3339(),
            ],
        )
        .await?;

        // Recompute rather than increment: retries must not inflate the count.
        let mut rows = tx
            .query(
                "SELECT COUNT(*) FROM quiz_answers WHERE attempt_id = ? AND is_correct = 1",
                params![attempt_id],
            )
            .await?;
        let correct_count: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };
        tx.execute(
            "UPDATE quiz_attempts SET correct_count = ? WHERE id = ?",
            params![correct_count, attempt_id],
        )
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn get_history(&self, session_id: &str) -> Result<Vec<MessageRecord>> {
        let conn = self.get_conn()?;
        let mut rows = conn
            .query(
                r#"
                SELECT role, content, task, meta, created_at
                FROM messages WHERE session_id = ?
                ORDER BY created_at, id
                "#,
                params![session_id],
            )
            .await?;

        let mut history = Vec::new();
        while let Some(row) = rows.next().await? {
            let role_str: String = row.get(0)?;
            let task_str: Option<String> = row.get(2)?;
            let meta_str: String = row.get(3)?;
            let created_str: String = row.get(4)?;
            history.push(MessageRecord {
                role: ChatRole::from_str(&role_str)
                    .ok_or_else(|| PaideiaError::Other(format!("unknown role '{}'", role_str)))?,
                content: row.get(1)?,
                task: task_str.as_deref().and_then(TaskKind::from_str),
                meta: parse_meta(&meta_str),
                created_at: parse_ts(&created_str)?,
            });
        }
        Ok(history)
    }

    async fn get_quiz_history(&self, session_id: &str) -> Result<Vec<AttemptRecord>> {
        let conn = self.get_conn()?;
        let mut rows = conn
            .query(
                r#"
                SELECT id, task, topic, total_questions, correct_count, meta, created_at
                FROM quiz_attempts WHERE session_id = ?
                ORDER BY created_at DESC, id DESC
                "#,
                params![session_id],
            )
            .await?;

        let mut attempts = Vec::new();
        while let Some(row) = rows.next().await? {
            let task_str: Option<String> = row.get(1)?;
            let meta_str: String = row.get(5)?;
            let created_str: String = row.get(6)?;
            attempts.push(AttemptRecord {
                attempt_id: row.get(0)?,
                task: task_str.as_deref().and_then(TaskKind::from_str),
                topic: row.get(2)?,
                total_questions: row.get(3)?,
                correct_count: row.get(4)?,
                meta: parse_meta(&meta_str),
                created_at: parse_ts(&created_str)?,
                questions: Vec::new(),
            });
        }

        for attempt in &mut attempts {
            // Most recent answer per question wins (answers scanned in
            // insertion order, later entries overwrite earlier ones).
            let mut answer_map: HashMap<i64, AnswerRecord> = HashMap::new();
            let mut rows = conn
                .query(
                    r#"
                    SELECT question_id, selected_index, selected_option, is_correct, note, confidence, created_at
                    FROM quiz_answers WHERE attempt_id = ?
                    ORDER BY created_at, id
                    "#,
                    params![attempt.attempt_id],
                )
                .await?;
            while let Some(row) = rows.next().await? {
                let question_id: Option<i64> = row.get(0)?;
                let is_correct: i64 = row.get(3)?;
                let created_str: String = row.get(6)?;
                if let Some(qid) = question_id {
                    answer_map.insert(
                        qid,
                        AnswerRecord {
                            selected_index: row.get(1)?,
                            selected_option: row.get(2)?,
                            is_correct: is_correct != 0,
                            note: row.get(4)?,
                            confidence: row.get(5)?,
                            created_at: parse_ts(&created_str)?,
                        },
                    );
                }
            }

            let mut rows = conn
                .query(
                    r#"
                    SELECT id, sequence, question, options, correct_index, explanation
                    FROM quiz_questions WHERE attempt_id = ?
                    ORDER BY sequence
                    "#,
                    params![attempt.attempt_id],
                )
                .await?;
            while let Some(row) = rows.next().await? {
                let id: i64 = row.get(0)?;
                let sequence: i64 = row.get(1)?;
                let options_str: String = row.get(3)?;
                let correct_index: Option<i64> = row.get(4)?;
                attempt.questions.push(QuestionRecord {
                    id,
                    sequence: sequence as u32,
                    question: row.get(2)?,
                    options: decode_options(&options_str),
                    correct_index: correct_index.map(|i| i as usize),
                    explanation: row.get(5)?,
                    answer: answer_map.remove(&id),
                });
            }
        }

        Ok(attempts)
    }

    async fn log_weak_topics(&self, session_id: &str, summary: &str) -> Result<()> {
        let mut entries = parse_summary(summary);
        if entries.is_empty() {
            entries.push(("analysis".to_string(), summary.trim().to_string()));
        }

        let conn = self.get_conn()?;
        let tx = conn.transaction().await?;

        let mut created = Vec::with_capacity(entries.len());
        for (topic, detail) in &entries {
            tx.execute(
                r#"
                INSERT INTO weak_topics (session_id, topic, detail, created_at)
                VALUES (?, ?, ?, ?)
                "#,
                params![session_id, topic.clone(), detail.clone(), Utc::now().to_rfc3339()],
            )
            .await?;
            created.push((tx.last_insert_rowid(), topic.clone(), detail.clone()));
        }

        Self::create_tasks_from_weak_topics(&tx, session_id, &created).await?;

        tx.commit().await?;
        debug!("Logged {} weak topics for session {}", created.len(), session_id);
        Ok(())
    }

    async fn get_weak_topics(&self, session_id: &str) -> Result<Vec<WeakTopicRecord>> {
        let conn = self.get_conn()?;
        let mut rows = conn
            .query(
                r#"
                SELECT id, topic, detail, severity, source, created_at
                FROM weak_topics WHERE session_id = ?
                ORDER BY created_at DESC, id DESC
                "#,
                params![session_id],
            )
            .await?;

        let mut topics = Vec::new();
        while let Some(row) = rows.next().await? {
            let created_str: String = row.get(5)?;
            topics.push(WeakTopicRecord {
                id: row.get(0)?,
                title: row.get(1)?,
                detail: row.get(2)?,
                severity: row.get(3)?,
                source: row.get(4)?,
                created_at: parse_ts(&created_str)?,
            });
        }
        Ok(topics)
    }

    async fn get_roadmap_tasks(&self, session_id: &str) -> Result<Vec<RoadmapTaskRecord>> {
        let conn = self.get_conn()?;
        let mut rows = conn
            .query(
                r#"
                SELECT id, title, detail, status, priority, weak_topic_id, created_at, updated_at
                FROM roadmap_tasks WHERE session_id = ?
                ORDER BY status, priority, created_at
                "#,
                params![session_id],
            )
            .await?;

        let mut tasks = Vec::new();
        while let Some(row) = rows.next().await? {
            let status_str: String = row.get(3)?;
            let created_str: String = row.get(6)?;
            let updated_str: String = row.get(7)?;
            tasks.push(RoadmapTaskRecord {
                id: row.get(0)?,
                title: row.get(1)?,
                detail: row.get(2)?,
                status: TaskStatus::from_str(&status_str).ok_or_else(|| {
                    PaideiaError::Other(format!("unknown task status '{}'", status_str))
                })?,
                priority: row.get(4)?,
                weak_topic_id: row.get(5)?,
                created_at: parse_ts(&created_str)?,
                updated_at: parse_ts(&updated_str)?,
            });
        }
        Ok(tasks)
    }

    async fn update_task_status(
        &self,
        session_id: &str,
        task_id: i64,
        status: TaskStatus,
    ) -> Result<bool> {
        let conn = self.get_conn()?;
        let affected = conn
            .execute(
                "UPDATE roadmap_tasks SET status = ?, updated_at = ? WHERE id = ? AND session_id = ?",
                params![
                    status.as_str(),
                    Utc::now().to_rfc3339(),
                    task_id,
                    session_id
                ],
            )
            .await?;
        Ok(affected > 0)
    }

    async fn update_concept_mastery(
        &self,
        session_id: &str,
        concept: &str,
        correct: i64,
        total: i64,
    ) -> Result<MasteryRecord> {
        let conn = self.get_conn()?;
        let tx = conn.transaction().await?;
        let now = Utc::now().to_rfc3339();

        let mut rows = tx
            .query(
                r#"
                SELECT id, total_questions, correct_answers, quiz_attempts, created_at
                FROM concept_mastery WHERE session_id = ? AND concept = ?
                "#,
                params![session_id, concept],
            )
            .await?;

        let (id, total_questions, correct_answers, quiz_attempts, created_at) =
            match rows.next().await? {
                Some(row) => {
                    let id: i64 = row.get(0)?;
                    let total_questions: i64 = row.get::<i64>(1)? + total;
                    let correct_answers: i64 = row.get::<i64>(2)? + correct;
                    let quiz_attempts: i64 = row.get::<i64>(3)? + 1;
                    let created_str: String = row.get(4)?;
                    let score = mastery_score(total_questions, correct_answers, quiz_attempts);
                    tx.execute(
                        r#"
                        UPDATE concept_mastery
                        SET total_questions = ?, correct_answers = ?, quiz_attempts = ?,
                            mastery_score = ?, last_practiced = ?
                        WHERE id = ?
                        "#,
                        params![
                            total_questions,
                            correct_answers,
                            quiz_attempts,
                            score,
                            now.clone(),
                            id
                        ],
                    )
                    .await?;
                    (id, total_questions, correct_answers, quiz_attempts, created_str)
                }
                None => {
                    let score = mastery_score(total, correct, 1);
                    tx.execute(
                        r#"
                        INSERT INTO concept_mastery
                            (session_id, concept, mastery_score, total_questions, correct_answers, quiz_attempts, last_practiced, created_at)
                        VALUES (?, ?, ?, ?, ?, 1, ?, ?)
                        "#,
                        params![
                            session_id,
                            concept,
                            score,
                            total,
                            correct,
                            now.clone(),
                            now.clone()
                        ],
                    )
                    .await?;
                    (tx.last_insert_rowid(), total, correct, 1, now.clone())
                }
            };

        tx.commit().await?;

        Ok(MasteryRecord {
            id,
            concept: concept.to_string(),
            mastery_score: mastery_score(total_questions, correct_answers, quiz_attempts),
            total_questions,
            correct_answers,
            quiz_attempts,
            last_practiced: parse_ts(&now)?,
            created_at: parse_ts(&created_at)?,
        })
    }

    async fn get_concept_mastery(
        &self,
        session_id: &str,
        concept: Option<&str>,
    ) -> Result<Vec<MasteryRecord>> {
        let conn = self.get_conn()?;
        let mut rows = match concept {
            Some(concept) => {
                conn.query(
                    r#"
                    SELECT id, concept, mastery_score, total_questions, correct_answers, quiz_attempts, last_practiced, created_at
                    FROM concept_mastery WHERE session_id = ? AND concept = ?
                    ORDER BY mastery_score ASC
                    "#,
                    params![session_id, concept],
                )
                .await?
            }
            None => {
                conn.query(
                    r#"
                    SELECT id, concept, mastery_score, total_questions, correct_answers, quiz_attempts, last_practiced, created_at
                    FROM concept_mastery WHERE session_id = ?
                    ORDER BY mastery_score ASC
                    "#,
                    params![session_id],
                )
                .await?
            }
        };

        let mut masteries = Vec::new();
        while let Some(row) = rows.next().await? {
            let last_str: String = row.get(6)?;
            let created_str: String = row.get(7)?;
            masteries.push(MasteryRecord {
                id: row.get(0)?,
                concept: row.get(1)?,
                mastery_score: row.get(2)?,
                total_questions: row.get(3)?,
                correct_answers: row.get(4)?,
                quiz_attempts: row.get(5)?,
                last_practiced: parse_ts(&last_str)?,
                created_at: parse_ts(&created_str)?,
            });
        }
        Ok(masteries)
    }
}
