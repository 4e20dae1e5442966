//! SQLite-backed storage for quizzes, questions, users and session tokens.

use super::{AccountStore, NewUser, Question, Quiz, QuizStore, TokenRecord, User};
use crate::error::{QuizgenError, Result};
use crate::generation::QuizDraft;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS quizzes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        video_url TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_quizzes_owner_id ON quizzes(owner_id);

    CREATE TABLE IF NOT EXISTS questions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        quiz_id INTEGER NOT NULL REFERENCES quizzes(id) ON DELETE CASCADE,
        position INTEGER NOT NULL,
        question_title TEXT NOT NULL CHECK (question_title <> ''),
        question_options TEXT NOT NULL,
        answer TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_questions_quiz_id ON questions(quiz_id);

    CREATE TABLE IF NOT EXISTS auth_tokens (
        token_hash TEXT PRIMARY KEY,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        kind TEXT NOT NULL,
        issued_at TEXT NOT NULL,
        expires_at TEXT NOT NULL,
        revoked_at TEXT
    );
"#;

/// SQLite store implementing both [`QuizStore`] and [`AccountStore`].
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let store = Self::init(conn)?;

        info!("Initialized SQLite store at {:?}", path);
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| QuizgenError::Storage(format!("Failed to acquire lock: {}", e)))
    }

    /// Number of stored quizzes and questions, across all owners.
    pub fn counts(&self) -> Result<(usize, usize)> {
        let conn = self.conn()?;
        let quizzes: i64 = conn.query_row("SELECT COUNT(*) FROM quizzes", [], |row| row.get(0))?;
        let questions: i64 =
            conn.query_row("SELECT COUNT(*) FROM questions", [], |row| row.get(0))?;
        Ok((quizzes as usize, questions as usize))
    }

    fn insert_quiz(
        tx: &Transaction<'_>,
        owner_id: i64,
        title: &str,
        description: &str,
        video_url: &str,
        now: &str,
    ) -> Result<i64> {
        tx.execute(
            r#"
            INSERT INTO quizzes (owner_id, title, description, video_url, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
            params![owner_id, title, description, video_url, now],
        )?;
        Ok(tx.last_insert_rowid())
    }

    fn insert_question(
        tx: &Transaction<'_>,
        quiz_id: i64,
        position: usize,
        title: &str,
        options: &[String],
        answer: &str,
        now: &str,
    ) -> Result<i64> {
        let options_json = serde_json::to_string(options)?;
        tx.execute(
            r#"
            INSERT INTO questions
            (quiz_id, position, question_title, question_options, answer, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            "#,
            params![quiz_id, position as i64, title, options_json, answer, now],
        )?;
        Ok(tx.last_insert_rowid())
    }

    fn load_questions(conn: &Connection, sql: &str, key: i64) -> Result<HashMap<i64, Vec<Question>>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![key], |row| {
            let options_json: String = row.get(3)?;
            Ok((
                row.get::<_, i64>(0)?,
                Question {
                    id: row.get(1)?,
                    question_title: row.get(2)?,
                    question_options: serde_json::from_str(&options_json).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e))
                    })?,
                    answer: row.get(4)?,
                    created_at: timestamp(row, 5)?,
                    updated_at: timestamp(row, 6)?,
                },
            ))
        })?;

        let mut grouped: HashMap<i64, Vec<Question>> = HashMap::new();
        for row in rows {
            let (quiz_id, question) = row?;
            grouped.entry(quiz_id).or_default().push(question);
        }
        Ok(grouped)
    }
}

fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// RFC 3339 timestamp stored in column `idx`.
fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    parse_timestamp(idx, &row.get::<_, String>(idx)?)
}

fn quiz_from_row(row: &Row<'_>) -> rusqlite::Result<Quiz> {
    Ok(Quiz {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        video_url: row.get(4)?,
        created_at: timestamp(row, 5)?,
        updated_at: timestamp(row, 6)?,
        questions: Vec::new(),
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: timestamp(row, 4)?,
    })
}

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<TokenRecord> {
    let kind: String = row.get(2)?;
    let revoked_at: Option<String> = row.get(5)?;
    Ok(TokenRecord {
        token_hash: row.get(0)?,
        user_id: row.get(1)?,
        kind: kind.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(2, Type::Text, e.into())
        })?,
        issued_at: timestamp(row, 3)?,
        expires_at: timestamp(row, 4)?,
        revoked_at: revoked_at
            .as_deref()
            .map(|value| parse_timestamp(5, value))
            .transpose()?,
    })
}

const QUIZ_COLUMNS: &str = "id, owner_id, title, description, video_url, created_at, updated_at";
const USER_COLUMNS: &str = "id, username, email, password_hash, created_at";

#[async_trait]
impl QuizStore for SqliteStore {
    #[instrument(skip(self, draft), fields(title = %draft.title))]
    async fn create_quiz(&self, owner_id: i64, video_url: &str, draft: &QuizDraft) -> Result<Quiz> {
        let conn = self.conn()?;
        let now = Utc::now();
        let now_str = now.to_rfc3339();

        let tx = conn.unchecked_transaction()?;

        let quiz_id = Self::insert_quiz(
            &tx,
            owner_id,
            &draft.title,
            &draft.description,
            video_url,
            &now_str,
        )?;

        let mut questions = Vec::with_capacity(draft.questions.len());
        for (position, q) in draft.questions.iter().enumerate() {
            let id = Self::insert_question(
                &tx,
                quiz_id,
                position,
                &q.question_title,
                &q.options,
                &q.answer,
                &now_str,
            )?;
            questions.push(Question {
                id,
                question_title: q.question_title.clone(),
                question_options: q.options.clone(),
                answer: q.answer.clone(),
                created_at: now,
                updated_at: now,
            });
        }

        tx.commit()?;
        info!("Stored quiz {} with {} questions", quiz_id, questions.len());

        Ok(Quiz {
            id: quiz_id,
            owner_id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            created_at: now,
            updated_at: now,
            video_url: video_url.to_string(),
            questions,
        })
    }

    #[instrument(skip(self))]
    async fn list_quizzes(&self, owner_id: i64) -> Result<Vec<Quiz>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM quizzes WHERE owner_id = ?1 ORDER BY created_at DESC, id DESC",
            QUIZ_COLUMNS
        ))?;
        let mut quizzes = stmt
            .query_map(params![owner_id], quiz_from_row)?
            .collect::<rusqlite::Result<Vec<Quiz>>>()?;

        let mut questions = Self::load_questions(
            &conn,
            r#"
            SELECT q.quiz_id, q.id, q.question_title, q.question_options, q.answer,
                   q.created_at, q.updated_at
            FROM questions q
            JOIN quizzes z ON z.id = q.quiz_id
            WHERE z.owner_id = ?1
            ORDER BY q.quiz_id, q.position
            "#,
            owner_id,
        )?;

        for quiz in &mut quizzes {
            quiz.questions = questions.remove(&quiz.id).unwrap_or_default();
        }

        debug!("Found {} quizzes for owner {}", quizzes.len(), owner_id);
        Ok(quizzes)
    }

    #[instrument(skip(self))]
    async fn get_quiz(&self, owner_id: i64, quiz_id: i64) -> Result<Option<Quiz>> {
        let conn = self.conn()?;

        let quiz = conn
            .query_row(
                &format!(
                    "SELECT {} FROM quizzes WHERE id = ?1 AND owner_id = ?2",
                    QUIZ_COLUMNS
                ),
                params![quiz_id, owner_id],
                quiz_from_row,
            )
            .optional()?;

        let Some(mut quiz) = quiz else {
            return Ok(None);
        };

        let mut questions = Self::load_questions(
            &conn,
            r#"
            SELECT quiz_id, id, question_title, question_options, answer, created_at, updated_at
            FROM questions
            WHERE quiz_id = ?1
            ORDER BY position
            "#,
            quiz_id,
        )?;
        quiz.questions = questions.remove(&quiz_id).unwrap_or_default();

        Ok(Some(quiz))
    }
}

#[async_trait]
impl AccountStore for SqliteStore {
    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn create_user(&self, user: &NewUser) -> Result<User> {
        let conn = self.conn()?;
        let now = Utc::now();

        let inserted = conn.execute(
            r#"
            INSERT INTO users (username, email, password_hash, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![user.username, user.email, user.password_hash, now.to_rfc3339()],
        );

        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(QuizgenError::InvalidInput(
                    "A user with that username or email already exists.".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        }

        Ok(User {
            id: conn.last_insert_rowid(),
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            created_at: now,
        })
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS),
                params![username],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
                params![id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE email = ?1",
            params![email],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    async fn insert_token(&self, token: &TokenRecord) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO auth_tokens (token_hash, user_id, kind, issued_at, expires_at, revoked_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                token.token_hash,
                token.user_id,
                token.kind.as_str(),
                token.issued_at.to_rfc3339(),
                token.expires_at.to_rfc3339(),
                token.revoked_at.map(|dt| dt.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    async fn find_token(&self, token_hash: &str) -> Result<Option<TokenRecord>> {
        let conn = self.conn()?;
        let token = conn
            .query_row(
                r#"
                SELECT token_hash, user_id, kind, issued_at, expires_at, revoked_at
                FROM auth_tokens WHERE token_hash = ?1
                "#,
                params![token_hash],
                token_from_row,
            )
            .optional()?;
        Ok(token)
    }

    async fn revoke_token(&self, token_hash: &str, at: DateTime<Utc>) -> Result<bool> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE auth_tokens SET revoked_at = ?2 WHERE token_hash = ?1 AND revoked_at IS NULL",
            params![token_hash, at.to_rfc3339()],
        )?;
        Ok(updated > 0)
    }
}
