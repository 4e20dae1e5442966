//! Persistence for quizgen.
//!
//! Trait seams for quiz storage and account/session storage, with a SQLite
//! implementation of both.

mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::generation::QuizDraft;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered account.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
}

/// Account data ready for insertion.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// A persisted quiz with its questions in generation order.
#[derive(Debug, Clone, Serialize)]
pub struct Quiz {
    pub id: i64,
    #[serde(skip)]
    pub owner_id: i64,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub video_url: String,
    pub questions: Vec<Question>,
}

/// A persisted question.
#[derive(Debug, Clone, Serialize)]
pub struct Question {
    pub id: i64,
    pub question_title: String,
    pub question_options: Vec<String>,
    pub answer: String,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub updated_at: DateTime<Utc>,
}

/// Kind of session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl std::str::FromStr for TokenKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "access" => Ok(TokenKind::Access),
            "refresh" => Ok(TokenKind::Refresh),
            _ => Err(format!("Unknown token kind: {}", s)),
        }
    }
}

/// A stored session token, keyed by the digest of its secret.
#[derive(Debug, Clone)]
pub struct TokenRecord {
    pub token_hash: String,
    pub user_id: i64,
    pub kind: TokenKind,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Set once the token is blacklisted.
    pub revoked_at: Option<DateTime<Utc>>,
}

impl TokenRecord {
    /// Whether the token may still be used at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

/// Storage for quizzes and their questions.
#[async_trait]
pub trait QuizStore: Send + Sync {
    /// Persist a fully validated draft: one quiz row plus all of its questions,
    /// committed together or not at all.
    async fn create_quiz(&self, owner_id: i64, video_url: &str, draft: &QuizDraft) -> Result<Quiz>;

    /// All quizzes owned by a user, newest first.
    async fn list_quizzes(&self, owner_id: i64) -> Result<Vec<Quiz>>;

    /// A single quiz, only if owned by the user.
    async fn get_quiz(&self, owner_id: i64, quiz_id: i64) -> Result<Option<Quiz>>;
}

/// Storage for accounts and session tokens.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn create_user(&self, user: &NewUser) -> Result<User>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>>;

    async fn email_exists(&self, email: &str) -> Result<bool>;

    async fn insert_token(&self, token: &TokenRecord) -> Result<()>;

    async fn find_token(&self, token_hash: &str) -> Result<Option<TokenRecord>>;

    /// Blacklist a token. Returns false if it was unknown or already revoked.
    async fn revoke_token(&self, token_hash: &str, at: DateTime<Utc>) -> Result<bool>;
}
