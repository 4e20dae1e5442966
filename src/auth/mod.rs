//! Accounts and cookie sessions for quizgen.
//!
//! Sessions use opaque random tokens. Only a SHA-256 digest of each token is
//! stored, alongside its owner, lifetime and revocation time.

mod password;

pub use password::{hash_password, verify_password};

use crate::config::AuthSettings;
use crate::error::{QuizgenError, Result};
use crate::store::{AccountStore, NewUser, TokenKind, TokenRecord, User};
use chrono::{Duration, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Field name to list of messages, as returned to API clients.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Registration request.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirmed_password: String,
}

/// Failure while registering an account.
#[derive(Error, Debug)]
pub enum RegisterError {
    #[error("Registration data is invalid")]
    Invalid(FieldErrors),

    #[error(transparent)]
    Storage(#[from] QuizgenError),
}

/// Tokens handed out on login.
#[derive(Debug, Clone)]
pub struct Session {
    pub access: String,
    pub refresh: String,
    pub user: User,
}

/// Issues, verifies and revokes session tokens.
pub struct AuthService {
    store: Arc<dyn AccountStore>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl AuthService {
    pub fn new(store: Arc<dyn AccountStore>, settings: &AuthSettings) -> Self {
        Self {
            store,
            access_ttl: Duration::seconds(settings.access_token_ttl_seconds),
            refresh_ttl: Duration::seconds(settings.refresh_token_ttl_seconds),
        }
    }

    /// Create an account after field validation.
    #[instrument(skip_all, fields(username = %registration.username))]
    pub async fn register(&self, registration: &Registration) -> std::result::Result<User, RegisterError> {
        let mut errors = FieldErrors::new();
        let mut push = |field: &str, msg: &str| {
            errors
                .entry(field.to_string())
                .or_default()
                .push(msg.to_string());
        };

        let username = registration.username.trim();
        let email = registration.email.trim();

        if username.is_empty() {
            push("username", "This field may not be blank.");
        }
        if email.is_empty() {
            push("email", "This field may not be blank.");
        } else if !looks_like_email(email) {
            push("email", "Enter a valid email address.");
        } else if self.store.email_exists(email).await? {
            push("email", "Email is already in use.");
        }
        if registration.password.is_empty() {
            push("password", "This field may not be blank.");
        }
        if registration.confirmed_password.is_empty() {
            push("confirmed_password", "This field may not be blank.");
        } else if registration.password != registration.confirmed_password {
            push("confirmed_password", "Passwords do not match.");
        }
        if !username.is_empty() && self.store.find_user_by_username(username).await?.is_some() {
            push("username", "A user with that username already exists.");
        }

        if !errors.is_empty() {
            return Err(RegisterError::Invalid(errors));
        }

        let user = self
            .store
            .create_user(&NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password_hash: hash_password(&registration.password),
            })
            .await?;

        info!("Registered user {}", user.id);
        Ok(user)
    }

    /// Check credentials and issue an access/refresh token pair.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let invalid = || {
            QuizgenError::Auth("No active account found with the given credentials".to_string())
        };

        let user = self
            .store
            .find_user_by_username(username)
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(password, &user.password_hash) {
            return Err(invalid());
        }

        let access = self.issue(user.id, TokenKind::Access).await?;
        let refresh = self.issue(user.id, TokenKind::Refresh).await?;

        info!("User {} logged in", user.id);
        Ok(Session {
            access,
            refresh,
            user,
        })
    }

    /// Resolve an access token to its user.
    pub async fn authenticate(&self, access_token: &str) -> Result<User> {
        let record = self.active_token(access_token, TokenKind::Access).await?;
        self.store
            .find_user_by_id(record.user_id)
            .await?
            .ok_or_else(|| QuizgenError::Auth("User not found".to_string()))
    }

    /// Exchange a valid refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String> {
        let record = self.active_token(refresh_token, TokenKind::Refresh).await?;
        self.issue(record.user_id, TokenKind::Access).await
    }

    /// Blacklist a refresh token. Unknown tokens are ignored.
    pub async fn logout(&self, refresh_token: &str) -> Result<()> {
        if !self
            .store
            .revoke_token(&token_digest(refresh_token), Utc::now())
            .await?
        {
            warn!("Logout with unknown or already revoked refresh token");
        }
        Ok(())
    }

    async fn issue(&self, user_id: i64, kind: TokenKind) -> Result<String> {
        let token = new_token();
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };

        self.store
            .insert_token(&TokenRecord {
                token_hash: token_digest(&token),
                user_id,
                kind,
                issued_at: now,
                expires_at: now + ttl,
                revoked_at: None,
            })
            .await?;

        Ok(token)
    }

    async fn active_token(&self, token: &str, kind: TokenKind) -> Result<TokenRecord> {
        let record = self
            .store
            .find_token(&token_digest(token))
            .await?
            .filter(|r| r.kind == kind && r.is_active(Utc::now()))
            .ok_or_else(|| QuizgenError::Auth("Token is invalid or expired".to_string()))?;
        Ok(record)
    }
}

fn new_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

fn token_digest(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;

    fn service() -> AuthService {
        service_with(AuthSettings::default())
    }

    fn service_with(settings: AuthSettings) -> AuthService {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        AuthService::new(store, &settings)
    }

    fn registration(username: &str, email: &str) -> Registration {
        Registration {
            username: username.to_string(),
            email: email.to_string(),
            password: "testpass123".to_string(),
            confirmed_password: "testpass123".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_login_authenticate() {
        let auth = service();
        let user = auth.register(&registration("alice", "alice@example.com")).await.unwrap();

        let session = auth.login("alice", "testpass123").await.unwrap();
        assert_eq!(session.user.id, user.id);
        assert_ne!(session.access, session.refresh);

        let resolved = auth.authenticate(&session.access).await.unwrap();
        assert_eq!(resolved.username, "alice");

        // A refresh token is not an access token.
        assert!(auth.authenticate(&session.refresh).await.is_err());
    }

    #[tokio::test]
    async fn test_register_field_errors() {
        let auth = service();
        auth.register(&registration("alice", "alice@example.com")).await.unwrap();

        let mut dup = registration("alice", "alice@example.com");
        dup.confirmed_password = "different".to_string();

        match auth.register(&dup).await {
            Err(RegisterError::Invalid(errors)) => {
                assert_eq!(errors["email"], vec!["Email is already in use."]);
                assert_eq!(errors["confirmed_password"], vec!["Passwords do not match."]);
                assert!(errors.contains_key("username"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let auth = service();
        auth.register(&registration("bob", "bob@example.com")).await.unwrap();

        assert!(matches!(
            auth.login("bob", "wrong").await,
            Err(QuizgenError::Auth(_))
        ));
        assert!(auth.login("nobody", "testpass123").await.is_err());
    }

    #[tokio::test]
    async fn test_refresh_and_logout_blacklists() {
        let auth = service();
        auth.register(&registration("carol", "carol@example.com")).await.unwrap();
        let session = auth.login("carol", "testpass123").await.unwrap();

        let access = auth.refresh(&session.refresh).await.unwrap();
        assert!(auth.authenticate(&access).await.is_ok());

        auth.logout(&session.refresh).await.unwrap();
        assert!(auth.refresh(&session.refresh).await.is_err());
    }

    #[tokio::test]
    async fn test_expired_access_token_rejected() {
        let auth = service_with(AuthSettings {
            access_token_ttl_seconds: 0,
            ..AuthSettings::default()
        });
        auth.register(&registration("dave", "dave@example.com")).await.unwrap();
        let session = auth.login("dave", "testpass123").await.unwrap();

        assert!(auth.authenticate(&session.access).await.is_err());
    }

    #[test]
    fn test_email_shape() {
        assert!(looks_like_email("a@b.co"));
        assert!(!looks_like_email("ab.co"));
        assert!(!looks_like_email("@b.co"));
        assert!(!looks_like_email("a@localhost"));
    }
}
