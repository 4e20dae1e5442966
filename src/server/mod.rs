//! HTTP API for quizgen.
//!
//! JSON endpoints under `/api` for accounts and quizzes, plus `/health`.
//! Sessions travel in HttpOnly `access`/`refresh` cookies; an
//! `Authorization: Bearer` header is accepted in place of the access cookie.

mod accounts;
mod error;
mod json;
mod quizzes;
mod session;

pub use error::ApiError;
pub use json::ApiJson;
pub use session::CurrentUser;

use crate::auth::AuthService;
use crate::config::Settings;
use crate::error::Result;
use crate::orchestrator::Orchestrator;
use crate::store::{QuizStore, SqliteStore};
use axum::{
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Shared application state.
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub quizzes: Arc<dyn QuizStore>,
    pub auth: AuthService,
    pub settings: Settings,
}

impl AppState {
    /// Open the database and build the production pipeline.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let db_path = settings.database_path();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let store = Arc::new(SqliteStore::new(&db_path)?);
        info!("Using database at {:?}", db_path);

        Ok(Self {
            orchestrator: Orchestrator::new(&settings, store.clone())?,
            quizzes: store.clone(),
            auth: AuthService::new(store, &settings.auth),
            settings,
        })
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/register", post(accounts::register))
        .route("/login", post(accounts::login))
        .route("/logout", post(accounts::logout))
        .route("/token/refresh", post(accounts::refresh_token))
        .route(
            "/quizzes",
            post(quizzes::create_quiz).get(quizzes::list_quizzes),
        )
        .route("/quizzes/{quiz_id}", get(quizzes::get_quiz));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(cors)
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioFetcher, DownloadError, TempAudio};
    use crate::generation::{GenerationError, QuestionDraft, QuizDraft, QuizGenerator};
    use crate::transcription::{TranscriptionError, Transcriber};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use std::path::PathBuf;
    use tower::ServiceExt;

    struct DirFetcher {
        dir: PathBuf,
    }

    #[async_trait]
    impl AudioFetcher for DirFetcher {
        async fn fetch(&self, url: &str) -> std::result::Result<TempAudio, DownloadError> {
            if url.contains("unavailable") {
                return Err(DownloadError::Failed("ERROR: Video unavailable".into()));
            }
            if url.contains("slow") {
                tokio::time::sleep(std::time::Duration::from_millis(300)).await;
            }
            let path = self.dir.join(format!("{}.webm", uuid::Uuid::new_v4().simple()));
            std::fs::write(&path, b"audio").map_err(DownloadError::Scratch)?;
            Ok(TempAudio::new(path))
        }
    }

    struct FixedTranscriber;

    #[async_trait]
    impl Transcriber for FixedTranscriber {
        async fn transcribe(
            &self,
            _audio: &TempAudio,
        ) -> std::result::Result<String, TranscriptionError> {
            Ok("A lecture about the borrow checker.".to_string())
        }
    }

    struct FixedGenerator;

    #[async_trait]
    impl QuizGenerator for FixedGenerator {
        async fn generate(&self, _transcript: &str) -> std::result::Result<QuizDraft, GenerationError> {
            Ok(QuizDraft {
                title: "Borrowing".to_string(),
                description: "Shared and mutable references.".to_string(),
                questions: (1..=10)
                    .map(|n| QuestionDraft {
                        question_title: format!("Question {}?", n),
                        options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                        answer: "B".to_string(),
                    })
                    .collect(),
            })
        }
    }

    struct TestApp {
        _scratch: tempfile::TempDir,
        store: Arc<SqliteStore>,
        router: Router,
    }

    fn app() -> TestApp {
        let scratch = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let mut settings = Settings::default();
        settings.auth.secure_cookies = false;

        let orchestrator = Orchestrator::with_components(
            Arc::new(DirFetcher {
                dir: scratch.path().to_path_buf(),
            }),
            Arc::new(FixedTranscriber),
            Arc::new(FixedGenerator),
            store.clone(),
        );

        let state = Arc::new(AppState {
            orchestrator,
            quizzes: store.clone(),
            auth: AuthService::new(store.clone(), &settings.auth),
            settings,
        });

        TestApp {
            _scratch: scratch,
            store,
            router: router(state),
        }
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<String>, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or_default().to_string())
            .collect();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, cookies, body)
    }

    fn post_json(uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_with(uri: &str, cookie: &str) -> Request<Body> {
        Request::get(uri)
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    /// Register and log in, returning the `Cookie` header value.
    async fn login(router: &Router, username: &str) -> String {
        let (status, _, _) = send(
            router,
            post_json(
                "/api/register",
                json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": "testpass123",
                    "confirmed_password": "testpass123"
                }),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, cookies, body) = send(
            router,
            post_json(
                "/api/login",
                json!({ "username": username, "password": "testpass123" }),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["detail"], "Login successfully!");
        assert_eq!(body["user"]["username"], username);
        assert_eq!(cookies.len(), 2);

        cookies.join("; ")
    }

    #[test]
    fn test_health() {
        let app = app();
        tokio_test::block_on(async {
            let request = Request::get("/health").body(Body::empty()).unwrap();
            let (status, _, body) = send(&app.router, request).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({ "status": "ok" }));
        });
    }

    #[tokio::test]
    async fn test_quizzes_require_authentication() {
        let app = app();

        let (status, _, body) = send(
            &app.router,
            post_json("/api/quizzes", json!({ "url": "https://youtu.be/abc" }), None),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "Authentication credentials were not provided.");
    }

    #[tokio::test]
    async fn test_create_list_and_get_quiz() {
        let app = app();
        let cookie = login(&app.router, "alice").await;

        let (status, _, quiz) = send(
            &app.router,
            post_json(
                "/api/quizzes",
                json!({ "url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ" }),
                Some(&cookie),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(quiz["title"], "Borrowing");
        assert_eq!(quiz["questions"].as_array().unwrap().len(), 10);
        assert_eq!(quiz["questions"][0]["question_options"][1], "B");
        assert!(quiz.get("owner_id").is_none());

        let (status, _, list) = send(&app.router, get_with("/api/quizzes", &cookie)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);

        let id = quiz["id"].as_i64().unwrap();
        let (status, _, fetched) =
            send(&app.router, get_with(&format!("/api/quizzes/{}", id), &cookie)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["video_url"], "https://www.youtube.com/watch?v=dQw4w9WgXcQ");

        // Another user cannot see it.
        let other = login(&app.router, "bob").await;
        let (status, _, _) =
            send(&app.router, get_with(&format!("/api/quizzes/{}", id), &other)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (_, _, list) = send(&app.router, get_with("/api/quizzes", &other)).await;
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn test_invalid_url_is_field_error() {
        let app = app();
        let cookie = login(&app.router, "alice").await;

        let (status, _, body) = send(
            &app.router,
            post_json("/api/quizzes", json!({ "url": "https://invalid-url.com" }), Some(&cookie)),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({ "url": ["Invalid YouTube URL. Please provide a valid YouTube video URL."] })
        );
    }

    #[tokio::test]
    async fn test_non_string_url_is_field_error() {
        let app = app();
        let cookie = login(&app.router, "alice").await;

        let (status, _, body) = send(
            &app.router,
            post_json("/api/quizzes", json!({ "url": 123 }), Some(&cookie)),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "url": ["Not a valid string."] }));

        let (status, _, body) =
            send(&app.router, post_json("/api/quizzes", json!({}), Some(&cookie))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "url": ["This field is required."] }));
    }

    #[tokio::test]
    async fn test_malformed_body_is_json_bad_request() {
        let app = app();
        let cookie = login(&app.router, "alice").await;

        // No content type
        let request = Request::post("/api/quizzes")
            .header(header::COOKIE, cookie.as_str())
            .body(Body::from(r#"{"url":"https://youtu.be/abc"}"#))
            .unwrap();
        let (status, _, body) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());

        // Not JSON at all
        let request = Request::post("/api/quizzes")
            .header(header::COOKIE, cookie.as_str())
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("url=https://youtu.be/abc"))
            .unwrap();
        let (status, _, body) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());

        // Wrong types on the account endpoints
        let (status, _, body) = send(
            &app.router,
            post_json("/api/login", json!({ "username": ["alice"], "password": 1 }), None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());

        let request = Request::post("/api/register")
            .body(Body::from("username=frank"))
            .unwrap();
        let (status, _, body) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn test_dropped_request_still_persists_quiz() {
        let app = app();
        let cookie = login(&app.router, "alice").await;

        let request = post_json(
            "/api/quizzes",
            json!({ "url": "https://www.youtube.com/watch?v=slowvideo01" }),
            Some(&cookie),
        );
        let dropped = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            app.router.clone().oneshot(request),
        )
        .await;
        assert!(dropped.is_err());

        tokio::time::sleep(std::time::Duration::from_millis(800)).await;
        assert_eq!(app.store.counts().unwrap(), (1, 10));
        assert_eq!(std::fs::read_dir(app._scratch.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_stage_failure_is_detail_error() {
        let app = app();
        let cookie = login(&app.router, "alice").await;

        let (status, _, body) = send(
            &app.router,
            post_json(
                "/api/quizzes",
                json!({ "url": "https://youtu.be/unavailable" }),
                Some(&cookie),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"]
            .as_str()
            .unwrap()
            .starts_with("YouTube download failed"));
    }

    #[tokio::test]
    async fn test_refresh_and_logout() {
        let app = app();

        let (status, _, body) = send(&app.router, post_json("/api/token/refresh", json!({}), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Refresh token not found.");

        let cookie = login(&app.router, "carol").await;
        let (status, cookies, body) =
            send(&app.router, post_json("/api/token/refresh", json!({}), Some(&cookie))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["detail"], "Token refreshed");
        assert!(cookies[0].starts_with("access="));

        let (status, cookies, _) =
            send(&app.router, post_json("/api/logout", json!({}), Some(&cookie))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(cookies.contains(&"access=".to_string()));
        assert!(cookies.contains(&"refresh=".to_string()));

        let (status, _, body) =
            send(&app.router, post_json("/api/token/refresh", json!({}), Some(&cookie))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "Invalid refresh token!");
    }

    #[tokio::test]
    async fn test_register_validation_errors() {
        let app = app();

        let (status, _, body) = send(
            &app.router,
            post_json(
                "/api/register",
                json!({
                    "username": "dave",
                    "email": "dave@example.com",
                    "password": "testpass123",
                    "confirmed_password": "other"
                }),
                None,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["confirmed_password"][0], "Passwords do not match.");
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let app = app();
        login(&app.router, "erin").await;

        let (status, cookies, body) = send(
            &app.router,
            post_json("/api/login", json!({ "username": "erin", "password": "nope" }), None),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(cookies.is_empty());
        assert_eq!(body["detail"], "No active account found with the given credentials");
    }
}
