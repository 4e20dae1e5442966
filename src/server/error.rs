//! HTTP error responses.

use crate::auth::FieldErrors;
use crate::error::QuizgenError;
use crate::orchestrator::PipelineError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

pub const NOT_AUTHENTICATED: &str = "Authentication credentials were not provided.";

/// Error returned by a handler, rendered as a JSON body.
#[derive(Debug)]
pub enum ApiError {
    /// 400 with per-field messages.
    Fields(FieldErrors),
    /// 400 with a `detail` message.
    BadRequest(String),
    /// 401 with a `detail` message.
    Unauthorized(String),
    NotFound,
    /// 500; the message is included in `detail`.
    Internal(String),
}

impl ApiError {
    pub fn not_authenticated() -> Self {
        ApiError::Unauthorized(NOT_AUTHENTICATED.to_string())
    }

    pub fn field(field: &str, message: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.to_string()]);
        ApiError::Fields(errors)
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InvalidUrl(_) => ApiError::field("url", &err.to_string()),
            PipelineError::UnexpectedFailure(cause) => ApiError::Internal(cause),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<QuizgenError> for ApiError {
    fn from(err: QuizgenError) -> Self {
        match err {
            QuizgenError::Auth(msg) => ApiError::Unauthorized(msg),
            QuizgenError::NotFound(_) => ApiError::NotFound,
            QuizgenError::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Fields(errors) => (StatusCode::BAD_REQUEST, Json(json!(errors))).into_response(),
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "detail": detail }))).into_response()
            }
            ApiError::Unauthorized(detail) => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "detail": detail }))).into_response()
            }
            ApiError::NotFound => {
                (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not found." }))).into_response()
            }
            ApiError::Internal(cause) => {
                error!("Internal server error: {}", cause);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "detail": format!("Internal server error: {}", cause) })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_is_field_error() {
        let err = ApiError::from(PipelineError::InvalidUrl(
            "Please provide a valid YouTube video URL.".into(),
        ));
        match err {
            ApiError::Fields(errors) => assert_eq!(
                errors["url"],
                vec!["Invalid YouTube URL. Please provide a valid YouTube video URL."]
            ),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_stage_failure_is_bad_request() {
        let err = ApiError::from(PipelineError::DownloadFailed("no formats".into()));
        assert!(matches!(err, ApiError::BadRequest(ref d) if d == "YouTube download failed: no formats"));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_unexpected_is_internal() {
        let err = ApiError::from(PipelineError::UnexpectedFailure("disk full".into()));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
