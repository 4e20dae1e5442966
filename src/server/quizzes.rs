//! Quiz endpoints.

use super::error::ApiError;
use super::json::ApiJson;
use super::session::CurrentUser;
use super::AppState;
use crate::orchestrator::PipelineError;
use crate::store::Quiz;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

#[derive(Deserialize)]
pub struct CreateQuizRequest {
    #[serde(default)]
    url: Value,
}

/// Run the pipeline for the caller and return the persisted quiz.
///
/// The pipeline runs on its own task, so a client that disconnects mid-run
/// does not cancel the download, transcription or generation in flight.
pub async fn create_quiz(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ApiJson(req): ApiJson<CreateQuizRequest>,
) -> Result<(StatusCode, Json<Quiz>), ApiError> {
    let url = match req.url {
        Value::String(url) if !url.trim().is_empty() => url.trim().to_string(),
        Value::Null | Value::String(_) => {
            return Err(ApiError::field("url", "This field is required."))
        }
        _ => return Err(ApiError::field("url", "Not a valid string.")),
    };

    let pipeline = {
        let state = state.clone();
        tokio::spawn(async move { state.orchestrator.create_quiz(user.id, &url).await })
    };

    let quiz = pipeline.await.map_err(|e| {
        warn!("Pipeline task did not complete: {}", e);
        PipelineError::UnexpectedFailure(e.to_string())
    })??;

    Ok((StatusCode::CREATED, Json(quiz)))
}

pub async fn list_quizzes(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Quiz>>, ApiError> {
    Ok(Json(state.quizzes.list_quizzes(user.id).await?))
}

pub async fn get_quiz(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(quiz_id): Path<i64>,
) -> Result<Json<Quiz>, ApiError> {
    state
        .quizzes
        .get_quiz(user.id, quiz_id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}
