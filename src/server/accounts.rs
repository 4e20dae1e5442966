//! Registration, login, token refresh and logout endpoints.

use super::error::ApiError;
use super::json::ApiJson;
use super::session::{clear_cookie, cookie, set_cookie, CurrentUser, ACCESS_COOKIE, REFRESH_COOKIE};
use super::AppState;
use crate::auth::{RegisterError, Registration};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<Registration>,
) -> Result<impl IntoResponse, ApiError> {
    match state.auth.register(&req).await {
        Ok(_) => Ok((
            StatusCode::CREATED,
            Json(json!({ "detail": "User created successfully." })),
        )),
        Err(RegisterError::Invalid(errors)) => Err(ApiError::Fields(errors)),
        Err(RegisterError::Storage(e)) => Err(e.into()),
    }
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.auth.login(&req.username, &req.password).await?;
    let cookies = &state.settings.auth;

    Ok((
        AppendHeaders([
            (
                header::SET_COOKIE,
                set_cookie(
                    ACCESS_COOKIE,
                    &session.access,
                    cookies.access_token_ttl_seconds,
                    cookies.secure_cookies,
                ),
            ),
            (
                header::SET_COOKIE,
                set_cookie(
                    REFRESH_COOKIE,
                    &session.refresh,
                    cookies.refresh_token_ttl_seconds,
                    cookies.secure_cookies,
                ),
            ),
        ]),
        Json(json!({
            "detail": "Login successfully!",
            "user": {
                "id": session.user.id,
                "username": session.user.username,
                "email": session.user.email,
            }
        })),
    ))
}

pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let refresh = cookie(&headers, REFRESH_COOKIE)
        .ok_or_else(|| ApiError::BadRequest("Refresh token not found.".to_string()))?;

    let access = state
        .auth
        .refresh(&refresh)
        .await
        .map_err(|_| ApiError::Unauthorized("Invalid refresh token!".to_string()))?;

    let cookies = &state.settings.auth;
    Ok((
        AppendHeaders([(
            header::SET_COOKIE,
            set_cookie(
                ACCESS_COOKIE,
                &access,
                cookies.access_token_ttl_seconds,
                cookies.secure_cookies,
            ),
        )]),
        Json(json!({ "detail": "Token refreshed" })),
    ))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(refresh) = cookie(&headers, REFRESH_COOKIE) {
        state.auth.logout(&refresh).await?;
    }
    info!("User {} logged out", user.id);

    let secure = state.settings.auth.secure_cookies;
    Ok((
        AppendHeaders([
            (header::SET_COOKIE, clear_cookie(ACCESS_COOKIE, secure)),
            (header::SET_COOKIE, clear_cookie(REFRESH_COOKIE, secure)),
        ]),
        Json(json!({
            "detail": "Log-Out successfully! All Tokens will be deleted. Refresh token is now invalid."
        })),
    ))
}
