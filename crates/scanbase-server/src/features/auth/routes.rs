//! Authentication API routes
//!
//! - `POST /api/v1/auth/login` - Exchange credentials for a bearer token
//! - `POST /api/v1/auth/logout` - Revoke the presented token
//! - `GET  /api/v1/auth/me` - Resolve the presented token to its user

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    http::HeaderMap,
    middleware::Next,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::response::{ApiResponse, ApiResult, AppError};
use crate::features::FeatureState;

pub fn auth_routes() -> Router<FeatureState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

/// Pull the bearer token out of the Authorization header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Middleware guarding the record routes: a valid bearer token or 401.
pub async fn require_auth(
    State(state): State<FeatureState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;
    state
        .sessions
        .resolve(token)
        .ok_or_else(|| AppError::Unauthorized("invalid or expired token".to_string()))?;
    Ok(next.run(request).await)
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    token: String,
    username: String,
}

#[tracing::instrument(skip(state, request), fields(username = %request.username))]
async fn login(
    State(state): State<FeatureState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<ApiResponse<LoginResponse>> {
    let valid = state
        .directory
        .authenticate(&request.username, &request.password)
        .await
        .map_err(|err| AppError::InternalError(err.to_string()))?;

    if !valid {
        tracing::warn!("login rejected");
        return Err(AppError::Unauthorized("invalid credentials".to_string()));
    }

    let token = state.sessions.issue(&request.username);
    tracing::info!("login accepted");
    Ok(ApiResponse::success(LoginResponse {
        token,
        username: request.username,
    }))
}

#[derive(Debug, Serialize)]
struct LogoutResponse {
    revoked: bool,
}

async fn logout(
    State(state): State<FeatureState>,
    headers: HeaderMap,
) -> ApiResult<ApiResponse<LogoutResponse>> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;
    let revoked = state.sessions.revoke(token);
    Ok(ApiResponse::success(LogoutResponse { revoked }))
}

#[derive(Debug, Serialize)]
struct MeResponse {
    username: String,
}

async fn me(
    State(state): State<FeatureState>,
    headers: HeaderMap,
) -> ApiResult<ApiResponse<MeResponse>> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;
    let session = state
        .sessions
        .resolve(token)
        .ok_or_else(|| AppError::Unauthorized("invalid or expired token".to_string()))?;
    Ok(ApiResponse::success(MeResponse {
        username: session.username,
    }))
}
