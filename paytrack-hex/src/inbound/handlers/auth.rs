//! Authentication endpoints under `/api/auth`.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use paytrack_types::{
    ApiResponse, ForgotPasswordRequest, LoginRequest, RefreshTokenRequest, RegisterRequest,
    Repository, ResetPasswordRequest,
};

use super::AppState;
use crate::inbound::extract::JsonBody;
use crate::inbound::response::ApiError;
use crate::inbound::session::CurrentUser;

#[tracing::instrument(skip_all)]
pub async fn register<R: Repository>(
    State(state): State<Arc<AppState<R>>>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.auth.register(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("User registered successfully", session)),
    ))
}

#[tracing::instrument(skip_all)]
pub async fn login<R: Repository>(
    State(state): State<Arc<AppState<R>>>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.auth.login(req).await?;
    Ok(Json(ApiResponse::ok("Login successful", session)))
}

#[tracing::instrument(skip_all)]
pub async fn refresh<R: Repository>(
    State(state): State<Arc<AppState<R>>>,
    JsonBody(req): JsonBody<RefreshTokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.auth.refresh(req).await?;
    Ok(Json(ApiResponse::ok("Token refreshed successfully", session)))
}

/// Always succeeds so callers cannot probe for registered emails.
#[tracing::instrument(skip_all)]
pub async fn forgot_password<R: Repository>(
    State(state): State<Arc<AppState<R>>>,
    JsonBody(req): JsonBody<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.auth.forgot_password(req).await?;
    Ok(Json(ApiResponse::message(
        "If your email is registered, you will receive a password reset link",
    )))
}

#[tracing::instrument(skip_all)]
pub async fn reset_password<R: Repository>(
    State(state): State<Arc<AppState<R>>>,
    JsonBody(req): JsonBody<ResetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.auth.reset_password(req).await?;
    Ok(Json(ApiResponse::message("Password reset successfully")))
}

#[tracing::instrument(skip(state))]
pub async fn me<R: Repository>(
    State(state): State<Arc<AppState<R>>>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state.auth.me(user.id).await?;
    Ok(Json(ApiResponse::ok("User retrieved successfully", profile)))
}

#[tracing::instrument(skip(state))]
pub async fn logout<R: Repository>(
    State(state): State<Arc<AppState<R>>>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    state.auth.logout(user.id).await?;
    Ok(Json(ApiResponse::message("Logged out successfully")))
}
