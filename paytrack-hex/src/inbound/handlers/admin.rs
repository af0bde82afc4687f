//! Admin-only endpoints under `/api/admin`.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use paytrack_types::{ApiResponse, AppError, Repository, UserId};

use super::AppState;
use crate::inbound::response::ApiError;
use crate::inbound::session::CurrentUser;

/// Look up any user's profile.
#[tracing::instrument(skip(state), fields(admin_id = %admin.id))]
pub async fn get_user<R: Repository>(
    State(state): State<Arc<AppState<R>>>,
    admin: CurrentUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id: UserId = id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid user ID".into()))?;

    let user = state.auth.get_user(user_id).await?;
    Ok(Json(ApiResponse::ok("User retrieved successfully", user)))
}
