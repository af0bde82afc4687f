//! Dashboard aggregates under `/api/dashboard`.

use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};

use paytrack_types::{ApiResponse, ChartQuery, Repository};

use super::AppState;
use crate::inbound::extract::QueryParams;
use crate::inbound::response::ApiError;
use crate::inbound::session::CurrentUser;

#[tracing::instrument(skip(state), fields(user_id = %user.id))]
pub async fn stats<R: Repository>(
    State(state): State<Arc<AppState<R>>>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state.payments.statistics(user.id).await?;
    Ok(Json(ApiResponse::ok("Statistics retrieved successfully", stats)))
}

#[tracing::instrument(skip(state), fields(user_id = %user.id))]
pub async fn recent<R: Repository>(
    State(state): State<Arc<AppState<R>>>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let payments = state.payments.recent(user.id).await?;
    Ok(Json(ApiResponse::ok(
        "Recent payments retrieved successfully",
        payments,
    )))
}

#[tracing::instrument(skip(state, query), fields(user_id = %user.id, year = ?query.year))]
pub async fn chart<R: Repository>(
    State(state): State<Arc<AppState<R>>>,
    user: CurrentUser,
    QueryParams(query): QueryParams<ChartQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let months = state.payments.monthly(user.id, query.year).await?;
    Ok(Json(ApiResponse::ok("Chart data retrieved successfully", months)))
}
