//! Reference data: categories and payment methods.

use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};

use paytrack_types::{ApiResponse, Repository};

use super::AppState;
use crate::inbound::response::ApiError;

#[tracing::instrument(skip(state))]
pub async fn categories<R: Repository>(
    State(state): State<Arc<AppState<R>>>,
) -> Result<impl IntoResponse, ApiError> {
    let categories = state.payments.categories().await?;
    Ok(Json(ApiResponse::ok(
        "Categories retrieved successfully",
        categories,
    )))
}

#[tracing::instrument(skip(state))]
pub async fn payment_methods<R: Repository>(
    State(state): State<Arc<AppState<R>>>,
) -> Result<impl IntoResponse, ApiError> {
    let methods = state.payments.payment_methods().await?;
    Ok(Json(ApiResponse::ok(
        "Payment methods retrieved successfully",
        methods,
    )))
}
