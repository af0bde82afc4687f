//! Payment CRUD, listing and export under `/api/payments`.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};

use paytrack_types::{
    ApiResponse, AppError, CreatePaymentRequest, PaymentId, PaymentListQuery, Repository,
    UpdatePaymentRequest,
};

use super::AppState;
use crate::inbound::extract::{JsonBody, QueryParams};
use crate::inbound::response::ApiError;
use crate::inbound::session::CurrentUser;

fn parse_payment_id(id: &str) -> Result<PaymentId, ApiError> {
    id.parse()
        .map_err(|_| AppError::BadRequest("Invalid payment ID".into()).into())
}

#[tracing::instrument(skip(state, req), fields(user_id = %user.id))]
pub async fn create_payment<R: Repository>(
    State(state): State<Arc<AppState<R>>>,
    user: CurrentUser,
    JsonBody(req): JsonBody<CreatePaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.payments.create(user.id, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Payment created successfully", record)),
    ))
}

#[tracing::instrument(skip(state, query), fields(user_id = %user.id))]
pub async fn list_payments<R: Repository>(
    State(state): State<Arc<AppState<R>>>,
    user: CurrentUser,
    QueryParams(query): QueryParams<PaymentListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.payments.list(user.id, &query).await?;
    Ok(Json(ApiResponse::ok("Payments retrieved successfully", page)))
}

#[tracing::instrument(skip(state, query), fields(user_id = %user.id))]
pub async fn export_payments<R: Repository>(
    State(state): State<Arc<AppState<R>>>,
    user: CurrentUser,
    QueryParams(query): QueryParams<PaymentListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let csv = state.payments.export_csv(user.id, &query).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=payments.csv",
            ),
        ],
        csv,
    ))
}

#[tracing::instrument(skip(state), fields(user_id = %user.id))]
pub async fn get_payment<R: Repository>(
    State(state): State<Arc<AppState<R>>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_payment_id(&id)?;
    let record = state.payments.get(user.id, id).await?;
    Ok(Json(ApiResponse::ok("Payment retrieved successfully", record)))
}

#[tracing::instrument(skip(state, req), fields(user_id = %user.id))]
pub async fn update_payment<R: Repository>(
    State(state): State<Arc<AppState<R>>>,
    user: CurrentUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdatePaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_payment_id(&id)?;
    let record = state.payments.update(user.id, id, req).await?;
    Ok(Json(ApiResponse::ok("Payment updated successfully", record)))
}

#[tracing::instrument(skip(state), fields(user_id = %user.id))]
pub async fn delete_payment<R: Repository>(
    State(state): State<Arc<AppState<R>>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_payment_id(&id)?;
    state.payments.delete(user.id, id).await?;
    Ok(Json(ApiResponse::message("Payment deleted successfully")))
}
