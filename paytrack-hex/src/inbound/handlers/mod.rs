//! HTTP request handlers.

use axum::{Json, response::IntoResponse};
use utoipa::OpenApi;

use paytrack_types::{HealthResponse, Repository};

use crate::openapi::ApiDoc;
use crate::service::{AuthService, PaymentService};

pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod lookups;
pub mod payments;

/// Application state shared across handlers.
pub struct AppState<R: Repository> {
    pub auth: AuthService<R>,
    pub payments: PaymentService<R>,
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".into(),
    })
}

/// Serves the generated OpenAPI document.
pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
