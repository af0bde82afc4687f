//! Error envelope for HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use paytrack_types::{AppError, AuthError, ErrorResponse};

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self.0 {
            AppError::Validation(details) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::with_details("Validation failed", details),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorResponse::new(msg)),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, ErrorResponse::new(msg)),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, ErrorResponse::new(msg)),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorResponse::new(msg)),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorResponse::new(msg)),
            AppError::TooManyRequests(msg) => {
                (StatusCode::TOO_MANY_REQUESTS, ErrorResponse::new(msg))
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Internal server error"),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
