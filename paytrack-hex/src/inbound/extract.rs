//! Request extractors that answer with the JSON error envelope.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Query, Request, rejection::JsonRejection},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use paytrack_types::AppError;

use super::response::ApiError;

/// `Json<T>` whose rejection is a 400 "Invalid request format".
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::debug!("Rejected request body: {}", rejection.body_text());
                Err(AppError::BadRequest("Invalid request format".into()).into())
            }
        }
    }
}

/// `Query<T>` whose rejection is a 400 "Invalid query parameters".
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::debug!("Rejected query string: {}", rejection.body_text());
                Err(AppError::BadRequest("Invalid query parameters".into()).into())
            }
        }
    }
}
