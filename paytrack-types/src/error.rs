//! Error types for the payment tracking service.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Domain-level errors (business rule violations).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Amount cannot be negative")]
    NegativeAmount,

    #[error("Value must be greater than 0")]
    NonPositiveAmount,

    #[error("Amount is too large")]
    AmountOutOfRange,

    #[error("Value must be one of: pending, completed, failed, refunded")]
    InvalidStatus(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Authentication and session errors.
///
/// Display strings are the messages callers see; credential failures are
/// deliberately undifferentiated.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("email already registered")]
    EmailAlreadyRegistered,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid or expired token")]
    ExpiredToken,

    #[error("invalid refresh token")]
    InvalidRefreshToken,

    #[error("refresh token expired")]
    RefreshTokenExpired,

    #[error("invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("Authorization header required")]
    MissingAuthorization,

    #[error("Invalid authorization format")]
    InvalidAuthorizationFormat,

    #[error("Admin access required")]
    AdminRequired,

    #[error("Token signing failed: {0}")]
    TokenSigning(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Out-of-band notification failures.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Mail delivery failed: {0}")]
    Delivery(String),

    #[error("Mail queue is full")]
    QueueFull,

    #[error("Mail queue is closed")]
    QueueClosed,
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    #[schema(example = "email")]
    pub field: String,
    #[schema(example = "Invalid email format")]
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Application-level errors (for HTTP responses).
///
/// Maps cleanly to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Shorthand for a validation error on one field.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation(vec![FieldError::new(field, message)])
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(DomainError::ValidationError(msg)) => AppError::BadRequest(msg),
            RepoError::Domain(e) => AppError::BadRequest(e.to_string()),
            RepoError::NotFound => AppError::NotFound("Resource not found".into()),
            RepoError::Database(e) => AppError::Internal(e),
            RepoError::Conflict(e) => AppError::Conflict(e),
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::EmailAlreadyRegistered => AppError::Conflict(err.to_string()),
            AuthError::InvalidOrExpiredToken => AppError::BadRequest(err.to_string()),
            AuthError::AdminRequired => AppError::Forbidden(err.to_string()),
            AuthError::TokenSigning(e) | AuthError::PasswordHash(e) => AppError::Internal(e),
            other => AppError::Unauthorized(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details = Vec::new();
        for (field, errs) in errors.field_errors() {
            for err in errs.iter() {
                let message = match &err.message {
                    Some(message) => message.to_string(),
                    None => default_message(&err.code).to_string(),
                };
                details.push(FieldError::new(field.to_string(), message));
            }
        }
        details.sort_by(|a, b| a.field.cmp(&b.field));
        AppError::Validation(details)
    }
}

fn default_message(code: &str) -> &'static str {
    match code {
        "required" => "This field is required",
        "email" => "Invalid email format",
        "length" => "Invalid length",
        _ => "Invalid value",
    }
}
