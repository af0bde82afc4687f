//! Data Transfer Objects (DTOs) for requests and responses.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::domain::query::DEFAULT_PAGE_SIZE;
use crate::domain::{
    Amount, NewPayment, PageRequest, PaymentChanges, PaymentFilter, PaymentRecord, PaymentStatus,
    User, UserId,
};
use crate::error::{AppError, FieldError};

// ─────────────────────────────────────────────────────────────────────────────
// Response envelope
// ─────────────────────────────────────────────────────────────────────────────

/// Success envelope wrapping every JSON response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Success envelope without a payload.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}

/// Failure envelope.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    #[schema(example = "Validation failed")]
    pub error: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldError>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            details: Vec::new(),
        }
    }

    pub fn with_details(error: impl Into<String>, details: Vec<FieldError>) -> Self {
        Self {
            success: false,
            error: error.into(),
            details,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to create an account.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[validate(length(min = 6, message = "Value is too short (minimum 6 characters)"))]
    #[schema(example = "s3cret-pass")]
    pub password: String,
    #[validate(length(
        min = 2,
        max = 100,
        message = "Value must be between 2 and 100 characters"
    ))]
    #[schema(example = "Alice Doe")]
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[validate(length(min = 1, message = "This field is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "This field is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "alice@example.com")]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "This field is required"))]
    pub token: String,
    #[validate(length(min = 6, message = "Value is too short (minimum 6 characters)"))]
    pub new_password: String,
}

/// Tokens issued by register, login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    /// Signed access token for the `Authorization: Bearer` header
    pub token: String,
    /// Opaque token for `/auth/refresh`
    pub refresh_token: String,
    /// Access token lifetime in seconds
    #[schema(example = 3600)]
    pub expires_in: i64,
    pub user: User,
}

// ─────────────────────────────────────────────────────────────────────────────
// Payment DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to record a payment. New payments always start as `pending`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePaymentRequest {
    #[schema(value_type = f64, example = 49.99)]
    pub amount: Decimal,
    pub category_id: Uuid,
    pub payment_method_id: Uuid,
    #[serde(default)]
    #[validate(length(max = 500, message = "Value is too long (maximum 500 characters)"))]
    pub description: String,
    /// RFC 3339 timestamp
    #[schema(example = "2024-06-01T10:30:00Z")]
    pub transaction_date: String,
}

impl CreatePaymentRequest {
    /// Validates the request and converts it into an insert for `user_id`.
    pub fn into_new_payment(self, user_id: UserId) -> Result<NewPayment, AppError> {
        let mut errors = validation_details(&self);
        let amount = parse_amount(self.amount, &mut errors);
        let transaction_date = parse_timestamp("transaction_date", &self.transaction_date, &mut errors);

        match (amount, transaction_date) {
            (Some(amount), Some(transaction_date)) if errors.is_empty() => Ok(NewPayment {
                user_id,
                amount,
                category_id: self.category_id,
                payment_method_id: self.payment_method_id,
                description: self.description,
                transaction_date,
            }),
            _ => Err(validation_failed(errors)),
        }
    }
}

/// Full replacement of a payment; status is caller-controlled.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdatePaymentRequest {
    #[schema(value_type = f64, example = 49.99)]
    pub amount: Decimal,
    #[schema(example = "completed")]
    pub status: String,
    pub category_id: Uuid,
    pub payment_method_id: Uuid,
    #[serde(default)]
    #[validate(length(max = 500, message = "Value is too long (maximum 500 characters)"))]
    pub description: String,
    #[schema(example = "2024-06-01T10:30:00Z")]
    pub transaction_date: String,
}

impl UpdatePaymentRequest {
    pub fn into_changes(self) -> Result<PaymentChanges, AppError> {
        let mut errors = validation_details(&self);
        let amount = parse_amount(self.amount, &mut errors);
        let status = parse_status(&self.status, &mut errors);
        let transaction_date = parse_timestamp("transaction_date", &self.transaction_date, &mut errors);

        match (amount, status, transaction_date) {
            (Some(amount), Some(status), Some(transaction_date)) if errors.is_empty() => {
                Ok(PaymentChanges {
                    amount,
                    status,
                    category_id: self.category_id,
                    payment_method_id: self.payment_method_id,
                    description: self.description,
                    transaction_date,
                })
            }
            _ => Err(validation_failed(errors)),
        }
    }
}

/// Raw list/export query string. Everything arrives as text so malformed
/// values can be reported per field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PaymentListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub min_amount: Option<String>,
    pub max_amount: Option<String>,
    /// `YYYY-MM-DD`
    pub start_date: Option<String>,
    /// `YYYY-MM-DD`, inclusive of the whole day
    pub end_date: Option<String>,
}

impl PaymentListQuery {
    /// Parses the filter and page. Empty parameters count as absent.
    pub fn parse(&self) -> Result<(PaymentFilter, PageRequest), AppError> {
        let mut errors = Vec::new();
        let mut filter = PaymentFilter::default();

        let page = parse_number("page", present(&self.page), &mut errors).unwrap_or(1);
        let limit = parse_number("limit", present(&self.limit), &mut errors)
            .unwrap_or(DEFAULT_PAGE_SIZE);

        if let Some(status) = present(&self.status) {
            filter.status = parse_status(status, &mut errors);
        }
        if let Some(search) = present(&self.search) {
            filter.search = Some(search.to_string());
        }
        filter.min_amount = parse_bound("min_amount", present(&self.min_amount), &mut errors);
        filter.max_amount = parse_bound("max_amount", present(&self.max_amount), &mut errors);

        if let Some(date) = parse_date("start_date", present(&self.start_date), &mut errors) {
            filter = filter.starting_on(date);
        }
        if let Some(date) = parse_date("end_date", present(&self.end_date), &mut errors) {
            filter = filter.ending_on(date);
        }

        if errors.is_empty() {
            Ok((filter, PageRequest::new(page, limit)))
        } else {
            Err(validation_failed(errors))
        }
    }
}

/// One page of payments plus the total matching count.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentPage {
    pub payments: Vec<PaymentRecord>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

/// Query for the monthly chart.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ChartQuery {
    /// Defaults to the current year
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

fn validation_details(value: &impl Validate) -> Vec<FieldError> {
    match value.validate() {
        Ok(()) => Vec::new(),
        Err(errors) => match AppError::from(errors) {
            AppError::Validation(details) => details,
            _ => Vec::new(),
        },
    }
}

fn validation_failed(mut errors: Vec<FieldError>) -> AppError {
    errors.sort_by(|a, b| a.field.cmp(&b.field));
    AppError::Validation(errors)
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_amount(value: Decimal, errors: &mut Vec<FieldError>) -> Option<Amount> {
    Amount::positive(value)
        .map_err(|e| errors.push(FieldError::new("amount", e.to_string())))
        .ok()
}

fn parse_status(value: &str, errors: &mut Vec<FieldError>) -> Option<PaymentStatus> {
    value
        .parse::<PaymentStatus>()
        .map_err(|e| errors.push(FieldError::new("status", e.to_string())))
        .ok()
}

fn parse_timestamp(
    field: &str,
    value: &str,
    errors: &mut Vec<FieldError>,
) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            errors.push(FieldError::new(
                field,
                "Invalid date format (expected RFC 3339)",
            ))
        })
        .ok()
}

fn parse_date(field: &str, value: Option<&str>, errors: &mut Vec<FieldError>) -> Option<NaiveDate> {
    let value = value?;
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| errors.push(FieldError::new(field, "Invalid date format (expected YYYY-MM-DD)")))
        .ok()
}

fn parse_number(field: &str, value: Option<&str>, errors: &mut Vec<FieldError>) -> Option<u32> {
    let value = value?;
    value
        .parse::<i64>()
        .map(|n| u32::try_from(n.max(0)).unwrap_or(u32::MAX))
        .map_err(|_| errors.push(FieldError::new(field, "Value must be an integer")))
        .ok()
}

fn parse_bound(field: &str, value: Option<&str>, errors: &mut Vec<FieldError>) -> Option<Amount> {
    let value = value?;
    value
        .parse::<Decimal>()
        .map_err(|_| FieldError::new(field, "Value must be a number"))
        .and_then(|d| Amount::from_decimal(d).map_err(|e| FieldError::new(field, e.to_string())))
        .map_err(|e| errors.push(e))
        .ok()
}
