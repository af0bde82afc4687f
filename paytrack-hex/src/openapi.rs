//! OpenAPI specification and documentation.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use paytrack_types::domain::{
    Category, MonthlyTotal, Payment, PaymentId, PaymentMethod, PaymentRecord, PaymentStatistics,
    PaymentStatus, Role, User, UserId, UserSummary,
};
use paytrack_types::dto::{
    AuthResponse, CreatePaymentRequest, ErrorResponse, ForgotPasswordRequest, HealthResponse,
    LoginRequest, PaymentPage, RefreshTokenRequest, RegisterRequest, ResetPasswordRequest,
    UpdatePaymentRequest,
};
use paytrack_types::FieldError;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};

// Dummy functions to generate path documentation
// These are not the actual handlers, just for OpenAPI path generation

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
async fn health() {}

/// Register a new account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered, session issued", body = AuthResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    )
)]
async fn register() {}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = AuthResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse)
    )
)]
async fn login() {}

/// Exchange a refresh token for a new access token
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "auth",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New access token", body = AuthResponse),
        (status = 401, description = "Unknown or expired refresh token", body = ErrorResponse)
    )
)]
async fn refresh() {}

/// Request a password reset link
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    tag = "auth",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Accepted whether or not the email is registered")
    )
)]
async fn forgot_password() {}

/// Set a new password with a reset token
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    tag = "auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Invalid or expired token", body = ErrorResponse)
    )
)]
async fn reset_password() {}

/// Current user profile
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Authenticated user", body = User),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
async fn me() {}

/// Revoke every refresh token of the current user
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Logged out"),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
async fn logout() {}

/// List categories
#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "reference",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All categories by name", body = Vec<Category>)
    )
)]
async fn list_categories() {}

/// List active payment methods
#[utoipa::path(
    get,
    path = "/api/payment-methods",
    tag = "reference",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active payment methods by name", body = Vec<PaymentMethod>)
    )
)]
async fn list_payment_methods() {}

/// List payments with filters and pagination
#[utoipa::path(
    get,
    path = "/api/payments",
    tag = "payments",
    security(("bearer_auth" = [])),
    params(
        ("page" = Option<u32>, Query, description = "Page number, default 1"),
        ("limit" = Option<u32>, Query, description = "Page size, 1..=100, default 10"),
        ("status" = Option<PaymentStatus>, Query, description = "Exact status"),
        ("search" = Option<String>, Query, description = "Case-insensitive description substring"),
        ("min_amount" = Option<f64>, Query, description = "Inclusive lower amount bound"),
        ("max_amount" = Option<f64>, Query, description = "Inclusive upper amount bound"),
        ("start_date" = Option<String>, Query, description = "YYYY-MM-DD, inclusive"),
        ("end_date" = Option<String>, Query, description = "YYYY-MM-DD, inclusive of the whole day")
    ),
    responses(
        (status = 200, description = "One page of payments", body = PaymentPage),
        (status = 400, description = "Malformed filter", body = ErrorResponse)
    )
)]
async fn list_payments() {}

/// Record a payment
#[utoipa::path(
    post,
    path = "/api/payments",
    tag = "payments",
    security(("bearer_auth" = [])),
    request_body = CreatePaymentRequest,
    responses(
        (status = 201, description = "Payment created", body = PaymentRecord),
        (status = 400, description = "Validation failed", body = ErrorResponse)
    )
)]
async fn create_payment() {}

/// Export filtered payments as CSV
#[utoipa::path(
    get,
    path = "/api/payments/export",
    tag = "payments",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv", body = String)
    )
)]
async fn export_payments() {}

/// Get one payment
#[utoipa::path(
    get,
    path = "/api/payments/{id}",
    tag = "payments",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Payment ID (UUID)")),
    responses(
        (status = 200, description = "Payment with category, method and owner", body = PaymentRecord),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
async fn get_payment() {}

/// Replace a payment
#[utoipa::path(
    put,
    path = "/api/payments/{id}",
    tag = "payments",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Payment ID (UUID)")),
    request_body = UpdatePaymentRequest,
    responses(
        (status = 200, description = "Updated payment", body = PaymentRecord),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
async fn update_payment() {}

/// Delete a payment
#[utoipa::path(
    delete,
    path = "/api/payments/{id}",
    tag = "payments",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Payment ID (UUID)")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
async fn delete_payment() {}

/// Payment counts and completed total
#[utoipa::path(
    get,
    path = "/api/dashboard/stats",
    tag = "dashboard",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Statistics", body = PaymentStatistics)
    )
)]
async fn dashboard_stats() {}

/// Five most recent payments
#[utoipa::path(
    get,
    path = "/api/dashboard/recent",
    tag = "dashboard",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Recent payments", body = Vec<PaymentRecord>)
    )
)]
async fn dashboard_recent() {}

/// Completed totals per month
#[utoipa::path(
    get,
    path = "/api/dashboard/chart",
    tag = "dashboard",
    security(("bearer_auth" = [])),
    params(("year" = Option<i32>, Query, description = "Calendar year, default current")),
    responses(
        (status = 200, description = "Monthly totals", body = Vec<MonthlyTotal>)
    )
)]
async fn dashboard_chart() {}

/// Look up any user (admin only)
#[utoipa::path(
    get,
    path = "/api/admin/users/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID (UUID)")),
    responses(
        (status = 200, description = "User profile", body = User),
        (status = 403, description = "Admin access required", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
async fn admin_get_user() {}

/// OpenAPI documentation for the Paytrack API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Paytrack API",
        version = "1.0.0",
        description = "Personal payment tracking: accounts, payments, filters, CSV export and dashboard aggregates.\n\n## Authentication\n\nRegister or log in to obtain an access token, then include it in the `Authorization` header:\n\n```\nAuthorization: Bearer <token>\n```\n\nAll JSON responses use the envelope `{success, message, data}` or `{success, error, details}`.",
        license(name = "MIT"),
    ),
    paths(
        health,
        register,
        login,
        refresh,
        forgot_password,
        reset_password,
        me,
        logout,
        list_categories,
        list_payment_methods,
        list_payments,
        create_payment,
        export_payments,
        get_payment,
        update_payment,
        delete_payment,
        dashboard_stats,
        dashboard_recent,
        dashboard_chart,
        admin_get_user,
    ),
    components(
        schemas(
            HealthResponse,
            RegisterRequest,
            LoginRequest,
            RefreshTokenRequest,
            ForgotPasswordRequest,
            ResetPasswordRequest,
            AuthResponse,
            User,
            UserId,
            UserSummary,
            Role,
            Category,
            PaymentMethod,
            Payment,
            PaymentId,
            PaymentStatus,
            PaymentRecord,
            PaymentPage,
            CreatePaymentRequest,
            UpdatePaymentRequest,
            PaymentStatistics,
            MonthlyTotal,
            ErrorResponse,
            FieldError,
        )
    ),

    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration, sessions and password reset"),
        (name = "reference", description = "Categories and payment methods"),
        (name = "payments", description = "Payment records, filters and export"),
        (name = "dashboard", description = "Aggregates for the dashboard"),
        (name = "admin", description = "Administrative lookups"),
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for Bearer token authentication.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}
