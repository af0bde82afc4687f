//! # Paytrack Client SDK
//!
//! A typed Rust client for the Paytrack API. Responses are unwrapped from the
//! `{success, message, data}` envelope; failures carry the server's error
//! message and field details.

use paytrack_types::{
    ApiResponse, AuthResponse, Category, CreatePaymentRequest, ErrorResponse, FieldError,
    ForgotPasswordRequest, LoginRequest, MonthlyTotal, PaymentId, PaymentListQuery,
    PaymentMethod, PaymentPage, PaymentRecord, PaymentStatistics, RefreshTokenRequest,
    RegisterRequest, ResetPasswordRequest, UpdatePaymentRequest, User, UserId,
};
use reqwest::{Client, Method, RequestBuilder};
use serde::{Serialize, de::DeserializeOwned};

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api {
        status: u16,
        message: String,
        details: Vec<FieldError>,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Response envelope had no data")]
    MissingData,
}

/// Paytrack API client.
pub struct PaytrackClient {
    base_url: String,
    token: Option<String>,
    http: Client,
}

impl PaytrackClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            http: Client::new(),
        }
    }

    /// Sets the access token sent as `Authorization: Bearer`.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    /// Checks if the API is healthy.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(resp.status().is_success())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Auth
    // ─────────────────────────────────────────────────────────────────────────

    /// Registers and stores the returned access token on the client.
    pub async fn register(
        &mut self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<AuthResponse, ClientError> {
        let req = RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            full_name: full_name.to_string(),
        };
        let session: AuthResponse = self.send_json(Method::POST, "/api/auth/register", &req).await?;
        self.set_token(&session.token);
        Ok(session)
    }

    /// Logs in and stores the returned access token on the client.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let req = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let session: AuthResponse = self.send_json(Method::POST, "/api/auth/login", &req).await?;
        self.set_token(&session.token);
        Ok(session)
    }

    pub async fn refresh(&mut self, refresh_token: &str) -> Result<AuthResponse, ClientError> {
        let req = RefreshTokenRequest {
            refresh_token: refresh_token.to_string(),
        };
        let session: AuthResponse = self.send_json(Method::POST, "/api/auth/refresh", &req).await?;
        self.set_token(&session.token);
        Ok(session)
    }

    pub async fn me(&self) -> Result<User, ClientError> {
        self.get("/api/auth/me").await
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        self.send_unit(self.request(Method::POST, "/api/auth/logout"))
            .await
    }

    pub async fn forgot_password(&self, email: &str) -> Result<(), ClientError> {
        let req = ForgotPasswordRequest {
            email: email.to_string(),
        };
        self.send_unit(
            self.request(Method::POST, "/api/auth/forgot-password")
                .json(&req),
        )
        .await
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), ClientError> {
        let req = ResetPasswordRequest {
            token: token.to_string(),
            new_password: new_password.to_string(),
        };
        self.send_unit(
            self.request(Method::POST, "/api/auth/reset-password")
                .json(&req),
        )
        .await
    }

    /// Admin lookup of any user.
    pub async fn get_user(&self, id: UserId) -> Result<User, ClientError> {
        self.get(&format!("/api/admin/users/{}", id)).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reference data
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn categories(&self) -> Result<Vec<Category>, ClientError> {
        self.get("/api/categories").await
    }

    pub async fn payment_methods(&self) -> Result<Vec<PaymentMethod>, ClientError> {
        self.get("/api/payment-methods").await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Payments
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn create_payment(
        &self,
        req: &CreatePaymentRequest,
    ) -> Result<PaymentRecord, ClientError> {
        self.send_json(Method::POST, "/api/payments", req).await
    }

    pub async fn get_payment(&self, id: PaymentId) -> Result<PaymentRecord, ClientError> {
        self.get(&format!("/api/payments/{}", id)).await
    }

    pub async fn update_payment(
        &self,
        id: PaymentId,
        req: &UpdatePaymentRequest,
    ) -> Result<PaymentRecord, ClientError> {
        self.send_json(Method::PUT, &format!("/api/payments/{}", id), req)
            .await
    }

    pub async fn delete_payment(&self, id: PaymentId) -> Result<(), ClientError> {
        self.send_unit(self.request(Method::DELETE, &format!("/api/payments/{}", id)))
            .await
    }

    pub async fn list_payments(&self, query: &PaymentListQuery) -> Result<PaymentPage, ClientError> {
        let resp = self
            .request(Method::GET, "/api/payments")
            .query(query)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    /// Downloads the filtered payments as CSV text.
    pub async fn export_csv(&self, query: &PaymentListQuery) -> Result<String, ClientError> {
        let resp = self
            .request(Method::GET, "/api/payments/export")
            .query(query)
            .send()
            .await?;
        if resp.status().is_success() {
            Ok(resp.text().await?)
        } else {
            Err(api_error(resp).await)
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Dashboard
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn statistics(&self) -> Result<PaymentStatistics, ClientError> {
        self.get("/api/dashboard/stats").await
    }

    pub async fn recent_payments(&self) -> Result<Vec<PaymentRecord>, ClientError> {
        self.get("/api/dashboard/recent").await
    }

    pub async fn monthly_totals(&self, year: Option<i32>) -> Result<Vec<MonthlyTotal>, ClientError> {
        let path = match year {
            Some(year) => format!("/api/dashboard/chart?year={}", year),
            None => "/api/dashboard/chart".to_string(),
        };
        self.get(&path).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Plumbing
    // ─────────────────────────────────────────────────────────────────────────

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut req = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let resp = self.request(Method::GET, path).send().await?;
        self.handle_response(resp).await
    }

    async fn send_json<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let resp = self.request(method, path).json(body).send().await?;
        self.handle_response(resp).await
    }

    async fn send_unit(&self, req: RequestBuilder) -> Result<(), ClientError> {
        let resp = req.send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(api_error(resp).await)
        }
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        if resp.status().is_success() {
            let body = resp.text().await?;
            let envelope: ApiResponse<T> = serde_json::from_str(&body)?;
            envelope.data.ok_or(ClientError::MissingData)
        } else {
            Err(api_error(resp).await)
        }
    }
}

async fn api_error(resp: reqwest::Response) -> ClientError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    parse_error(status, body)
}

fn parse_error(status: u16, body: String) -> ClientError {
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(err) => ClientError::Api {
            status,
            message: err.error,
            details: err.details,
        },
        Err(_) => ClientError::Api {
            status,
            message: body,
            details: Vec::new(),
        },
    }
}
