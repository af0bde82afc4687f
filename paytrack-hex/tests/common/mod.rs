//! Shared helpers for HTTP integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::Duration;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tower::ServiceExt;

use paytrack_hex::inbound::{HttpServer, ServerConfig};
use paytrack_hex::{AuthService, MailJob, MailOutbox, PaymentService, TokenService};
use paytrack_repo::SqliteRepo;
use paytrack_repo::security::hash_password;
use paytrack_types::{NewUser, Role, UserRepository};

pub const SECRET: &str = "integration-secret-at-least-32-bytes!!";
pub const PASSWORD: &str = "hunter22";

pub struct TestApp {
    pub router: Router,
    pub repo: Arc<SqliteRepo>,
    pub mail: mpsc::Receiver<MailJob>,
}

/// Builds a server over a fresh in-memory database.
pub async fn spawn_app(rate_limit_per_minute: u32) -> TestApp {
    let repo = Arc::new(SqliteRepo::new("sqlite::memory:").await.unwrap());
    let (outbox, mail) = MailOutbox::channel(16);
    let tokens = TokenService::new(SECRET, Duration::hours(1));
    let auth = AuthService::new(repo.clone(), tokens, outbox);
    let payments = PaymentService::new(repo.clone());

    let server = HttpServer::with_config(
        auth,
        payments,
        ServerConfig {
            rate_limit_per_minute,
            ..ServerConfig::default()
        },
    );

    TestApp {
        router: server.router(),
        repo,
        mail,
    }
}

impl TestApp {
    /// Sends a request and returns the status with the parsed JSON body
    /// (`Value::Null` when the body is not JSON).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(json_request(Method::POST, uri, None, body)).await
    }

    /// Registers `email` and returns the session payload.
    pub async fn register(&self, email: &str) -> Value {
        let (status, body) = self
            .post_json(
                "/api/auth/register",
                json!({ "email": email, "password": PASSWORD, "full_name": "Test User" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body["data"].clone()
    }

    /// Registers `email` and returns its access token.
    pub async fn token_for(&self, email: &str) -> String {
        self.register(email).await["token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    /// Inserts an admin directly and logs them in.
    pub async fn admin_token(&self) -> String {
        self.repo
            .create_user(NewUser {
                email: "admin@example.com".into(),
                password_hash: hash_password(PASSWORD).unwrap(),
                full_name: "Admin".into(),
                role: Role::Admin,
            })
            .await
            .unwrap();

        let (status, body) = self
            .post_json(
                "/api/auth/login",
                json!({ "email": "admin@example.com", "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["data"]["token"].as_str().unwrap().to_string()
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(authed(Method::GET, uri, token, Body::empty()))
            .await
    }

    pub async fn authed_json(
        &self,
        method: Method,
        uri: &str,
        token: &str,
        body: Value,
    ) -> (StatusCode, Value) {
        self.send(json_request(method, uri, Some(token), body)).await
    }

    /// First category and payment method ids.
    pub async fn lookup_ids(&self, token: &str) -> (String, String) {
        let (_, categories) = self.get("/api/categories", token).await;
        let (_, methods) = self.get("/api/payment-methods", token).await;
        (
            categories["data"][0]["id"].as_str().unwrap().to_string(),
            methods["data"][0]["id"].as_str().unwrap().to_string(),
        )
    }

    /// Creates a payment and returns its id.
    pub async fn create_payment(
        &self,
        token: &str,
        amount: f64,
        description: &str,
        date: &str,
    ) -> String {
        let (category_id, method_id) = self.lookup_ids(token).await;
        let (status, body) = self
            .authed_json(
                Method::POST,
                "/api/payments",
                token,
                json!({
                    "amount": amount,
                    "category_id": category_id,
                    "payment_method_id": method_id,
                    "description": description,
                    "transaction_date": date,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn authed(method: Method, uri: &str, token: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(body)
        .unwrap()
}
