//! HTTP tests for registration, sessions, password reset and the admin lookup.
//!
//! This test requires the `sqlite` feature flag.

#![cfg(feature = "sqlite")]

mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::json;

use common::{PASSWORD, spawn_app};
use paytrack_hex::MailJob;

#[tokio::test]
async fn test_register_returns_session_envelope() {
    let app = spawn_app(100).await;

    let (status, body) = app
        .post_json(
            "/api/auth/register",
            json!({ "email": "alice@example.com", "password": PASSWORD, "full_name": "Alice Doe" }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "User registered successfully");
    assert!(body["data"]["token"].is_string());
    assert!(body["data"]["refresh_token"].is_string());
    assert_eq!(body["data"]["user"]["role"], "user");
    assert!(body["data"]["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_register_duplicate_email_conflict() {
    let app = spawn_app(100).await;
    app.register("alice@example.com").await;

    let (status, body) = app
        .post_json(
            "/api/auth/register",
            json!({ "email": "alice@example.com", "password": PASSWORD, "full_name": "Alice Doe" }),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "email already registered");
}

#[tokio::test]
async fn test_register_validation_details() {
    let app = spawn_app(100).await;

    let (status, body) = app
        .post_json(
            "/api/auth/register",
            json!({ "email": "nope", "password": "123", "full_name": "Al" }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed");
    let details = body["details"].as_array().unwrap();
    assert_eq!(details.len(), 2);
    assert_eq!(details[0]["field"], "email");
    assert_eq!(details[1]["field"], "password");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = spawn_app(100).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request format");
}

#[tokio::test]
async fn test_login_wrong_password_unauthorized() {
    let app = spawn_app(100).await;
    app.register("alice@example.com").await;

    let (status, body) = app
        .post_json(
            "/api/auth/login",
            json!({ "email": "alice@example.com", "password": "wrong-password" }),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid email or password");
}

#[tokio::test]
async fn test_me_requires_bearer_token() {
    let app = spawn_app(100).await;

    let missing = Request::builder()
        .uri("/api/auth/me")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(missing).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authorization header required");

    let malformed = Request::builder()
        .uri("/api/auth/me")
        .header(header::AUTHORIZATION, "Token abc")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(malformed).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid authorization format");

    let (status, body) = app.get("/api/auth/me", "garbage.token.value").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or expired token");
}

#[tokio::test]
async fn test_me_returns_profile() {
    let app = spawn_app(100).await;
    let token = app.token_for("alice@example.com").await;

    let (status, body) = app.get("/api/auth/me", &token).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "alice@example.com");
}

#[tokio::test]
async fn test_refresh_then_logout_revokes() {
    let app = spawn_app(100).await;
    let session = app.register("alice@example.com").await;
    let refresh_token = session["refresh_token"].as_str().unwrap();
    let token = session["token"].as_str().unwrap();

    let (status, body) = app
        .post_json(
            "/api/auth/refresh",
            json!({ "refresh_token": refresh_token }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["refresh_token"], refresh_token);

    let (status, _) = app
        .authed_json(Method::POST, "/api/auth/logout", token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post_json(
            "/api/auth/refresh",
            json!({ "refresh_token": refresh_token }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid refresh token");
}

#[tokio::test]
async fn test_password_reset_over_http() {
    let mut app = spawn_app(100).await;
    app.register("alice@example.com").await;

    let (status, body) = app
        .post_json(
            "/api/auth/forgot-password",
            json!({ "email": "alice@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["message"],
        "If your email is registered, you will receive a password reset link"
    );

    let MailJob::PasswordReset { token, .. } = app.mail.try_recv().unwrap();

    let (status, _) = app
        .post_json(
            "/api/auth/reset-password",
            json!({ "token": token, "new_password": "brand-new-pass" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post_json(
            "/api/auth/login",
            json!({ "email": "alice@example.com", "password": "brand-new-pass" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post_json(
            "/api/auth/reset-password",
            json!({ "token": token, "new_password": "another-pass" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid or expired token");
}

#[tokio::test]
async fn test_forgot_password_unknown_email_same_response() {
    let mut app = spawn_app(100).await;

    let (status, body) = app
        .post_json(
            "/api/auth/forgot-password",
            json!({ "email": "ghost@example.com" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(app.mail.try_recv().is_err());
}

#[tokio::test]
async fn test_admin_route_requires_admin_role() {
    let app = spawn_app(100).await;
    let session = app.register("alice@example.com").await;
    let user_token = session["token"].as_str().unwrap();
    let user_id = session["user"]["id"].as_str().unwrap();
    let uri = format!("/api/admin/users/{}", user_id);

    let (status, body) = app.get(&uri, user_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Admin access required");

    let admin_token = app.admin_token().await;
    let (status, body) = app.get(&uri, &admin_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "alice@example.com");

    let (status, _) = app.get("/api/admin/users/not-a-uuid", &admin_token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_openapi_document_served() {
    let app = spawn_app(100).await;

    let request = Request::builder()
        .uri("/api/openapi.json")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/payments"].is_object());
}
