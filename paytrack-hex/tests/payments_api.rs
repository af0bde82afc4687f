//! HTTP tests for payment CRUD, filtering, export and the dashboard.
//!
//! This test requires the `sqlite` feature flag.

#![cfg(feature = "sqlite")]

mod common;

use axum::{
    body::Body,
    http::{Method, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;

use common::{authed, spawn_app};

#[tokio::test]
async fn test_create_and_get_payment() {
    let app = spawn_app(100).await;
    let token = app.token_for("alice@example.com").await;

    let id = app
        .create_payment(&token, 49.99, "Groceries", "2024-06-01T10:30:00Z")
        .await;
    let (status, body) = app.get(&format!("/api/payments/{}", id), &token).await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["amount"], 49.99);
    assert_eq!(data["status"], "pending");
    assert_eq!(data["description"], "Groceries");
    assert!(data["category"]["name"].is_string());
    assert!(data["payment_method"]["code"].is_string());
    assert_eq!(data["user"]["email"], "alice@example.com");
}

#[tokio::test]
async fn test_create_payment_validation_envelope() {
    let app = spawn_app(100).await;
    let token = app.token_for("alice@example.com").await;
    let (category_id, _) = app.lookup_ids(&token).await;

    let (status, body) = app
        .authed_json(
            Method::POST,
            "/api/payments",
            &token,
            json!({
                "amount": -5,
                "category_id": category_id,
                "payment_method_id": "00000000-0000-0000-0000-000000000000",
                "description": "Bad",
                "transaction_date": "2024-06-01T10:30:00Z",
            }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed");
    let fields: Vec<_> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(fields, ["amount", "payment_method_id"]);
}

#[tokio::test]
async fn test_payments_isolated_between_users() {
    let app = spawn_app(100).await;
    let alice = app.token_for("alice@example.com").await;
    let bob = app.token_for("bob@example.com").await;
    let id = app
        .create_payment(&alice, 10.0, "Lunch", "2024-06-01T12:00:00Z")
        .await;

    let (status, _) = app.get(&format!("/api/payments/{}", id), &bob).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(authed(
            Method::DELETE,
            &format!("/api/payments/{}", id),
            &bob,
            Body::empty(),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.get("/api/payments", &bob).await;
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn test_invalid_payment_id_is_bad_request() {
    let app = spawn_app(100).await;
    let token = app.token_for("alice@example.com").await;

    let (status, body) = app.get("/api/payments/12345", &token).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid payment ID");
}

#[tokio::test]
async fn test_update_then_delete_payment() {
    let app = spawn_app(100).await;
    let token = app.token_for("alice@example.com").await;
    let id = app
        .create_payment(&token, 20.0, "Gym", "2024-03-05T08:00:00Z")
        .await;
    let (category_id, method_id) = app.lookup_ids(&token).await;
    let uri = format!("/api/payments/{}", id);

    let (status, body) = app
        .authed_json(
            Method::PUT,
            &uri,
            &token,
            json!({
                "amount": 25.5,
                "status": "completed",
                "category_id": category_id,
                "payment_method_id": method_id,
                "description": "Gym membership",
                "transaction_date": "2024-03-05T08:00:00Z",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "completed");
    assert_eq!(body["data"]["amount"], 25.5);

    let (status, body) = app
        .send(authed(Method::DELETE, &uri, &token, Body::empty()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Payment deleted successfully");

    let (status, _) = app.get(&uri, &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_filters_and_pagination() {
    let app = spawn_app(100).await;
    let token = app.token_for("alice@example.com").await;
    app.create_payment(&token, 15.0, "Netflix", "2024-01-10T10:00:00Z")
        .await;
    app.create_payment(&token, 120.0, "Electric bill", "2024-02-10T10:00:00Z")
        .await;
    app.create_payment(&token, 8.0, "NETFLIX gift", "2024-02-28T23:59:00Z")
        .await;

    let (status, body) = app
        .get("/api/payments?search=netflix&limit=1&page=1", &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["payments"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["payments"][0]["description"], "NETFLIX gift");

    let (_, body) = app
        .get(
            "/api/payments?start_date=2024-02-01&end_date=2024-02-28&min_amount=10",
            &token,
        )
        .await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["payments"][0]["description"], "Electric bill");

    let (_, body) = app.get("/api/payments?end_date=2024-02-28", &token).await;
    assert_eq!(body["data"]["total"], 3);
}

#[tokio::test]
async fn test_list_malformed_filter_rejected() {
    let app = spawn_app(100).await;
    let token = app.token_for("alice@example.com").await;

    let (status, body) = app
        .get("/api/payments?start_date=01-02-2024&status=lost", &token)
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_export_csv_download() {
    let app = spawn_app(100).await;
    let token = app.token_for("alice@example.com").await;
    app.create_payment(&token, 15.0, "Netflix, monthly", "2024-06-01T09:05:00Z")
        .await;

    let response = app
        .router
        .clone()
        .oneshot(authed(
            Method::GET,
            "/api/payments/export",
            &token,
            Body::empty(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment"));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    let mut lines = text.lines();
    assert!(lines.next().unwrap().starts_with("Transaction Date,Description,Amount"));
    assert!(
        lines
            .next()
            .unwrap()
            .starts_with("2024-06-01 09:05,\"Netflix, monthly\",15.00,")
    );
}

#[tokio::test]
async fn test_dashboard_endpoints() {
    let app = spawn_app(100).await;
    let token = app.token_for("alice@example.com").await;
    let (category_id, method_id) = app.lookup_ids(&token).await;

    let march = app
        .create_payment(&token, 100.0, "Rent", "2024-03-01T10:00:00Z")
        .await;
    app.create_payment(&token, 30.0, "Snacks", "2024-03-02T10:00:00Z")
        .await;
    app.authed_json(
        Method::PUT,
        &format!("/api/payments/{}", march),
        &token,
        json!({
            "amount": 100.0,
            "status": "completed",
            "category_id": category_id,
            "payment_method_id": method_id,
            "description": "Rent",
            "transaction_date": "2024-03-01T10:00:00Z",
        }),
    )
    .await;

    let (status, body) = app.get("/api/dashboard/stats", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_payments"], 2);
    assert_eq!(body["data"]["completed_count"], 1);
    assert_eq!(body["data"]["pending_count"], 1);
    assert_eq!(body["data"]["total_amount"], 100.0);

    let (_, body) = app.get("/api/dashboard/recent", &token).await;
    assert_eq!(body["data"][0]["description"], "Snacks");

    let (_, body) = app.get("/api/dashboard/chart?year=2024", &token).await;
    let months = body["data"].as_array().unwrap();
    assert_eq!(months.len(), 1);
    assert_eq!(months[0]["month"], 3);
    assert_eq!(months[0]["count"], 1);
}

#[tokio::test]
async fn test_reference_data_listed() {
    let app = spawn_app(100).await;
    let token = app.token_for("alice@example.com").await;

    let (status, body) = app.get("/api/categories", &token).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap().to_string())
        .collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);

    let (status, body) = app.get("/api/payment-methods", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["data"].as_array().unwrap().is_empty());
}
