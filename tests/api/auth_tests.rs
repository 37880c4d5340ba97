//! Authentication API Tests

use axum::body::Bytes;
use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::{unique_email, TestApp};

#[tokio::test]
async fn test_register_with_invalid_email_fails() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/auth/register")
        .json(&json!({
            "first_name": "Dana",
            "last_name": "Reyes",
            "email": "not-an-email",
            "password": "ValidPassword123!"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], 10007);
    assert_eq!(body["errors"][0]["field"], "email");
    assert_eq!(body["message"], "Invalid email format");
}

#[tokio::test]
async fn test_register_with_short_password_fails() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/auth/register")
        .json(&json!({
            "first_name": "Dana",
            "last_name": "Reyes",
            "email": unique_email(),
            "password": "short"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["errors"][0]["field"], "password");
}

#[tokio::test]
async fn test_login_with_malformed_json_fails() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/auth/login")
        .bytes(Bytes::from_static(b"{\"email\": "))
        .content_type("application/json")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], 10002);
}

#[tokio::test]
async fn test_profile_requires_token() {
    let app = TestApp::new();

    let response = app.server.get("/api/auth/profile").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["code"], 10003);
    assert_eq!(body["message"], "Missing authorization header");
}

#[tokio::test]
async fn test_otp_send_rejects_unknown_purpose() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/otp/send")
        .json(&json!({ "email": unique_email(), "purpose": "signup" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["errors"][0]["field"], "purpose");
}

#[tokio::test]
async fn test_otp_verify_rejects_malformed_code() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/otp/verify")
        .json(&json!({ "email": unique_email(), "code": "12ab56", "purpose": "login" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["message"], "Code must be 6 digits");
}
