//! Authentication and role gate tests for protected routes

use axum::http::StatusCode;
use chrono::Duration;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use test_case::test_case;

use petcare_server::domain::Role;

use crate::common::{unique_email, TestApp, BUSINESS_ID};

#[test_case("/api/appointments")]
#[test_case("/api/clients")]
#[test_case("/api/pets")]
#[test_case("/api/services")]
#[test_case("/api/staff")]
#[test_case("/api/business")]
#[test_case("/api/dashboard/stats")]
#[tokio::test]
async fn test_protected_routes_require_token(path: &str) {
    let app = TestApp::new();

    app.server.get(path).await.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_authorization_header() {
    let app = TestApp::new();

    let response = app
        .server
        .get("/api/pets")
        .add_header("authorization", "Token abc")
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.json::<Value>()["message"],
        "Invalid authorization header format"
    );
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    let app = TestApp::new();
    let mut other = TestApp::new();
    other.settings.jwt.secret = "another-secret-that-is-also-32-characters".into();

    app.server
        .get("/api/pets")
        .authorization_bearer(other.token(Role::Staff))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let app = TestApp::new();
    let token = app.token_with(Role::Staff, Some(BUSINESS_ID.to_string()), Duration::minutes(-10));

    app.server
        .get("/api/pets")
        .authorization_bearer(token)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_path_id_is_bad_request() {
    let app = TestApp::new();

    let response = app
        .server
        .get("/api/pets/not-an-id")
        .authorization_bearer(app.token(Role::Staff))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["message"], "Invalid id");
}

#[tokio::test]
async fn test_dashboard_is_not_for_clients() {
    let app = TestApp::new();

    app.server
        .get("/api/dashboard/stats")
        .authorization_bearer(app.token(Role::Client))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_staff_cannot_create_staff() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/staff")
        .authorization_bearer(app.token(Role::Staff))
        .json(&json!({
            "first_name": "Sam",
            "last_name": "Lee",
            "email": unique_email(),
            "password": "ValidPassword123!"
        }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>()["code"], 10004);
}

#[test_case(Role::BusinessAdmin)]
#[test_case(Role::Staff)]
#[test_case(Role::Client)]
#[tokio::test]
async fn test_business_list_is_super_admin_only(role: Role) {
    let app = TestApp::new();

    app.server
        .get("/api/businesses")
        .authorization_bearer(app.token(role))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_appointment_form_reports_every_missing_field() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/appointments")
        .authorization_bearer(app.token(Role::Staff))
        .json(&json!({}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, ["client_id", "pet_id", "service_id", "date", "time"]);
    assert_eq!(body["message"], "Please select a client");
}

#[tokio::test]
async fn test_client_form_skips_client_selection() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/appointments")
        .authorization_bearer(app.token(Role::Client))
        .json(&json!({ "service_id": "1", "date": "2030-01-01", "time": "10:00" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["message"], "Please select a pet");
}
