//! One-Time Passcode Handlers

use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::otp_service;
use crate::application::dto::request::{ResetPasswordRequest, SendOtpRequest, VerifyOtpRequest};
use crate::application::dto::response::AuthResponse;
use crate::application::dto::ApiResponse;
use crate::application::services::{OtpService, OtpVerification};
use crate::domain::OtpPurpose;
use crate::presentation::http::extractors::ValidatedJson;
use crate::shared::error::AppError;
use crate::shared::validation::field_error;
use crate::startup::AppState;

fn parse_purpose(raw: &str) -> Result<OtpPurpose, AppError> {
    OtpPurpose::parse(raw.trim())
        .ok_or_else(|| field_error("purpose", "Purpose must be login, password_reset or email_verification"))
}

pub async fn send_code(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<SendOtpRequest>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    let purpose = parse_purpose(&body.purpose)?;
    otp_service(&state).send(&body.email, purpose).await?;

    Ok(ApiResponse::message_only("Verification code sent"))
}

/// The body depends on the purpose: a login returns tokens, the others a message.
pub async fn verify_code(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<VerifyOtpRequest>,
) -> Result<Response, AppError> {
    let purpose = parse_purpose(&body.purpose)?;
    let verification = otp_service(&state).verify(&body.email, &body.code, purpose).await?;

    let response = match verification {
        OtpVerification::LoggedIn(user, tokens) => ApiResponse::ok(AuthResponse::new(user, tokens))
            .with_message("Login successful")
            .into_response(),
        OtpVerification::EmailVerified => ApiResponse::ok(json!({ "verified": true }))
            .with_message("Email verified successfully")
            .into_response(),
        OtpVerification::ResetAllowed => ApiResponse::ok(json!({ "verified": true }))
            .with_message("Code verified. You can now reset your password")
            .into_response(),
    };

    Ok(response)
}

pub async fn reset_password(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<ResetPasswordRequest>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    otp_service(&state)
        .reset_password(&body.email, &body.code, &body.new_password)
        .await?;

    Ok(ApiResponse::message_only("Password reset successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("login", OtpPurpose::Login)]
    #[test_case("password_reset", OtpPurpose::PasswordReset)]
    #[test_case(" email_verification ", OtpPurpose::EmailVerification)]
    fn test_parse_purpose(raw: &str, expected: OtpPurpose) {
        assert_eq!(parse_purpose(raw).unwrap(), expected);
    }

    #[test]
    fn test_unknown_purpose_is_a_field_error() {
        assert!(matches!(parse_purpose("signup"), Err(AppError::InvalidFields(_))));
    }
}
