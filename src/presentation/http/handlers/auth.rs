//! Authentication Handlers

use axum::extract::{Extension, Multipart, State};

use super::auth_service;
use crate::application::dto::request::{
    ChangePasswordRequest, LoginRequest, RefreshTokenRequest, RegisterRequest, UpdateProfileRequest,
};
use crate::application::dto::response::{AuthResponse, TokenResponse, UserResponse};
use crate::application::dto::ApiResponse;
use crate::application::services::AuthService;
use crate::presentation::http::extractors::{ApiJson, ValidatedJson};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

const AVATAR_FIELD: &str = "avatar";

/// Register a new client or business owner
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<RegisterRequest>,
) -> Result<ApiResponse<AuthResponse>, AppError> {
    let (user, tokens) = auth_service(&state).register(body).await?;

    Ok(ApiResponse::created(AuthResponse::new(user, tokens)).with_message("Registration successful"))
}

/// Login with credentials
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> Result<ApiResponse<AuthResponse>, AppError> {
    let (user, tokens) = auth_service(&state).login(&body.email, &body.password).await?;

    Ok(ApiResponse::ok(AuthResponse::new(user, tokens)).with_message("Login successful"))
}

/// Exchange a refresh token for a new token pair
pub async fn refresh_token(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RefreshTokenRequest>,
) -> Result<ApiResponse<TokenResponse>, AppError> {
    let tokens = auth_service(&state).refresh(&body.refresh_token).await?;

    Ok(ApiResponse::ok(TokenResponse::from(tokens)))
}

/// Logout (revoke refresh token)
pub async fn logout(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RefreshTokenRequest>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    auth_service(&state).logout(&body.refresh_token).await?;

    Ok(ApiResponse::message_only("Logged out successfully"))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<ApiResponse<UserResponse>, AppError> {
    let user = auth_service(&state).get_profile(auth.user_id).await?;

    Ok(ApiResponse::ok(UserResponse::from(user)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<UpdateProfileRequest>,
) -> Result<ApiResponse<UserResponse>, AppError> {
    let user = auth_service(&state).update_profile(auth.user_id, body).await?;

    Ok(ApiResponse::ok(UserResponse::from(user)).with_message("Profile updated successfully"))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<ChangePasswordRequest>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    auth_service(&state)
        .change_password(auth.user_id, &body.current_password, &body.new_password)
        .await?;

    Ok(ApiResponse::message_only("Password changed successfully"))
}

/// Replace the caller's avatar with the uploaded `avatar` image.
pub async fn upload_avatar(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<ApiResponse<UserResponse>, AppError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(AVATAR_FIELD) {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_owned();
        let bytes = field.bytes().await.map_err(|e| AppError::BadRequest(e.body_text()))?;
        upload = Some((content_type, bytes));
        break;
    }

    let (content_type, bytes) = upload.ok_or_else(|| AppError::BadRequest("No avatar file uploaded".into()))?;
    let url = state.avatars.save(auth.user_id, &content_type, &bytes).await?;

    match auth_service(&state).set_avatar(auth.user_id, Some(url.clone())).await {
        Ok((user, previous)) => {
            if let Some(previous) = previous {
                state.avatars.remove(&previous).await;
            }
            Ok(ApiResponse::ok(UserResponse::from(user)).with_message("Avatar updated successfully"))
        }
        Err(e) => {
            state.avatars.remove(&url).await;
            Err(e.into())
        }
    }
}
