//! Staff Handlers

use axum::extract::{Extension, State};

use super::staff_service;
use crate::application::dto::request::{CreateStaffRequest, PeopleQuery, UpdateStaffRequest};
use crate::application::dto::response::{StaffListResponse, UserResponse};
use crate::application::dto::ApiResponse;
use crate::application::services::StaffService;
use crate::presentation::http::extractors::{ApiQuery, PathId, ValidatedJson};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

pub async fn list_staff(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<PeopleQuery>,
) -> Result<ApiResponse<StaffListResponse>, AppError> {
    let page = staff_service(&state).list(&auth.actor(), query).await?;

    Ok(ApiResponse::ok(StaffListResponse::from(page)))
}

pub async fn create_staff(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<CreateStaffRequest>,
) -> Result<ApiResponse<UserResponse>, AppError> {
    let user = staff_service(&state).create(&auth.actor(), body).await?;

    Ok(ApiResponse::created(UserResponse::from(user)).with_message("Staff member created successfully"))
}

pub async fn update_staff(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathId(id): PathId,
    ValidatedJson(body): ValidatedJson<UpdateStaffRequest>,
) -> Result<ApiResponse<UserResponse>, AppError> {
    let user = staff_service(&state).update(&auth.actor(), id, body).await?;

    Ok(ApiResponse::ok(UserResponse::from(user)).with_message("Staff member updated successfully"))
}

pub async fn delete_staff(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathId(id): PathId,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    staff_service(&state).deactivate(&auth.actor(), id).await?;

    Ok(ApiResponse::message_only("Staff member deactivated successfully"))
}
