//! Business Handlers

use axum::extract::{Extension, State};

use super::business_service;
use crate::application::dto::request::{
    PageQuery, UpdateBusinessRequest, UpdateSettingsRequest, UpdateWorkingHoursRequest,
};
use crate::application::dto::response::{BusinessListResponse, BusinessResponse};
use crate::application::dto::ApiResponse;
use crate::application::services::BusinessService;
use crate::presentation::http::extractors::{ApiJson, ApiQuery, ValidatedJson};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// The caller's own business.
pub async fn get_business(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<ApiResponse<BusinessResponse>, AppError> {
    let business = business_service(&state).get_current(&auth.actor()).await?;

    Ok(ApiResponse::ok(BusinessResponse::from(business)))
}

pub async fn update_business(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<UpdateBusinessRequest>,
) -> Result<ApiResponse<BusinessResponse>, AppError> {
    let business = business_service(&state).update_profile(&auth.actor(), body).await?;

    Ok(ApiResponse::ok(BusinessResponse::from(business)).with_message("Business updated successfully"))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<UpdateSettingsRequest>,
) -> Result<ApiResponse<BusinessResponse>, AppError> {
    let business = business_service(&state).update_settings(&auth.actor(), body).await?;

    Ok(ApiResponse::ok(BusinessResponse::from(business)).with_message("Settings updated successfully"))
}

/// Working hours are checked as a whole week by the service.
pub async fn update_working_hours(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(body): ApiJson<UpdateWorkingHoursRequest>,
) -> Result<ApiResponse<BusinessResponse>, AppError> {
    let business = business_service(&state)
        .update_working_hours(&auth.actor(), body)
        .await?;

    Ok(ApiResponse::ok(BusinessResponse::from(business)).with_message("Working hours updated successfully"))
}

/// Every tenant; super admins only.
pub async fn list_businesses(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<ApiResponse<BusinessListResponse>, AppError> {
    let page = business_service(&state).list(&auth.actor(), query).await?;

    Ok(ApiResponse::ok(BusinessListResponse::from(page)))
}
