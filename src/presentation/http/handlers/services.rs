//! Service Catalog Handlers

use axum::extract::{Extension, State};

use super::catalog_service;
use crate::application::dto::request::{CreateServiceRequest, ServiceQuery, UpdateServiceRequest};
use crate::application::dto::response::{
    CategoryCountResponse, ServiceListResponse, ServiceResponse, ServiceStatsResponse,
};
use crate::application::dto::ApiResponse;
use crate::application::services::CatalogService;
use crate::presentation::http::extractors::{ApiQuery, PathId, ValidatedJson};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Service wizard: basic info, pricing, duration, requirements and staff.
pub async fn create_service(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<CreateServiceRequest>,
) -> Result<ApiResponse<ServiceResponse>, AppError> {
    let service = catalog_service(&state).create(&auth.actor(), body).await?;

    Ok(ApiResponse::created(ServiceResponse::from(service)).with_message("Service created successfully"))
}

pub async fn list_services(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<ServiceQuery>,
) -> Result<ApiResponse<ServiceListResponse>, AppError> {
    let page = catalog_service(&state).list(&auth.actor(), query).await?;

    Ok(ApiResponse::ok(ServiceListResponse::from(page)))
}

pub async fn get_service(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathId(id): PathId,
) -> Result<ApiResponse<ServiceResponse>, AppError> {
    let service = catalog_service(&state).get(&auth.actor(), id).await?;

    Ok(ApiResponse::ok(ServiceResponse::from(service)))
}

pub async fn update_service(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathId(id): PathId,
    ValidatedJson(body): ValidatedJson<UpdateServiceRequest>,
) -> Result<ApiResponse<ServiceResponse>, AppError> {
    let service = catalog_service(&state).update(&auth.actor(), id, body).await?;

    Ok(ApiResponse::ok(ServiceResponse::from(service)).with_message("Service updated successfully"))
}

pub async fn delete_service(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathId(id): PathId,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    catalog_service(&state).delete(&auth.actor(), id).await?;

    Ok(ApiResponse::message_only("Service deactivated successfully"))
}

pub async fn list_categories(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<ApiResponse<Vec<CategoryCountResponse>>, AppError> {
    let categories = catalog_service(&state).categories(&auth.actor()).await?;

    Ok(ApiResponse::ok(categories))
}

pub async fn service_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<ApiResponse<ServiceStatsResponse>, AppError> {
    let stats = catalog_service(&state).stats(&auth.actor()).await?;

    Ok(ApiResponse::ok(stats))
}
