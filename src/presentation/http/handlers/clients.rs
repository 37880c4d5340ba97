//! Client Handlers

use axum::extract::{Extension, State};

use super::client_service;
use crate::application::dto::request::{CreateClientRequest, PageQuery, PeopleQuery, UpdateClientRequest};
use crate::application::dto::response::{AppointmentListResponse, ClientListResponse, ClientResponse, UserResponse};
use crate::application::dto::ApiResponse;
use crate::application::services::ClientService;
use crate::presentation::http::extractors::{ApiQuery, PathId, ValidatedJson};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Client wizard: the client account and their pets in one request.
pub async fn create_client(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<CreateClientRequest>,
) -> Result<ApiResponse<ClientResponse>, AppError> {
    let (user, pets) = client_service(&state).create(&auth.actor(), body).await?;

    Ok(ApiResponse::created(ClientResponse::new(user, pets)).with_message("Client created successfully"))
}

pub async fn list_clients(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<PeopleQuery>,
) -> Result<ApiResponse<ClientListResponse>, AppError> {
    let page = client_service(&state).list(&auth.actor(), query).await?;

    Ok(ApiResponse::ok(ClientListResponse::from(page)))
}

pub async fn get_client(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathId(id): PathId,
) -> Result<ApiResponse<ClientResponse>, AppError> {
    let (user, pets) = client_service(&state).get(&auth.actor(), id).await?;

    Ok(ApiResponse::ok(ClientResponse::new(user, pets)))
}

pub async fn update_client(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathId(id): PathId,
    ValidatedJson(body): ValidatedJson<UpdateClientRequest>,
) -> Result<ApiResponse<UserResponse>, AppError> {
    let user = client_service(&state).update(&auth.actor(), id, body).await?;

    Ok(ApiResponse::ok(UserResponse::from(user)).with_message("Client updated successfully"))
}

/// Soft delete: the client is deactivated, history is kept.
pub async fn delete_client(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathId(id): PathId,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    client_service(&state).deactivate(&auth.actor(), id).await?;

    Ok(ApiResponse::message_only("Client deactivated successfully"))
}

pub async fn client_appointments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathId(id): PathId,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<ApiResponse<AppointmentListResponse>, AppError> {
    let page = client_service(&state).appointments(&auth.actor(), id, query).await?;

    Ok(ApiResponse::ok(AppointmentListResponse::from(page)))
}
