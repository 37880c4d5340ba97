//! Pet Handlers

use axum::extract::{Extension, State};

use super::pet_service;
use crate::application::dto::request::{CreateMedicalRecordRequest, CreatePetRequest, PetQuery, UpdatePetRequest};
use crate::application::dto::response::{MedicalRecordResponse, PetListResponse, PetResponse};
use crate::application::dto::ApiResponse;
use crate::application::services::PetService;
use crate::presentation::http::extractors::{ApiQuery, PathId, ValidatedJson};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

pub async fn create_pet(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<CreatePetRequest>,
) -> Result<ApiResponse<PetResponse>, AppError> {
    let pet = pet_service(&state).create(&auth.actor(), body).await?;

    Ok(ApiResponse::created(PetResponse::from(pet)).with_message("Pet added successfully"))
}

pub async fn list_pets(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<PetQuery>,
) -> Result<ApiResponse<PetListResponse>, AppError> {
    let page = pet_service(&state).list(&auth.actor(), query).await?;

    Ok(ApiResponse::ok(PetListResponse::from(page)))
}

pub async fn get_pet(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathId(id): PathId,
) -> Result<ApiResponse<PetResponse>, AppError> {
    let pet = pet_service(&state).get(&auth.actor(), id).await?;

    Ok(ApiResponse::ok(PetResponse::from(pet)))
}

pub async fn update_pet(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathId(id): PathId,
    ValidatedJson(body): ValidatedJson<UpdatePetRequest>,
) -> Result<ApiResponse<PetResponse>, AppError> {
    let pet = pet_service(&state).update(&auth.actor(), id, body).await?;

    Ok(ApiResponse::ok(PetResponse::from(pet)).with_message("Pet updated successfully"))
}

pub async fn delete_pet(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathId(id): PathId,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    pet_service(&state).delete(&auth.actor(), id).await?;

    Ok(ApiResponse::message_only("Pet removed successfully"))
}

pub async fn add_medical_record(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathId(pet_id): PathId,
    ValidatedJson(body): ValidatedJson<CreateMedicalRecordRequest>,
) -> Result<ApiResponse<MedicalRecordResponse>, AppError> {
    let record = pet_service(&state).add_medical_record(&auth.actor(), pet_id, body).await?;

    Ok(ApiResponse::created(MedicalRecordResponse::from(record)).with_message("Medical record added successfully"))
}

pub async fn list_medical_records(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathId(pet_id): PathId,
) -> Result<ApiResponse<Vec<MedicalRecordResponse>>, AppError> {
    let records = pet_service(&state).list_medical_records(&auth.actor(), pet_id).await?;

    Ok(ApiResponse::ok(records.into_iter().map(MedicalRecordResponse::from).collect()))
}
