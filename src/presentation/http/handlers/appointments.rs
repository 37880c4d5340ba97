//! Appointment Handlers

use axum::{
    body::Bytes,
    extract::{Extension, State},
};

use super::appointment_service;
use crate::application::dto::request::{
    AppointmentQuery, CalendarQuery, CancelAppointmentRequest, CreateAppointmentRequest, UpdateAppointmentRequest,
};
use crate::application::dto::response::{AppointmentListResponse, AppointmentResponse, CalendarResponse};
use crate::application::dto::ApiResponse;
use crate::application::services::AppointmentService;
use crate::domain::StatusAction;
use crate::infrastructure::metrics;
use crate::presentation::http::extractors::{ApiQuery, PathId, ValidatedJson};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::validate_request;
use crate::startup::AppState;

pub async fn create_appointment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<CreateAppointmentRequest>,
) -> Result<ApiResponse<AppointmentResponse>, AppError> {
    let appointment = appointment_service(&state).create(&auth.actor(), body).await?;

    Ok(ApiResponse::created(AppointmentResponse::from(appointment)).with_message("Appointment created successfully"))
}

pub async fn list_appointments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<AppointmentQuery>,
) -> Result<ApiResponse<AppointmentListResponse>, AppError> {
    let page = appointment_service(&state).list(&auth.actor(), query).await?;

    Ok(ApiResponse::ok(AppointmentListResponse::from(page)))
}

pub async fn get_appointment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathId(id): PathId,
) -> Result<ApiResponse<AppointmentResponse>, AppError> {
    let appointment = appointment_service(&state).get(&auth.actor(), id).await?;

    Ok(ApiResponse::ok(AppointmentResponse::from(appointment)))
}

pub async fn update_appointment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathId(id): PathId,
    ValidatedJson(body): ValidatedJson<UpdateAppointmentRequest>,
) -> Result<ApiResponse<AppointmentResponse>, AppError> {
    let appointment = appointment_service(&state).update(&auth.actor(), id, body).await?;

    Ok(ApiResponse::ok(AppointmentResponse::from(appointment)).with_message("Appointment updated successfully"))
}

pub async fn delete_appointment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathId(id): PathId,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    appointment_service(&state).delete(&auth.actor(), id).await?;

    Ok(ApiResponse::message_only("Appointment deleted successfully"))
}

/// Appointments of a month grouped by day.
pub async fn calendar(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<CalendarQuery>,
) -> Result<ApiResponse<CalendarResponse>, AppError> {
    let days = appointment_service(&state)
        .calendar(&auth.actor(), query.year, query.month)
        .await?;

    Ok(ApiResponse::ok(CalendarResponse::new(query.year, query.month, days)))
}

fn transition_message(action: StatusAction) -> &'static str {
    match action {
        StatusAction::Confirm => "Appointment confirmed",
        StatusAction::CheckIn => "Client checked in",
        StatusAction::Start => "Appointment started",
        StatusAction::Complete => "Appointment completed",
        StatusAction::Cancel => "Appointment cancelled",
        StatusAction::NoShow => "Appointment marked as no-show",
    }
}

async fn transition(
    state: &AppState,
    auth: &AuthUser,
    id: i64,
    action: StatusAction,
    reason: Option<String>,
) -> Result<ApiResponse<AppointmentResponse>, AppError> {
    let (appointment, _previous) = appointment_service(state)
        .transition(&auth.actor(), id, action, reason)
        .await?;

    metrics::record_appointment_transition(action.as_str(), appointment.appointment.status.as_str());

    Ok(ApiResponse::ok(AppointmentResponse::from(appointment)).with_message(transition_message(action)))
}

pub async fn confirm_appointment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathId(id): PathId,
) -> Result<ApiResponse<AppointmentResponse>, AppError> {
    transition(&state, &auth, id, StatusAction::Confirm, None).await
}

pub async fn checkin_appointment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathId(id): PathId,
) -> Result<ApiResponse<AppointmentResponse>, AppError> {
    transition(&state, &auth, id, StatusAction::CheckIn, None).await
}

pub async fn start_appointment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathId(id): PathId,
) -> Result<ApiResponse<AppointmentResponse>, AppError> {
    transition(&state, &auth, id, StatusAction::Start, None).await
}

pub async fn complete_appointment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathId(id): PathId,
) -> Result<ApiResponse<AppointmentResponse>, AppError> {
    transition(&state, &auth, id, StatusAction::Complete, None).await
}

/// The body is optional; `{"reason": "..."}` records why.
pub async fn cancel_appointment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathId(id): PathId,
    body: Bytes,
) -> Result<ApiResponse<AppointmentResponse>, AppError> {
    let request = parse_cancel_body(&body)?;
    transition(&state, &auth, id, StatusAction::Cancel, request.reason).await
}

pub async fn no_show_appointment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathId(id): PathId,
) -> Result<ApiResponse<AppointmentResponse>, AppError> {
    transition(&state, &auth, id, StatusAction::NoShow, None).await
}

fn parse_cancel_body(body: &[u8]) -> Result<CancelAppointmentRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(CancelAppointmentRequest::default());
    }

    let request: CancelAppointmentRequest =
        serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {}", e)))?;
    validate_request(&request)?;

    Ok(CancelAppointmentRequest {
        reason: request.reason.map(|r| r.trim().to_owned()).filter(|r| !r.is_empty()),
    })
}
