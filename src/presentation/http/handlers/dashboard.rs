//! Dashboard Handlers

use axum::extract::{Extension, State};

use super::dashboard_service;
use crate::application::dto::response::DashboardStatsResponse;
use crate::application::dto::ApiResponse;
use crate::application::services::DashboardService;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Counters and revenue summary for the caller's business.
pub async fn stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<ApiResponse<DashboardStatsResponse>, AppError> {
    let stats = dashboard_service(&state).stats(&auth.actor()).await?;

    Ok(ApiResponse::ok(stats))
}
