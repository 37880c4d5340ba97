//! Health Check Handlers
//!
//! Liveness and readiness probes plus the Prometheus scrape endpoint.
//!
//! # Endpoints
//! - `GET /health` - Basic health check
//! - `GET /health/live` - Liveness probe (is the process running?)
//! - `GET /health/ready` - Readiness probe (are the database and Redis reachable?)
//! - `GET /metrics` - Prometheus text format

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::time::Instant;

use crate::infrastructure::{cache, database, metrics};
use crate::startup::AppState;

static SERVER_START: Lazy<Instant> = Lazy::new(Instant::now);
static SERVER_START_TIME: Lazy<DateTime<Utc>> = Lazy::new(Utc::now);

/// Pin the start time; called once during startup.
pub fn init_server_start() {
    Lazy::force(&SERVER_START);
    Lazy::force(&SERVER_START_TIME);
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DetailedHealthResponse {
    pub status: HealthStatus,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub started_at: String,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub database: ServiceHealth,
    pub redis: ServiceHealth,
}

#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ServiceHealth {
    fn timed(latency_ms: u64, degraded_after_ms: u64) -> Self {
        Self {
            status: if latency_ms < degraded_after_ms {
                HealthStatus::Healthy
            } else {
                HealthStatus::Degraded
            },
            latency_ms: Some(latency_ms),
            message: None,
        }
    }

    fn failed(message: String) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            latency_ms: None,
            message: Some(message),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    /// Optional dependency that is not configured
    Disabled,
}

#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse { status: "alive" })
}

/// Readiness probe. 503 when the database is unreachable; Redis problems
/// only degrade the status since rate limiting fails open.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let (db_health, redis_health) = tokio::join!(check_database(&state), check_redis(&state));
    let overall_status = determine_overall_status(&db_health, &redis_health);

    let response = DetailedHealthResponse {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: SERVER_START.elapsed().as_secs(),
        started_at: SERVER_START_TIME.to_rfc3339(),
        checks: HealthChecks {
            database: db_health,
            redis: redis_health,
        },
    };

    let status_code = match overall_status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    (status_code, Json(response))
}

async fn check_database(state: &AppState) -> ServiceHealth {
    let start = Instant::now();
    match database::ping(&state.db).await {
        Ok(()) => ServiceHealth::timed(start.elapsed().as_millis() as u64, 100),
        Err(e) => ServiceHealth::failed(format!("Database connection failed: {}", e)),
    }
}

async fn check_redis(state: &AppState) -> ServiceHealth {
    let Some(redis) = state.redis.as_ref() else {
        return ServiceHealth {
            status: HealthStatus::Disabled,
            latency_ms: None,
            message: Some("Redis is not configured".into()),
        };
    };

    let start = Instant::now();
    match cache::ping(redis).await {
        Ok(()) => ServiceHealth::timed(start.elapsed().as_millis() as u64, 50),
        Err(e) => ServiceHealth::failed(format!("Redis connection failed: {}", e)),
    }
}

fn determine_overall_status(db: &ServiceHealth, redis: &ServiceHealth) -> HealthStatus {
    if db.status == HealthStatus::Unhealthy {
        return HealthStatus::Unhealthy;
    }

    if db.status == HealthStatus::Degraded
        || matches!(redis.status, HealthStatus::Unhealthy | HealthStatus::Degraded)
    {
        return HealthStatus::Degraded;
    }

    HealthStatus::Healthy
}

/// Prometheus scrape endpoint; refreshes the pool gauges first.
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let idle = state.db.num_idle() as u32;
    let size = state.db.size();
    metrics::update_db_pool_stats(
        idle,
        size.saturating_sub(idle),
        state.settings.database.max_connections,
    );

    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        metrics::gather_metrics(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn health(status: HealthStatus) -> ServiceHealth {
        ServiceHealth {
            status,
            latency_ms: None,
            message: None,
        }
    }

    #[test]
    fn test_health_status_serialization() {
        assert_eq!(serde_json::to_string(&HealthStatus::Healthy).unwrap(), "\"healthy\"");
        assert_eq!(serde_json::to_string(&HealthStatus::Disabled).unwrap(), "\"disabled\"");
    }

    #[test_case(HealthStatus::Healthy, HealthStatus::Healthy, HealthStatus::Healthy)]
    #[test_case(HealthStatus::Healthy, HealthStatus::Disabled, HealthStatus::Healthy; "redis not configured")]
    #[test_case(HealthStatus::Degraded, HealthStatus::Healthy, HealthStatus::Degraded)]
    #[test_case(HealthStatus::Healthy, HealthStatus::Unhealthy, HealthStatus::Degraded; "redis down")]
    #[test_case(HealthStatus::Unhealthy, HealthStatus::Healthy, HealthStatus::Unhealthy)]
    fn test_determine_overall_status(db: HealthStatus, redis: HealthStatus, expected: HealthStatus) {
        assert_eq!(determine_overall_status(&health(db), &health(redis)), expected);
    }

    #[test]
    fn test_latency_threshold() {
        assert_eq!(ServiceHealth::timed(10, 100).status, HealthStatus::Healthy);
        assert_eq!(ServiceHealth::timed(150, 100).status, HealthStatus::Degraded);
    }
}
