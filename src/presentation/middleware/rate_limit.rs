//! Rate Limiting Middleware
//!
//! Redis-based sliding window rate limiting. Authentication endpoints get a
//! stricter budget than the rest of the API. Without a Redis connection the
//! limiter is disabled and every request passes.

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use redis::aio::ConnectionManager;
use serde::Serialize;

use crate::config::RateLimitSettings;
use crate::infrastructure::cache::keys;
use crate::presentation::middleware::auth::AuthUser;
use crate::shared::error::ErrorResponse;
use crate::startup::AppState;

const WINDOW_SECONDS: u64 = 60;

/// Sorted-set sliding window. Returns `{allowed, count, max, retry_after_ms?}`.
const SLIDING_WINDOW_SCRIPT: &str = r#"
local key = KEYS[1]
local now_ms = tonumber(ARGV[1])
local window_start = tonumber(ARGV[2])
local max_requests = tonumber(ARGV[3])
local window_seconds = tonumber(ARGV[4])

redis.call('ZREMRANGEBYSCORE', key, '-inf', window_start)
local current_count = redis.call('ZCARD', key)

if current_count < max_requests then
    local member = now_ms .. ':' .. math.random(1000000)
    redis.call('ZADD', key, now_ms, member)
    redis.call('EXPIRE', key, window_seconds + 1)
    return {1, current_count + 1, max_requests}
else
    local oldest = redis.call('ZRANGE', key, 0, 0, 'WITHSCORES')
    local retry_after = 0
    if oldest and #oldest >= 2 then
        retry_after = oldest[2] + (window_seconds * 1000) - now_ms
    end
    return {0, current_count, max_requests, retry_after}
end
"#;

/// Which budget a request is counted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitScope {
    /// Login, registration, token refresh and OTP endpoints
    Auth,
    /// Everything else under `/api`
    Api,
}

impl LimitScope {
    fn as_str(&self) -> &'static str {
        match self {
            LimitScope::Auth => "auth",
            LimitScope::Api => "api",
        }
    }

    /// Requests allowed per window for this scope.
    pub fn limit(&self, settings: &RateLimitSettings) -> u32 {
        match self {
            LimitScope::Auth => settings.auth_per_minute,
            LimitScope::Api => settings.api_per_minute,
        }
    }
}

/// Rate limit status reported to clients.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitInfo {
    pub limit: u32,
    pub remaining: u32,
    /// Unix timestamp when the window resets
    pub reset_at: i64,
    /// Seconds until a retry may succeed
    pub retry_after: u64,
}

#[derive(Debug, Serialize)]
struct RateLimitExceededResponse {
    #[serde(flatten)]
    error: ErrorResponse,
    rate_limit: RateLimitInfo,
}

/// Distributed sliding window limiter.
#[derive(Clone)]
pub struct RateLimiter {
    redis: ConnectionManager,
    scope: LimitScope,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(redis: ConnectionManager, scope: LimitScope, max_requests: u32) -> Self {
        Self {
            redis,
            scope,
            max_requests,
        }
    }

    /// `Ok` when the request may proceed, `Err` when the budget is spent.
    /// Redis failures let the request through.
    pub async fn check(&self, identifier: &str) -> Result<RateLimitInfo, RateLimitInfo> {
        let key = keys::rate_limit(self.scope.as_str(), identifier);
        let now_ms = chrono::Utc::now().timestamp_millis();
        let window_start = now_ms - (WINDOW_SECONDS * 1000) as i64;
        let reset_at = (now_ms / 1000) + WINDOW_SECONDS as i64;

        let mut conn = self.redis.clone();
        let result: Vec<i64> = match redis::Script::new(SLIDING_WINDOW_SCRIPT)
            .key(&key)
            .arg(now_ms)
            .arg(window_start)
            .arg(self.max_requests as i64)
            .arg(WINDOW_SECONDS as i64)
            .invoke_async(&mut conn)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Rate limiter Redis error: {}", e);
                return Ok(RateLimitInfo {
                    limit: self.max_requests,
                    remaining: self.max_requests,
                    reset_at,
                    retry_after: 0,
                });
            }
        };

        let allowed = result.first().copied() == Some(1);
        let current_count = result.get(1).copied().unwrap_or(0).max(0) as u32;

        let info = RateLimitInfo {
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(current_count),
            reset_at,
            retry_after: if allowed {
                0
            } else {
                let retry_ms = result.get(3).copied().unwrap_or(0).max(0);
                ((retry_ms as f64) / 1000.0).ceil() as u64
            },
        };

        if allowed {
            Ok(info)
        } else {
            Err(info)
        }
    }
}

/// Rate limit identifier for a request.
///
/// Authenticated user first, then the proxy headers, then the socket address.
fn extract_identifier(request: &Request) -> String {
    if let Some(auth_user) = request.extensions().get::<AuthUser>() {
        return format!("user:{}", auth_user.user_id);
    }

    if let Some(ip) = forwarded_ip(request.headers()) {
        return format!("ip:{}", ip);
    }

    match request.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => format!("ip:{}", addr.ip()),
        None => {
            tracing::warn!("Could not determine client identifier for rate limiting");
            "ip:unknown".to_string()
        }
    }
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let forwarded_for = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse().ok());

    forwarded_for.or_else(|| {
        headers
            .get("x-real-ip")
            .and_then(|h| h.to_str().ok())
            .and_then(|ip| ip.trim().parse().ok())
    })
}

/// Rate limiting for authentication endpoints.
pub async fn rate_limit_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    rate_limit_inner(state, request, next, LimitScope::Auth).await
}

/// Rate limiting for the rest of the API.
pub async fn rate_limit_api(State(state): State<AppState>, request: Request, next: Next) -> Response {
    rate_limit_inner(state, request, next, LimitScope::Api).await
}

async fn rate_limit_inner(state: AppState, request: Request, next: Next, scope: LimitScope) -> Response {
    let Some(redis) = state.redis.clone() else {
        return next.run(request).await;
    };

    let identifier = extract_identifier(&request);
    let limiter = RateLimiter::new(redis, scope, scope.limit(&state.settings.rate_limit));

    match limiter.check(&identifier).await {
        Ok(info) => {
            let mut response = next.run(request).await;
            add_rate_limit_headers(response.headers_mut(), &info);
            response
        }
        Err(info) => {
            tracing::warn!(
                identifier = %identifier,
                scope = scope.as_str(),
                "Rate limit exceeded"
            );
            create_rate_limit_response(info)
        }
    }
}

fn add_rate_limit_headers(headers: &mut HeaderMap, info: &RateLimitInfo) {
    headers.insert("x-ratelimit-limit", HeaderValue::from(info.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(info.remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(info.reset_at));
}

fn create_rate_limit_response(info: RateLimitInfo) -> Response {
    let info = RateLimitInfo { remaining: 0, ..info };
    let body = RateLimitExceededResponse {
        error: ErrorResponse::new(10006, "Too many requests. Please slow down."),
        rate_limit: info.clone(),
    };

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(info.retry_after));
    add_rate_limit_headers(response.headers_mut(), &info);

    response
}
