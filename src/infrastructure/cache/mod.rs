//! Cache Module
//!
//! Redis connection management. Redis is optional: it backs the sliding-window
//! rate limiter and nothing else, so a missing URL disables limiting instead
//! of failing startup.
//!
//! # Example
//!
//! ```rust,ignore
//! use petcare_server::infrastructure::cache::create_redis_client;
//!
//! let conn = create_redis_client(&settings.redis).await?;
//! ```

use redis::aio::ConnectionManager;
use redis::Client;
use tracing::{info, instrument, warn};

use crate::config::RedisSettings;

/// Creates a Redis connection manager with automatic reconnection.
///
/// Returns `Ok(None)` when no Redis URL is configured.
#[instrument(skip(settings))]
pub async fn create_redis_client(
    settings: &RedisSettings,
) -> Result<Option<ConnectionManager>, redis::RedisError> {
    let Some(url) = settings.url.as_deref().filter(|u| !u.trim().is_empty()) else {
        warn!("REDIS_URL not set; rate limiting is disabled");
        return Ok(None);
    };

    info!("Connecting to Redis...");
    let client = Client::open(url)?;
    let manager = ConnectionManager::new(client).await?;
    info!("Redis connection established");
    Ok(Some(manager))
}

/// Send a PING; used by the readiness probe.
pub async fn ping(conn: &ConnectionManager) -> Result<(), redis::RedisError> {
    let mut conn = conn.clone();
    let _: String = redis::cmd("PING").query_async(&mut conn).await?;
    Ok(())
}

/// Cache key prefixes.
pub mod keys {
    /// Prefix for rate limiting counters (e.g., "ratelimit:auth:ip:1.2.3.4")
    pub const RATE_LIMIT: &str = "ratelimit:";

    /// Generates a rate limit key
    #[inline]
    pub fn rate_limit(scope: &str, identifier: &str) -> String {
        format!("{}{}:{}", RATE_LIMIT, scope, identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_key() {
        assert_eq!(keys::rate_limit("auth", "ip:10.0.0.1"), "ratelimit:auth:ip:10.0.0.1");
    }

    #[tokio::test]
    async fn test_missing_url_disables_redis() {
        let settings = RedisSettings { url: None };
        assert!(create_redis_client(&settings).await.unwrap().is_none());

        let blank = RedisSettings { url: Some("  ".into()) };
        assert!(create_redis_client(&blank).await.unwrap().is_none());
    }
}
