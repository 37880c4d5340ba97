//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use chrono::Utc;
use redis::aio::ConnectionManager;
use sqlx::PgPool;
use tokio::net::TcpListener;

use crate::config::Settings;
use crate::domain::{OtpRepository, SessionRepository};
use crate::infrastructure::notifications::LogOtpDelivery;
use crate::infrastructure::repositories::{PgOtpRepository, PgSessionRepository};
use crate::infrastructure::storage::AvatarStorage;
use crate::infrastructure::{cache, database};
use crate::presentation::http::{handlers, routes};
use crate::shared::snowflake::SnowflakeGenerator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Absent when Redis is not configured; rate limiting is then skipped
    pub redis: Option<ConnectionManager>,
    pub snowflake: Arc<SnowflakeGenerator>,
    pub settings: Arc<Settings>,
    pub avatars: AvatarStorage,
    pub otp_delivery: Arc<LogOtpDelivery>,
}

impl AppState {
    pub fn new(settings: Settings, db: PgPool, redis: Option<ConnectionManager>) -> Self {
        let snowflake = Arc::new(SnowflakeGenerator::with_epoch(
            settings.snowflake.epoch,
            settings.snowflake.machine_id as u64,
            0,
        ));

        Self {
            db,
            redis,
            snowflake,
            avatars: AvatarStorage::new(&settings.uploads),
            otp_delivery: Arc::new(LogOtpDelivery::new(!settings.is_production())),
            settings: Arc::new(settings),
        }
    }
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        settings.validate().context("Invalid configuration")?;

        let db = database::create_pool(&settings.database)
            .await
            .context("Failed to connect to the database")?;
        tracing::info!("Database connection pool created");

        if settings.database.run_migrations {
            database::run_migrations(&db)
                .await
                .context("Failed to run database migrations")?;
            tracing::info!("Database migrations applied");
        }

        let redis = cache::create_redis_client(&settings.redis)
            .await
            .context("Failed to connect to Redis")?;
        if redis.is_some() {
            tracing::info!("Redis connection established");
        }

        tokio::fs::create_dir_all(&settings.uploads.dir)
            .await
            .with_context(|| format!("Failed to create upload directory {}", settings.uploads.dir))?;

        let addr = settings.server_addr();
        let housekeeping_db = db.clone();
        let state = AppState::new(settings, db, redis);
        let router = routes::create_router(state);

        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        handlers::health::init_server_start();
        spawn_housekeeping(housekeeping_db);

        Ok(Self { listener, router })
    }

    /// Run the server until Ctrl+C
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(
            self.listener,
            self.router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        tracing::info!("Server stopped");
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Hourly purge of expired sessions and passcodes.
fn spawn_housekeeping(db: PgPool) {
    let sessions = PgSessionRepository::new(db.clone());
    let otps = PgOtpRepository::new(db);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(HOUSEKEEPING_INTERVAL);
        loop {
            ticker.tick().await;

            match sessions.cleanup_expired().await {
                Ok(removed) if removed > 0 => tracing::info!(removed, "Expired sessions purged"),
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Session cleanup failed"),
            }
            match otps.delete_expired(Utc::now()).await {
                Ok(removed) if removed > 0 => tracing::info!(removed, "Expired passcodes purged"),
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Passcode cleanup failed"),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}
