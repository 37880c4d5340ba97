//! # PetCare Server
//!
//! Application entry point that initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - Database connection pool and migrations
//! - Optional Redis client
//! - HTTP server

use anyhow::Result;
use tracing::info;

use petcare_server::config::Settings;
use petcare_server::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before the subscriber reads RUST_LOG / LOG_FORMAT
    dotenvy::dotenv().ok();

    petcare_server::telemetry::init_tracing();

    info!("Starting PetCare Server...");

    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        "Configuration loaded"
    );

    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
