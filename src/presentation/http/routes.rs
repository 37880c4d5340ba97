//! Route Configuration
//!
//! Configures all HTTP routes for the API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;

use super::handlers;
use crate::presentation::middleware::{
    auth_middleware, cors, create_security_headers_layer, logging, rate_limit_api, rate_limit_auth,
};
use crate::startup::AppState;

/// Room for the multipart framing around the avatar file.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Create the main router with every layer applied.
pub fn create_router(state: AppState) -> Router {
    let uploads = &state.settings.uploads;

    Router::new()
        .nest("/api", api_routes(state.clone()))
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        .route("/metrics", get(handlers::health::metrics_handler))
        .nest_service(&uploads.public_path, ServeDir::new(&uploads.dir))
        .route_layer(middleware::from_fn(logging::track_metrics))
        .layer(CompressionLayer::new())
        .layer(logging::create_trace_layer())
        .layer(cors::create_cors_layer(&state.settings.cors))
        .layer(create_security_headers_layer(&state.settings))
        .with_state(state)
}

/// `/api` routes
fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes(state.clone()))
        .nest("/otp", otp_routes(state.clone()))
        .merge(protected_routes(state))
}

/// Public authentication routes (stricter rate limiting)
fn auth_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/refresh", post(handlers::auth::refresh_token))
        .route("/logout", post(handlers::auth::logout))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit_auth));

    let avatar_limit = state.avatars.max_bytes() + MULTIPART_OVERHEAD_BYTES;
    let profile = Router::new()
        .route(
            "/profile",
            get(handlers::auth::get_profile).put(handlers::auth::update_profile),
        )
        .route("/password", put(handlers::auth::change_password))
        .route(
            "/avatar",
            post(handlers::auth::upload_avatar).layer(DefaultBodyLimit::max(avatar_limit)),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit_api))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    public.merge(profile)
}

/// One-time passcode routes (public, stricter rate limiting)
fn otp_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/send", post(handlers::otp::send_code))
        .route("/verify", post(handlers::otp::verify_code))
        .route("/reset-password", post(handlers::otp::reset_password))
        .route_layer(middleware::from_fn_with_state(state, rate_limit_auth))
}

/// Routes that require a bearer token. The auth layer is added last so it
/// runs first and the rate limiter can key on the user.
fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/appointments", appointment_routes())
        .nest("/clients", client_routes())
        .nest("/pets", pet_routes())
        .nest("/services", service_routes())
        .nest("/staff", staff_routes())
        .nest("/business", business_routes())
        .route("/businesses", get(handlers::business::list_businesses))
        .route("/dashboard/stats", get(handlers::dashboard::stats))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit_api))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

fn appointment_routes() -> Router<AppState> {
    use handlers::appointments::*;

    Router::new()
        .route("/", get(list_appointments).post(create_appointment))
        .route("/calendar", get(calendar))
        .route(
            "/{id}",
            get(get_appointment).put(update_appointment).delete(delete_appointment),
        )
        .route("/{id}/confirm", post(confirm_appointment))
        .route("/{id}/checkin", post(checkin_appointment))
        .route("/{id}/start", post(start_appointment))
        .route("/{id}/complete", post(complete_appointment))
        .route("/{id}/cancel", post(cancel_appointment))
        .route("/{id}/no-show", post(no_show_appointment))
}

fn client_routes() -> Router<AppState> {
    use handlers::clients::*;

    Router::new()
        .route("/", get(list_clients).post(create_client))
        .route("/{id}", get(get_client).put(update_client).delete(delete_client))
        .route("/{id}/appointments", get(client_appointments))
}

fn pet_routes() -> Router<AppState> {
    use handlers::pets::*;

    Router::new()
        .route("/", get(list_pets).post(create_pet))
        .route("/{id}", get(get_pet).put(update_pet).delete(delete_pet))
        .route(
            "/{id}/medical-records",
            get(list_medical_records).post(add_medical_record),
        )
}

fn service_routes() -> Router<AppState> {
    use handlers::services::*;

    Router::new()
        .route("/", get(list_services).post(create_service))
        .route("/categories", get(list_categories))
        .route("/stats", get(service_stats))
        .route("/{id}", get(get_service).put(update_service).delete(delete_service))
}

fn staff_routes() -> Router<AppState> {
    use handlers::staff::*;

    Router::new()
        .route("/", get(list_staff).post(create_staff))
        .route("/{id}", put(update_staff).delete(delete_staff))
}

fn business_routes() -> Router<AppState> {
    use handlers::business::*;

    Router::new()
        .route("/", get(get_business).put(update_business))
        .route("/settings", put(update_settings))
        .route("/working-hours", put(update_working_hours))
}
