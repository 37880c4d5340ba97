//! Common Test Utilities
//!
//! The real router over a lazily-connected pool and no Redis. Only paths that
//! are decided before any query runs can be exercised here.

use axum_test::TestServer;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};

use petcare_server::application::services::Claims;
use petcare_server::config::Settings;
use petcare_server::domain::Role;
use petcare_server::infrastructure::database;
use petcare_server::presentation::http::routes::create_router;
use petcare_server::startup::AppState;

pub const BUSINESS_ID: i64 = 7_000_000_001;

/// Test application builder
pub struct TestApp {
    pub server: TestServer,
    pub settings: Settings,
}

impl TestApp {
    pub fn new() -> Self {
        let settings = Settings::for_tests();
        let db = database::create_lazy_pool(&settings.database).expect("lazy pool");
        let state = AppState::new(settings.clone(), db, None);
        let server = TestServer::new(create_router(state)).expect("test server");

        Self { server, settings }
    }

    /// Access token for a user of `role` in the test business.
    pub fn token(&self, role: Role) -> String {
        let business_id = (role != Role::SuperAdmin).then(|| BUSINESS_ID.to_string());
        self.token_with(role, business_id, Duration::minutes(15))
    }

    pub fn token_with(&self, role: Role, business_id: Option<String>, ttl: Duration) -> String {
        let now = Utc::now();
        let claims = Claims {
            sub: "4200000000001".into(),
            role: role.as_str().into(),
            business_id,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.settings.jwt.secret.as_bytes()),
        )
        .expect("encode token")
    }
}

/// Generate a unique test email
pub fn unique_email() -> String {
    format!("test_{}@example.com", uuid::Uuid::new_v4())
}
