//! Repository Implementations
//!
//! PostgreSQL implementations of domain repository traits.
//!
//! ## Available Repositories
//!
//! - **UserRepository** - accounts of every role, plus the client wizard transaction
//! - **BusinessRepository** - tenants, created together with their owner
//! - **PetRepository** - pets and their medical records
//! - **ServiceRepository** - the service catalog and its statistics
//! - **AppointmentRepository** - bookings, overlap checks and dashboard aggregates
//! - **OtpRepository** - hashed one-time passcodes
//! - **SessionRepository** - refresh-token sessions
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use sqlx::PgPool;
//! use crate::infrastructure::repositories::{PgAppointmentRepository, PgUserRepository};
//!
//! async fn setup_repositories(pool: PgPool) {
//!     let user_repo = PgUserRepository::new(pool.clone());
//!     let appointment_repo = PgAppointmentRepository::new(pool);
//! }
//! ```

pub mod appointment_repository;
pub mod business_repository;
pub mod otp_repository;
pub mod pet_repository;
pub mod service_repository;
pub mod session_repository;
pub mod user_repository;

pub use appointment_repository::PgAppointmentRepository;
pub use business_repository::PgBusinessRepository;
pub use otp_repository::PgOtpRepository;
pub use pet_repository::PgPetRepository;
pub use service_repository::PgServiceRepository;
pub use session_repository::PgSessionRepository;
pub use user_repository::PgUserRepository;

/// `ILIKE ... ESCAPE '\'` pattern matching `search` anywhere, with the
/// user's own `%`, `_` and `\` taken literally.
pub(crate) fn contains_pattern(search: Option<&str>) -> Option<String> {
    search.map(|term| {
        let mut pattern = String::with_capacity(term.len() + 2);
        pattern.push('%');
        for ch in term.chars() {
            if matches!(ch, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(ch);
        }
        pattern.push('%');
        pattern
    })
}
