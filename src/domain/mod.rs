//! # Domain Layer
//!
//! Business rules of the pet-care platform, independent of any framework or
//! infrastructure concern.
//!
//! ## Structure
//!
//! - **entities**: Business, User, Pet, Service, Appointment, OTP codes, sessions
//! - **value_objects**: Role, AppointmentStatus
//! - **services**: access policy and calendar grouping
//!
//! Repository traits live next to their entities and are implemented in the
//! infrastructure layer.

pub mod entities;
pub mod services;
pub mod value_objects;

// Re-export commonly used types
pub use entities::*;
pub use value_objects::*;
