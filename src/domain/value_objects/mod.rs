//! # Domain Value Objects
//!
//! Immutable value types that represent domain concepts without identity.
//!
//! ## Value Objects
//!
//! - **Role**: account role (super admin, business admin, staff, client)
//! - **AppointmentStatus**: appointment lifecycle and its transition table

mod appointment_status;
mod role;

pub use appointment_status::*;
pub use role::*;
