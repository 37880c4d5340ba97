//! # Domain Entities
//!
//! Core business objects of the pet-care platform. All entities map directly
//! to their database tables.
//!
//! ## Core Entities
//!
//! - **Business**: a tenant with its working hours and settings
//! - **User**: any account; clients and staff are users with a role
//! - **Pet**: an animal owned by a client, with its medical history
//! - **Service**: a priced offering of a business
//! - **Appointment**: a booked visit and its lifecycle
//!
//! ## Supporting Entities
//!
//! - **OtpCode**: one-time passcodes and the delivery port
//! - **Session**: refresh-token sessions
//!
//! ## Repository Traits
//!
//! Each entity has an associated repository trait defining data access operations.
//! These traits are implemented in the infrastructure layer.

mod appointment;
mod business;
mod otp;
mod pet;
mod service;
mod session;
mod user;

pub use appointment::{Appointment, AppointmentDetails, AppointmentFilter, AppointmentRepository};
pub use business::{
    default_working_hours, Business, BusinessRepository, BusinessSettings, CancellationPolicy, PaymentMethod,
    ReminderSettings, SubscriptionPlan, WorkingDay,
};
pub use otp::{OtpCode, OtpDelivery, OtpPurpose, OtpRepository};
pub use pet::{MedicalRecord, Pet, PetFilter, PetGender, PetRepository, RecordType, Species};
pub use service::{
    PriceVariation, Service, ServiceBookingCount, ServiceCategory, ServiceFilter, ServiceRepository,
    ServiceRequirements, ServiceStats,
};
pub use session::{Session, SessionRepository};
pub use user::{normalize_email, Address, User, UserFilter, UserRepository};

#[cfg(test)]
pub use appointment::MockAppointmentRepository;
#[cfg(test)]
pub use business::MockBusinessRepository;
#[cfg(test)]
pub use otp::{MockOtpDelivery, MockOtpRepository};
#[cfg(test)]
pub use pet::MockPetRepository;
#[cfg(test)]
pub use service::MockServiceRepository;
#[cfg(test)]
pub use session::MockSessionRepository;
#[cfg(test)]
pub use user::MockUserRepository;
