//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **AuthService**: Registration, login, JWT sessions, profile and password
//! - **OtpService**: One-time passcodes for login, verification and password reset
//! - **AppointmentService**: Booking, rescheduling, status workflow and calendar
//! - **ClientService**: Client wizard, client records and appointment history
//! - **PetService**: Pets and their medical records
//! - **CatalogService**: Bookable services, categories and statistics
//! - **StaffService**: Staff accounts
//! - **BusinessService**: Business profile, settings and working hours
//! - **DashboardService**: Dashboard counters and revenue summary

pub mod appointment_service;
pub mod auth_service;
pub mod business_service;
pub mod catalog_service;
pub mod client_service;
pub mod dashboard_service;
pub mod otp_service;
pub mod pet_service;
pub mod staff_service;

pub use appointment_service::{AppointmentError, AppointmentService, AppointmentServiceImpl};
pub use auth_service::{
    decode_access_token, AuthError, AuthService, AuthServiceImpl, AuthTokens, Claims, TokenIssuer,
};
pub use business_service::{BusinessError, BusinessService, BusinessServiceImpl};
pub use catalog_service::{CatalogError, CatalogService, CatalogServiceImpl};
pub use client_service::{ClientError, ClientService, ClientServiceImpl};
pub use dashboard_service::{DashboardService, DashboardServiceImpl};
pub use otp_service::{OtpError, OtpService, OtpServiceImpl, OtpVerification};
pub use pet_service::{PetError, PetService, PetServiceImpl};
pub use staff_service::{StaffError, StaffService, StaffServiceImpl};
