//! HTTP Handlers
//!
//! Request handlers for all HTTP endpoints. Services are assembled per
//! request from the shared pool by the constructors below.

pub mod appointments;
pub mod auth;
pub mod business;
pub mod clients;
pub mod dashboard;
pub mod health;
pub mod otp;
pub mod pets;
pub mod services;
pub mod staff;

use std::sync::Arc;

use crate::application::services::{
    AppointmentService, AppointmentServiceImpl, AuthService, AuthServiceImpl, BusinessService,
    BusinessServiceImpl, CatalogService, CatalogServiceImpl, ClientService, ClientServiceImpl,
    DashboardService, DashboardServiceImpl, OtpService, OtpServiceImpl, PetService, PetServiceImpl,
    StaffService, StaffServiceImpl,
};
use crate::infrastructure::repositories::{
    PgAppointmentRepository, PgBusinessRepository, PgOtpRepository, PgPetRepository, PgServiceRepository,
    PgSessionRepository, PgUserRepository,
};
use crate::startup::AppState;

fn users(state: &AppState) -> Arc<PgUserRepository> {
    Arc::new(PgUserRepository::new(state.db.clone()))
}

fn businesses(state: &AppState) -> Arc<PgBusinessRepository> {
    Arc::new(PgBusinessRepository::new(state.db.clone()))
}

fn pets(state: &AppState) -> Arc<PgPetRepository> {
    Arc::new(PgPetRepository::new(state.db.clone()))
}

fn appointments(state: &AppState) -> Arc<PgAppointmentRepository> {
    Arc::new(PgAppointmentRepository::new(state.db.clone()))
}

fn sessions(state: &AppState) -> Arc<PgSessionRepository> {
    Arc::new(PgSessionRepository::new(state.db.clone()))
}

pub(crate) fn auth_service(state: &AppState) -> impl AuthService {
    AuthServiceImpl::new(
        users(state),
        businesses(state),
        sessions(state),
        state.snowflake.clone(),
        state.settings.jwt.clone(),
    )
}

pub(crate) fn otp_service(state: &AppState) -> impl OtpService {
    OtpServiceImpl::new(
        users(state),
        Arc::new(PgOtpRepository::new(state.db.clone())),
        sessions(state),
        state.otp_delivery.clone(),
        state.snowflake.clone(),
        state.settings.otp.clone(),
        state.settings.jwt.clone(),
    )
}

pub(crate) fn appointment_service(state: &AppState) -> impl AppointmentService {
    AppointmentServiceImpl::new(
        appointments(state),
        users(state),
        pets(state),
        Arc::new(PgServiceRepository::new(state.db.clone())),
        businesses(state),
        state.snowflake.clone(),
    )
}

pub(crate) fn client_service(state: &AppState) -> impl ClientService {
    ClientServiceImpl::new(users(state), pets(state), appointments(state), state.snowflake.clone())
}

pub(crate) fn pet_service(state: &AppState) -> impl PetService {
    PetServiceImpl::new(pets(state), users(state), state.snowflake.clone())
}

pub(crate) fn catalog_service(state: &AppState) -> impl CatalogService {
    CatalogServiceImpl::new(
        Arc::new(PgServiceRepository::new(state.db.clone())),
        users(state),
        state.snowflake.clone(),
    )
}

pub(crate) fn staff_service(state: &AppState) -> impl StaffService {
    StaffServiceImpl::new(users(state), state.snowflake.clone())
}

pub(crate) fn business_service(state: &AppState) -> impl BusinessService {
    BusinessServiceImpl::new(businesses(state))
}

pub(crate) fn dashboard_service(state: &AppState) -> impl DashboardService {
    DashboardServiceImpl::new(appointments(state), users(state), pets(state))
}
