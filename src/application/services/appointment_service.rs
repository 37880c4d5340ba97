//! Appointment Service
//!
//! Booking, rescheduling, the status workflow and the month calendar.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};

use crate::application::dto::request::{AppointmentQuery, CreateAppointmentRequest, UpdateAppointmentRequest};
use crate::domain::services::{calendar, AccessPolicy, Actor};
use crate::domain::{
    Appointment, AppointmentDetails, AppointmentFilter, AppointmentRepository, AppointmentStatus, BusinessRepository,
    BusinessSettings, CancellationPolicy, Pet, PetRepository, Role, Service, ServiceRepository, StatusAction, User,
    UserRepository,
};
use crate::shared::error::{AppError, FieldError};
use crate::shared::pagination::{Page, PageRequest};
use crate::shared::snowflake::SnowflakeGenerator;
use crate::shared::validation::{field_error, optional_id, parse_clock_minutes, parse_date};

#[async_trait]
pub trait AppointmentService: Send + Sync {
    async fn create(&self, actor: &Actor, request: CreateAppointmentRequest) -> Result<AppointmentDetails, AppointmentError>;

    async fn list(&self, actor: &Actor, query: AppointmentQuery) -> Result<Page<AppointmentDetails>, AppointmentError>;

    async fn get(&self, actor: &Actor, id: i64) -> Result<AppointmentDetails, AppointmentError>;

    async fn update(
        &self,
        actor: &Actor,
        id: i64,
        request: UpdateAppointmentRequest,
    ) -> Result<AppointmentDetails, AppointmentError>;

    async fn delete(&self, actor: &Actor, id: i64) -> Result<(), AppointmentError>;

    /// Apply a status action. Returns the updated appointment and its previous status.
    async fn transition(
        &self,
        actor: &Actor,
        id: i64,
        action: StatusAction,
        reason: Option<String>,
    ) -> Result<(AppointmentDetails, AppointmentStatus), AppointmentError>;

    /// Appointments of a month grouped by `YYYY-MM-DD`.
    async fn calendar(
        &self,
        actor: &Actor,
        year: i32,
        month: u32,
    ) -> Result<BTreeMap<String, Vec<AppointmentDetails>>, AppointmentError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Service not found")]
    ServiceNotFound,

    #[error("This service is not currently offered")]
    ServiceUnavailable,

    #[error("Client not found")]
    ClientNotFound,

    #[error("Pet not found")]
    PetNotFound,

    #[error("The selected pet does not belong to this client")]
    PetNotOwnedByClient,

    #[error("Staff member not found")]
    StaffNotFound,

    #[error("The selected staff member does not perform this service")]
    StaffNotAssigned,

    #[error("The selected staff member is already booked at this time")]
    DoubleBooked,

    #[error("Appointment must be scheduled in the future")]
    InPast,

    #[error("{0}")]
    IneligiblePet(String),

    #[error("This service requires up-to-date vaccinations")]
    VaccinationRequired,

    #[error("You do not have permission to modify this appointment")]
    Forbidden,

    #[error("Appointments can only be cancelled at least {0} hours in advance")]
    CancellationWindow(i64),

    #[error("Cannot {action} an appointment that is {from}")]
    IllegalTransition {
        from: AppointmentStatus,
        action: StatusAction,
    },

    #[error("Only scheduled or confirmed appointments can be edited")]
    NotEditable,

    #[error("Appointment was modified by another request, please reload")]
    ConcurrentUpdate,

    #[error(transparent)]
    App(#[from] AppError),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        use AppointmentError as E;
        match err {
            E::NotFound | E::ServiceNotFound | E::ClientNotFound | E::PetNotFound | E::StaffNotFound => {
                AppError::NotFound(err.to_string())
            }
            E::ServiceUnavailable
            | E::PetNotOwnedByClient
            | E::StaffNotAssigned
            | E::InPast
            | E::IneligiblePet(_)
            | E::VaccinationRequired => AppError::BadRequest(err.to_string()),
            E::Forbidden | E::CancellationWindow(_) => AppError::Forbidden(err.to_string()),
            E::DoubleBooked | E::IllegalTransition { .. } | E::NotEditable | E::ConcurrentUpdate => {
                AppError::Conflict(err.to_string())
            }
            E::App(e) => e,
        }
    }
}

/// Combine a `YYYY-MM-DD` date and an `HH:MM` time into a UTC instant.
fn schedule_from(date: &str, time: &str) -> Result<DateTime<Utc>, AppError> {
    let date = parse_date("date", date)?;
    let minutes = parse_clock_minutes(time.trim()).ok_or_else(|| field_error("time", "Time must be in HH:MM format"))?;
    date.and_hms_opt(minutes / 60, minutes % 60, 0)
        .map(|naive| naive.and_utc())
        .ok_or_else(|| field_error("time", "Time must be in HH:MM format"))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub struct AppointmentServiceImpl<A, U, P, S, B>
where
    A: AppointmentRepository,
    U: UserRepository,
    P: PetRepository,
    S: ServiceRepository,
    B: BusinessRepository,
{
    appointment_repo: Arc<A>,
    user_repo: Arc<U>,
    pet_repo: Arc<P>,
    service_repo: Arc<S>,
    business_repo: Arc<B>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<A, U, P, S, B> AppointmentServiceImpl<A, U, P, S, B>
where
    A: AppointmentRepository,
    U: UserRepository,
    P: PetRepository,
    S: ServiceRepository,
    B: BusinessRepository,
{
    pub fn new(
        appointment_repo: Arc<A>,
        user_repo: Arc<U>,
        pet_repo: Arc<P>,
        service_repo: Arc<S>,
        business_repo: Arc<B>,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            appointment_repo,
            user_repo,
            pet_repo,
            service_repo,
            business_repo,
            id_generator,
        }
    }

    /// Load an appointment the actor may see; other tenants' ids look missing.
    async fn load_visible(&self, actor: &Actor, id: i64) -> Result<Appointment, AppointmentError> {
        let appointment = self
            .appointment_repo
            .find_by_id(id)
            .await?
            .filter(|a| AccessPolicy::can_access_business(actor, a.business_id))
            .ok_or(AppointmentError::NotFound)?;

        if !AccessPolicy::can_view_appointment(actor, &appointment) {
            return Err(AppointmentError::Forbidden);
        }
        Ok(appointment)
    }

    async fn details(&self, id: i64) -> Result<AppointmentDetails, AppointmentError> {
        self.appointment_repo
            .find_details(id)
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    async fn load_service(&self, actor: &Actor, service_id: i64) -> Result<Service, AppointmentError> {
        let service = self
            .service_repo
            .find_by_id(service_id)
            .await?
            .filter(|s| AccessPolicy::can_access_business(actor, s.business_id))
            .ok_or(AppointmentError::ServiceNotFound)?;

        if !service.is_active {
            return Err(AppointmentError::ServiceUnavailable);
        }
        Ok(service)
    }

    async fn load_client(&self, business_id: i64, client_id: i64) -> Result<User, AppointmentError> {
        self.user_repo
            .find_by_id(client_id)
            .await?
            .filter(|u| u.role == Role::Client && u.is_active && u.belongs_to(business_id))
            .ok_or(AppointmentError::ClientNotFound)
    }

    async fn load_pet(&self, client_id: i64, pet_id: i64) -> Result<Pet, AppointmentError> {
        let pet = self
            .pet_repo
            .find_by_id(pet_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(AppointmentError::PetNotFound)?;

        if pet.owner_id != client_id {
            return Err(AppointmentError::PetNotOwnedByClient);
        }
        Ok(pet)
    }

    /// Staff must be an active business member able to perform the service.
    async fn load_staff(&self, business_id: i64, staff_id: i64, service: Option<&Service>) -> Result<User, AppointmentError> {
        let staff = self
            .user_repo
            .find_by_id(staff_id)
            .await?
            .filter(|u| u.role.is_business_member() && u.is_active && u.belongs_to(business_id))
            .ok_or(AppointmentError::StaffNotFound)?;

        if let Some(service) = service {
            if !service.can_be_performed_by(staff.id) {
                return Err(AppointmentError::StaffNotAssigned);
            }
        }
        Ok(staff)
    }

    async fn cancellation_policy(&self, business_id: i64) -> Result<CancellationPolicy, AppointmentError> {
        Ok(self
            .business_repo
            .find_by_id(business_id)
            .await?
            .map(|b| b.settings)
            .unwrap_or_else(BusinessSettings::default)
            .cancellation_policy)
    }

    fn build_filter(actor: &Actor, query: &AppointmentQuery) -> Result<AppointmentFilter, AppError> {
        let status = match non_blank(query.status.as_deref()) {
            None | Some("all") => None,
            Some(raw) => Some(AppointmentStatus::parse(raw).ok_or_else(|| field_error("status", "Invalid status"))?),
        };

        let (date_from, date_to) = match non_blank(query.date.as_deref()) {
            Some(day) => {
                let day = parse_date("date", day)?;
                (Some(day), Some(day))
            }
            None => (
                non_blank(query.date_from.as_deref())
                    .map(|d| parse_date("date_from", d))
                    .transpose()?,
                non_blank(query.date_to.as_deref())
                    .map(|d| parse_date("date_to", d))
                    .transpose()?,
            ),
        };

        let client_id = if actor.role == Role::Client {
            Some(actor.user_id)
        } else {
            optional_id("client_id", query.client_id.as_deref())?
        };

        Ok(AppointmentFilter {
            business_id: actor.tenant_scope(),
            client_id,
            pet_id: optional_id("pet_id", query.pet_id.as_deref())?,
            staff_id: optional_id("staff_id", query.staff_id.as_deref())?,
            service_id: optional_id("service_id", query.service_id.as_deref())?,
            status,
            date_from,
            date_to,
            search: non_blank(query.search.as_deref()).map(String::from),
        })
    }
}

#[async_trait]
impl<A, U, P, S, B> AppointmentService for AppointmentServiceImpl<A, U, P, S, B>
where
    A: AppointmentRepository + 'static,
    U: UserRepository + 'static,
    P: PetRepository + 'static,
    S: ServiceRepository + 'static,
    B: BusinessRepository + 'static,
{
    async fn create(&self, actor: &Actor, request: CreateAppointmentRequest) -> Result<AppointmentDetails, AppointmentError> {
        let is_client = actor.role == Role::Client;

        // Report every missing selection at once, in form order.
        let mut missing = Vec::new();
        let mut require = |field: &str, value: Option<&str>, message: &str| {
            let value = non_blank(value).map(String::from);
            if value.is_none() {
                missing.push(FieldError {
                    field: field.to_string(),
                    message: message.to_string(),
                });
            }
            value
        };
        let client_raw = if is_client {
            Some(actor.user_id.to_string())
        } else {
            require("client_id", request.client_id.as_deref(), "Please select a client")
        };
        let pet_raw = require("pet_id", request.pet_id.as_deref(), "Please select a pet");
        let service_raw = require("service_id", request.service_id.as_deref(), "Please select a service");
        let date_raw = require("date", request.date.as_deref(), "Please select a date");
        let time_raw = require("time", request.time.as_deref(), "Please select a time");

        let (Some(client_raw), Some(pet_raw), Some(service_raw), Some(date_raw), Some(time_raw), true) =
            (client_raw, pet_raw, service_raw, date_raw, time_raw, missing.is_empty())
        else {
            return Err(AppError::InvalidFields(missing).into());
        };

        let client_id = optional_id("client_id", Some(client_raw.as_str()))?.ok_or(AppointmentError::ClientNotFound)?;
        let pet_id = optional_id("pet_id", Some(pet_raw.as_str()))?.ok_or(AppointmentError::PetNotFound)?;
        let service_id = optional_id("service_id", Some(service_raw.as_str()))?.ok_or(AppointmentError::ServiceNotFound)?;
        let staff_id = optional_id("staff_id", request.staff_id.as_deref())?;

        let now = Utc::now();
        let scheduled_at = schedule_from(&date_raw, &time_raw)?;
        if scheduled_at <= now {
            return Err(AppointmentError::InPast);
        }

        let service = self.load_service(actor, service_id).await?;
        let business_id = service.business_id;
        let client = self.load_client(business_id, client_id).await?;
        let pet = self.load_pet(client.id, pet_id).await?;

        service
            .requirements
            .check_pet(&pet, scheduled_at.date_naive())
            .map_err(AppointmentError::IneligiblePet)?;
        if service.requirements.vaccination_required
            && !self
                .pet_repo
                .has_current_vaccination(pet.id, scheduled_at.date_naive())
                .await?
        {
            return Err(AppointmentError::VaccinationRequired);
        }

        let variation = non_blank(request.variation.as_deref());
        let (quoted_price, quoted_duration) = service
            .quote(variation)
            .ok_or_else(|| field_error("variation", "Unknown price option for this service"))?;

        // Clients book at the listed price and duration.
        let (price, duration_minutes) = if is_client {
            (quoted_price, quoted_duration)
        } else {
            (
                request.price.unwrap_or(quoted_price),
                request.duration_minutes.unwrap_or(quoted_duration),
            )
        };

        let mut appointment = Appointment {
            id: self.id_generator.generate(),
            business_id,
            client_id: client.id,
            pet_id: pet.id,
            service_id: service.id,
            staff_id: None,
            scheduled_at,
            duration_minutes,
            status: AppointmentStatus::Scheduled,
            price,
            notes: non_blank(request.notes.as_deref()).map(String::from),
            created_at: now,
            updated_at: now,
            ..Default::default()
        };

        let staff = match staff_id {
            Some(staff_id) => {
                let staff = self.load_staff(business_id, staff_id, Some(&service)).await?;
                appointment.staff_id = Some(staff.id);
                Some(staff)
            }
            None => None,
        };

        let created = self
            .appointment_repo
            .create(&appointment)
            .await?
            .ok_or(AppointmentError::DoubleBooked)?;
        tracing::info!(
            appointment_id = created.id,
            business_id,
            client_id = created.client_id,
            scheduled_at = %created.scheduled_at,
            "Appointment booked"
        );

        Ok(AppointmentDetails {
            appointment: created,
            client_name: client.full_name(),
            pet_name: pet.name,
            service_name: service.name,
            staff_name: staff.map(|s| s.full_name()),
        })
    }

    async fn list(&self, actor: &Actor, query: AppointmentQuery) -> Result<Page<AppointmentDetails>, AppointmentError> {
        let filter = Self::build_filter(actor, &query)?;
        let page = PageRequest::new(query.page, query.limit);

        let (items, total) = self.appointment_repo.list(&filter, page).await?;
        Ok(Page::new(items, page, total))
    }

    async fn get(&self, actor: &Actor, id: i64) -> Result<AppointmentDetails, AppointmentError> {
        self.load_visible(actor, id).await?;
        self.details(id).await
    }

    async fn update(
        &self,
        actor: &Actor,
        id: i64,
        request: UpdateAppointmentRequest,
    ) -> Result<AppointmentDetails, AppointmentError> {
        let mut appointment = self.load_visible(actor, id).await?;
        if !AccessPolicy::can_edit_appointment(actor, &appointment) {
            return Err(AppointmentError::Forbidden);
        }
        if !appointment.status.is_editable() {
            return Err(AppointmentError::NotEditable);
        }

        if request.date.is_some() || request.time.is_some() {
            let date = request
                .date
                .clone()
                .unwrap_or_else(|| appointment.scheduled_at.format("%Y-%m-%d").to_string());
            let time = request.time.clone().unwrap_or_else(|| {
                format!("{:02}:{:02}", appointment.scheduled_at.hour(), appointment.scheduled_at.minute())
            });
            let scheduled_at = schedule_from(&date, &time)?;
            if scheduled_at != appointment.scheduled_at {
                if scheduled_at <= Utc::now() {
                    return Err(AppointmentError::InPast);
                }
                appointment.scheduled_at = scheduled_at;
            }
        }

        if let Some(duration) = request.duration_minutes {
            appointment.duration_minutes = duration;
        }

        if let Some(raw) = request.staff_id.as_deref() {
            let staff_id = optional_id("staff_id", Some(raw))?;
            if staff_id != appointment.staff_id {
                if let Some(staff_id) = staff_id {
                    let service = self.service_repo.find_by_id(appointment.service_id).await?;
                    self.load_staff(appointment.business_id, staff_id, service.as_ref())
                        .await?;
                }
                appointment.staff_id = staff_id;
            }
        }

        if let Some(price) = request.price {
            appointment.price = price;
        }
        if let Some(notes) = request.notes {
            appointment.notes = Some(notes).filter(|n| !n.trim().is_empty());
        }

        appointment.updated_at = Utc::now();
        self.appointment_repo
            .update(&appointment)
            .await?
            .ok_or(AppointmentError::DoubleBooked)?;
        tracing::info!(appointment_id = id, "Appointment updated");

        self.details(id).await
    }

    async fn delete(&self, actor: &Actor, id: i64) -> Result<(), AppointmentError> {
        let appointment = self.load_visible(actor, id).await?;
        if !AccessPolicy::can_manage_business(actor, appointment.business_id) {
            return Err(AppointmentError::Forbidden);
        }

        self.appointment_repo.delete(id).await?;
        tracing::info!(appointment_id = id, "Appointment deleted");
        Ok(())
    }

    async fn transition(
        &self,
        actor: &Actor,
        id: i64,
        action: StatusAction,
        reason: Option<String>,
    ) -> Result<(AppointmentDetails, AppointmentStatus), AppointmentError> {
        let mut appointment = self.load_visible(actor, id).await?;
        let now = Utc::now();

        let from = appointment.status;
        if from.apply(action).is_none() {
            return Err(AppointmentError::IllegalTransition { from, action });
        }

        let policy = if AccessPolicy::is_business_operator(actor, appointment.business_id) {
            BusinessSettings::default().cancellation_policy
        } else {
            self.cancellation_policy(appointment.business_id).await?
        };

        if !AccessPolicy::can_update_status(actor, &appointment, action, &policy, now) {
            let own_cancel = actor.role == Role::Client
                && appointment.client_id == actor.user_id
                && action == StatusAction::Cancel;
            return Err(if own_cancel {
                AppointmentError::CancellationWindow(policy.hours_before)
            } else {
                AppointmentError::Forbidden
            });
        }

        let to = appointment
            .transition(action, now)
            .ok_or(AppointmentError::IllegalTransition { from, action })?;

        if action == StatusAction::Cancel {
            appointment.cancellation_reason = reason.filter(|r| !r.trim().is_empty());
        }

        self.appointment_repo
            .save_transition(&appointment, from)
            .await?
            .ok_or(AppointmentError::ConcurrentUpdate)?;

        tracing::info!(
            appointment_id = id,
            from = from.as_str(),
            to = to.as_str(),
            actor_id = actor.user_id,
            "Appointment status changed"
        );

        Ok((self.details(id).await?, from))
    }

    async fn calendar(
        &self,
        actor: &Actor,
        year: i32,
        month: u32,
    ) -> Result<BTreeMap<String, Vec<AppointmentDetails>>, AppointmentError> {
        let (from, to) = calendar::month_bounds(year, month).ok_or_else(|| field_error("month", "Invalid month"))?;
        let client_id = (actor.role == Role::Client).then_some(actor.user_id);

        let appointments = self
            .appointment_repo
            .list_between(actor.tenant_scope(), client_id, from, to)
            .await?;

        Ok(calendar::group_by_day(appointments))
    }
}
