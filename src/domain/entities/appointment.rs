//! Appointment entity and repository trait.
//!
//! Maps to the `appointments` table. Status changes go through
//! [`AppointmentStatus::apply`] and are persisted with a compare-and-set
//! update so two concurrent transitions cannot both win.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{AppointmentStatus, StatusAction};
use crate::shared::error::AppError;
use crate::shared::pagination::PageRequest;

/// Represents a booked visit.
///
/// Maps to the `appointments` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - business_id / client_id / pet_id / service_id: BIGINT NOT NULL
/// - staff_id: BIGINT NULL REFERENCES users(id)
/// - scheduled_at: TIMESTAMPTZ NOT NULL
/// - duration_minutes: INTEGER NOT NULL
/// - status: VARCHAR(20) NOT NULL DEFAULT 'scheduled'
/// - price: DOUBLE PRECISION NOT NULL
/// - notes / cancellation_reason: TEXT NULL
/// - checked_in_at / started_at / completed_at / cancelled_at: TIMESTAMPTZ NULL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub business_id: i64,
    pub client_id: i64,
    pub pet_id: i64,
    pub service_id: i64,
    pub staff_id: Option<i64>,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub price: f64,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.scheduled_at + Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Move to the next status and stamp the matching timestamp.
    ///
    /// Returns `None` when the action is not allowed from the current status;
    /// the appointment is left untouched in that case.
    pub fn transition(&mut self, action: StatusAction, now: DateTime<Utc>) -> Option<AppointmentStatus> {
        let next = self.status.apply(action)?;

        match action {
            StatusAction::CheckIn => self.checked_in_at = Some(now),
            StatusAction::Start => self.started_at = Some(now),
            StatusAction::Complete => self.completed_at = Some(now),
            StatusAction::Cancel => self.cancelled_at = Some(now),
            StatusAction::Confirm | StatusAction::NoShow => {}
        }

        self.status = next;
        self.updated_at = now;
        Some(next)
    }

    /// Whole hours until the appointment starts (negative once it has begun).
    pub fn hours_until_start(&self, now: DateTime<Utc>) -> i64 {
        (self.scheduled_at - now).num_hours()
    }
}

impl Default for Appointment {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            business_id: 0,
            client_id: 0,
            pet_id: 0,
            service_id: 0,
            staff_id: None,
            scheduled_at: now,
            duration_minutes: 60,
            status: AppointmentStatus::default(),
            price: 0.0,
            notes: None,
            cancellation_reason: None,
            checked_in_at: None,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// An appointment joined with the names the list and calendar views show.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentDetails {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub client_name: String,
    pub pet_name: String,
    pub service_name: String,
    pub staff_name: Option<String>,
}

/// Filter for listing appointments. Dates are UTC calendar days.
#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub business_id: Option<i64>,
    pub client_id: Option<i64>,
    pub pet_id: Option<i64>,
    pub staff_id: Option<i64>,
    pub service_id: Option<i64>,
    pub status: Option<AppointmentStatus>,
    pub date_from: Option<NaiveDate>,
    /// Inclusive
    pub date_to: Option<NaiveDate>,
    /// Case-insensitive match on pet or client name
    pub search: Option<String>,
}

/// Repository trait for Appointment data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Appointment>, AppError>;

    async fn find_details(&self, id: i64) -> Result<Option<AppointmentDetails>, AppError>;

    /// Filtered page, ordered by scheduled_at descending.
    async fn list(&self, filter: &AppointmentFilter, page: PageRequest) -> Result<(Vec<AppointmentDetails>, i64), AppError>;

    /// Everything in `[from, to)`, ordered by scheduled_at ascending.
    async fn list_between(
        &self,
        business_id: Option<i64>,
        client_id: Option<i64>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AppointmentDetails>, AppError>;

    /// Insert the appointment. Returns `None` when its staff member already has
    /// a slot-blocking appointment overlapping it; the check and the insert
    /// hold a per-staff lock.
    async fn create(&self, appointment: &Appointment) -> Result<Option<Appointment>, AppError>;

    /// Update schedule, staff, notes and price under the same staff guard as
    /// `create`.
    async fn update(&self, appointment: &Appointment) -> Result<Option<Appointment>, AppError>;

    /// Persist a status change only if the stored status is still `expected`.
    /// Returns `None` when another request changed it first.
    async fn save_transition(
        &self,
        appointment: &Appointment,
        expected: AppointmentStatus,
    ) -> Result<Option<Appointment>, AppError>;

    async fn delete(&self, id: i64) -> Result<(), AppError>;

    async fn status_counts(&self, business_id: Option<i64>) -> Result<Vec<(AppointmentStatus, i64)>, AppError>;

    /// Appointments (any status except cancelled) starting in `[from, to)`.
    async fn count_between(&self, business_id: Option<i64>, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<i64, AppError>;

    /// Scheduled or confirmed appointments starting after `now`.
    async fn count_upcoming(&self, business_id: Option<i64>, now: DateTime<Utc>) -> Result<i64, AppError>;

    /// Sum of completed appointment prices, optionally bounded by completion time.
    async fn revenue_between(
        &self,
        business_id: Option<i64>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<f64, AppError>;
}
