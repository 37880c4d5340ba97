//! Dashboard Service
//!
//! Headline numbers for the dashboard and the revenue summary.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, DateTime, Duration, Utc};

use crate::application::dto::response::{DashboardStatsResponse, RevenueSummary};
use crate::domain::services::{calendar, Actor};
use crate::domain::{AppointmentRepository, AppointmentStatus, PetRepository, Role, UserRepository};
use crate::shared::error::AppError;

#[async_trait]
pub trait DashboardService: Send + Sync {
    async fn stats(&self, actor: &Actor) -> Result<DashboardStatsResponse, AppError>;
}

pub struct DashboardServiceImpl<A, U, P>
where
    A: AppointmentRepository,
    U: UserRepository,
    P: PetRepository,
{
    appointment_repo: Arc<A>,
    user_repo: Arc<U>,
    pet_repo: Arc<P>,
}

impl<A, U, P> DashboardServiceImpl<A, U, P>
where
    A: AppointmentRepository,
    U: UserRepository,
    P: PetRepository,
{
    pub fn new(appointment_repo: Arc<A>, user_repo: Arc<U>, pet_repo: Arc<P>) -> Self {
        Self {
            appointment_repo,
            user_repo,
            pet_repo,
        }
    }
}

/// `[00:00 today, 00:00 tomorrow)` in UTC.
fn day_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now.date_naive().and_time(chrono::NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

#[async_trait]
impl<A, U, P> DashboardService for DashboardServiceImpl<A, U, P>
where
    A: AppointmentRepository + 'static,
    U: UserRepository + 'static,
    P: PetRepository + 'static,
{
    async fn stats(&self, actor: &Actor) -> Result<DashboardStatsResponse, AppError> {
        if actor.role == Role::Client {
            return Err(AppError::Forbidden("The dashboard is only available to business staff".into()));
        }

        let scope = actor.tenant_scope();
        let now = Utc::now();
        let (today_start, today_end) = day_bounds(now);
        let (month_start, month_end) = calendar::month_bounds(now.year(), now.month())
            .ok_or_else(|| AppError::Internal("Invalid current month".into()))?;

        let (today, upcoming, by_status, clients, pets, revenue_month, revenue_total) = futures::try_join!(
            self.appointment_repo.count_between(scope, today_start, today_end),
            self.appointment_repo.count_upcoming(scope, now),
            self.appointment_repo.status_counts(scope),
            self.user_repo.count_active(scope, Role::Client),
            self.pet_repo.count_active(scope),
            self.appointment_repo.revenue_between(scope, Some(month_start), Some(month_end)),
            self.appointment_repo.revenue_between(scope, None, None),
        )?;

        let mut appointments_by_status: BTreeMap<String, i64> = AppointmentStatus::ALL
            .iter()
            .map(|status| (status.as_str().to_string(), 0))
            .collect();
        for (status, count) in by_status {
            appointments_by_status.insert(status.as_str().to_string(), count);
        }

        Ok(DashboardStatsResponse {
            today_appointments: today,
            upcoming_appointments: upcoming,
            appointments_by_status,
            total_clients: clients,
            total_pets: pets,
            revenue: RevenueSummary {
                this_month: revenue_month,
                all_time: revenue_total,
            },
        })
    }
}
