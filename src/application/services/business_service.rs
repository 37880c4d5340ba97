//! Business Service
//!
//! The caller's own business: profile, settings and working hours. Super
//! admins can list every tenant.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::application::dto::request::{
    PageQuery, UpdateBusinessRequest, UpdateSettingsRequest, UpdateWorkingHoursRequest,
};
use crate::domain::services::{AccessPolicy, Actor};
use crate::domain::{Business, BusinessRepository, CancellationPolicy, WorkingDay};
use crate::shared::error::AppError;
use crate::shared::pagination::{Page, PageRequest};
use crate::shared::validation::{field_error, parse_clock_minutes};

#[async_trait]
pub trait BusinessService: Send + Sync {
    async fn get_current(&self, actor: &Actor) -> Result<Business, BusinessError>;

    async fn update_profile(&self, actor: &Actor, request: UpdateBusinessRequest) -> Result<Business, BusinessError>;

    async fn update_settings(&self, actor: &Actor, request: UpdateSettingsRequest) -> Result<Business, BusinessError>;

    async fn update_working_hours(
        &self,
        actor: &Actor,
        request: UpdateWorkingHoursRequest,
    ) -> Result<Business, BusinessError>;

    /// Every tenant, for super admins.
    async fn list(&self, actor: &Actor, query: PageQuery) -> Result<Page<Business>, BusinessError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BusinessError {
    #[error("Business not found")]
    NotFound,

    #[error("Only business admins can change business settings")]
    Forbidden,

    #[error("Only super admins can list businesses")]
    SuperAdminOnly,

    #[error(transparent)]
    App(#[from] AppError),
}

impl From<BusinessError> for AppError {
    fn from(err: BusinessError) -> Self {
        match err {
            BusinessError::NotFound => AppError::NotFound(err.to_string()),
            BusinessError::Forbidden | BusinessError::SuperAdminOnly => AppError::Forbidden(err.to_string()),
            BusinessError::App(e) => e,
        }
    }
}

/// Exactly one entry per weekday, each open before it closes.
pub fn validate_working_hours(days: &[WorkingDay]) -> Result<(), AppError> {
    if days.len() != 7 {
        return Err(field_error("working_hours", "Working hours must list all 7 days"));
    }

    let mut seen = [false; 7];
    for day in days {
        let index = usize::from(day.day);
        if index > 6 {
            return Err(field_error("working_hours", format!("Invalid day {}", day.day)));
        }
        if seen[index] {
            return Err(field_error("working_hours", format!("Day {} is listed twice", day.day)));
        }
        seen[index] = true;

        if day.is_closed {
            continue;
        }
        let (Some(open), Some(close)) = (parse_clock_minutes(&day.open), parse_clock_minutes(&day.close)) else {
            return Err(field_error("working_hours", "Times must be in HH:MM format"));
        };
        if open >= close {
            return Err(field_error(
                "working_hours",
                format!("Opening time must be before closing time on day {}", day.day),
            ));
        }
    }
    Ok(())
}

pub struct BusinessServiceImpl<B: BusinessRepository> {
    business_repo: Arc<B>,
}

impl<B: BusinessRepository> BusinessServiceImpl<B> {
    pub fn new(business_repo: Arc<B>) -> Self {
        Self { business_repo }
    }

    async fn current(&self, actor: &Actor) -> Result<Business, BusinessError> {
        let business_id = actor.business_id.ok_or(BusinessError::NotFound)?;
        self.business_repo
            .find_by_id(business_id)
            .await?
            .ok_or(BusinessError::NotFound)
    }

    async fn managed(&self, actor: &Actor) -> Result<Business, BusinessError> {
        let business = self.current(actor).await?;
        if !AccessPolicy::can_manage_business(actor, business.id) {
            return Err(BusinessError::Forbidden);
        }
        Ok(business)
    }

    async fn save(&self, mut business: Business, what: &str) -> Result<Business, BusinessError> {
        business.updated_at = Utc::now();
        let business = self.business_repo.update(&business).await?;
        tracing::info!(business_id = business.id, change = what, "Business updated");
        Ok(business)
    }
}

#[async_trait]
impl<B: BusinessRepository + 'static> BusinessService for BusinessServiceImpl<B> {
    async fn get_current(&self, actor: &Actor) -> Result<Business, BusinessError> {
        self.current(actor).await
    }

    async fn update_profile(&self, actor: &Actor, request: UpdateBusinessRequest) -> Result<Business, BusinessError> {
        let mut business = self.managed(actor).await?;

        if let Some(name) = request.name {
            business.name = name.trim().to_string();
        }
        if let Some(email) = request.email {
            business.email = Some(email.trim().to_lowercase()).filter(|e| !e.is_empty());
        }
        if let Some(phone) = request.phone {
            business.phone = Some(phone).filter(|p| !p.trim().is_empty());
        }
        if let Some(address) = request.address {
            business.address = address;
        }

        self.save(business, "profile").await
    }

    async fn update_settings(&self, actor: &Actor, request: UpdateSettingsRequest) -> Result<Business, BusinessError> {
        let mut business = self.managed(actor).await?;

        if let Some(policy) = request.cancellation_policy {
            business.settings.cancellation_policy = CancellationPolicy {
                hours_before: policy.hours_before,
                fee: policy.fee,
            };
        }
        if let Some(reminders) = request.reminders {
            if reminders.hours_before < 0 {
                return Err(field_error("reminders.hours_before", "Reminder time cannot be negative").into());
            }
            business.settings.reminders = reminders;
        }
        if let Some(mut methods) = request.payment_methods {
            if methods.is_empty() {
                return Err(field_error("payment_methods", "Select at least one payment method").into());
            }
            let mut unique = Vec::with_capacity(methods.len());
            for method in methods.drain(..) {
                if !unique.contains(&method) {
                    unique.push(method);
                }
            }
            business.settings.payment_methods = unique;
        }

        self.save(business, "settings").await
    }

    async fn update_working_hours(
        &self,
        actor: &Actor,
        request: UpdateWorkingHoursRequest,
    ) -> Result<Business, BusinessError> {
        let mut business = self.managed(actor).await?;
        validate_working_hours(&request.working_hours)?;

        let mut days = request.working_hours;
        days.sort_by_key(|d| d.day);
        business.working_hours = days;

        self.save(business, "working_hours").await
    }

    async fn list(&self, actor: &Actor, query: PageQuery) -> Result<Page<Business>, BusinessError> {
        if !actor.is_super_admin() {
            return Err(BusinessError::SuperAdminOnly);
        }

        let page = PageRequest::new(query.page, query.limit);
        let (businesses, total) = self.business_repo.list(page).await?;
        Ok(Page::new(businesses, page, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dto::request::CancellationPolicyInput;
    use crate::domain::{default_working_hours, MockBusinessRepository, PaymentMethod, Role};
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    const BIZ: i64 = 100;

    fn admin() -> Actor {
        Actor::new(1, Role::BusinessAdmin, Some(BIZ))
    }

    fn repo_with_business() -> MockBusinessRepository {
        let mut repo = MockBusinessRepository::new();
        repo.expect_find_by_id().returning(|id| {
            Ok(Some(Business {
                id,
                owner_id: 1,
                name: "Happy Paws".into(),
                ..Default::default()
            }))
        });
        repo
    }

    fn day(day: u8, open: &str, close: &str) -> WorkingDay {
        WorkingDay {
            day,
            open: open.into(),
            close: close.into(),
            is_closed: false,
        }
    }

    #[test]
    fn test_default_week_is_valid() {
        assert!(validate_working_hours(&default_working_hours()).is_ok());
    }

    #[test_case(6 ; "missing a day")]
    #[test_case(8 ; "extra day")]
    fn test_week_must_have_seven_entries(len: usize) {
        let days: Vec<_> = (0..len).map(|d| day((d % 7) as u8, "09:00", "17:00")).collect();
        assert!(validate_working_hours(&days).is_err());
    }

    #[test]
    fn test_duplicate_day_rejected() {
        let mut days = default_working_hours();
        days[6].day = 0;
        assert!(validate_working_hours(&days).is_err());
    }

    #[test]
    fn test_open_must_precede_close() {
        let mut days = default_working_hours();
        days[1] = day(1, "17:00", "09:00");

        match validate_working_hours(&days).unwrap_err() {
            AppError::InvalidFields(errors) => {
                assert_eq!(errors[0].message, "Opening time must be before closing time on day 1")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_closed_day_ignores_times() {
        let mut days = default_working_hours();
        days[0] = WorkingDay {
            day: 0,
            open: "".into(),
            close: "".into(),
            is_closed: true,
        };
        assert!(validate_working_hours(&days).is_ok());
    }

    #[tokio::test]
    async fn test_working_hours_saved_in_day_order() {
        let mut repo = repo_with_business();
        repo.expect_update()
            .withf(|b| b.working_hours.iter().map(|d| d.day).collect::<Vec<_>>() == vec![0, 1, 2, 3, 4, 5, 6])
            .returning(|b| Ok(b.clone()));
        let svc = BusinessServiceImpl::new(Arc::new(repo));

        let mut days = default_working_hours();
        days.reverse();
        svc.update_working_hours(&admin(), UpdateWorkingHoursRequest { working_hours: days })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_staff_cannot_change_settings() {
        let mut repo = repo_with_business();
        repo.expect_update().never();
        let svc = BusinessServiceImpl::new(Arc::new(repo));

        let staff = Actor::new(2, Role::Staff, Some(BIZ));
        let err = svc
            .update_settings(&staff, UpdateSettingsRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BusinessError::Forbidden));
    }

    #[tokio::test]
    async fn test_settings_update_replaces_policy_and_dedupes_methods() {
        let mut repo = repo_with_business();
        repo.expect_update().returning(|b| Ok(b.clone()));
        let svc = BusinessServiceImpl::new(Arc::new(repo));

        let request = UpdateSettingsRequest {
            cancellation_policy: Some(CancellationPolicyInput {
                hours_before: 48,
                fee: 15.0,
            }),
            reminders: None,
            payment_methods: Some(vec![PaymentMethod::Card, PaymentMethod::Card, PaymentMethod::Online]),
        };

        let business = svc.update_settings(&admin(), request).await.unwrap();
        assert_eq!(business.settings.cancellation_policy.hours_before, 48);
        assert_eq!(
            business.settings.payment_methods,
            vec![PaymentMethod::Card, PaymentMethod::Online]
        );
    }

    #[tokio::test]
    async fn test_list_is_super_admin_only() {
        let svc = BusinessServiceImpl::new(Arc::new(MockBusinessRepository::new()));
        assert!(matches!(
            svc.list(&admin(), PageQuery::default()).await,
            Err(BusinessError::SuperAdminOnly)
        ));
    }
}
