//! Business (tenant) entity and repository trait.
//!
//! Maps to the `businesses` table. Every client, pet, service and
//! appointment belongs to exactly one business.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::{Address, User};
use crate::shared::error::AppError;
use crate::shared::pagination::PageRequest;

/// Subscription tier of a business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPlan {
    #[default]
    Free,
    Basic,
    Premium,
    Enterprise,
}

impl SubscriptionPlan {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Self::Basic,
            "premium" => Self::Premium,
            "enterprise" => Self::Enterprise,
            _ => Self::Free,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Basic => "basic",
            Self::Premium => "premium",
            Self::Enterprise => "enterprise",
        }
    }
}

/// Opening hours for one weekday (0 = Sunday).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingDay {
    pub day: u8,
    pub open: String,
    pub close: String,
    #[serde(default)]
    pub is_closed: bool,
}

/// Default week: Monday to Friday 09:00-17:00, Saturday 09:00-13:00.
pub fn default_working_hours() -> Vec<WorkingDay> {
    (0..7)
        .map(|day| WorkingDay {
            day,
            open: "09:00".into(),
            close: if day == 6 { "13:00".into() } else { "17:00".into() },
            is_closed: day == 0,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancellationPolicy {
    /// Clients may cancel up to this many hours before the appointment
    pub hours_before: i64,
    /// Fee charged for late cancellations
    pub fee: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderSettings {
    pub enabled: bool,
    pub hours_before: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Online,
}

/// Per-business settings, stored as JSONB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessSettings {
    pub cancellation_policy: CancellationPolicy,
    pub reminders: ReminderSettings,
    pub payment_methods: Vec<PaymentMethod>,
}

impl Default for BusinessSettings {
    fn default() -> Self {
        Self {
            cancellation_policy: CancellationPolicy {
                hours_before: 24,
                fee: 0.0,
            },
            reminders: ReminderSettings {
                enabled: true,
                hours_before: 24,
            },
            payment_methods: vec![PaymentMethod::Cash, PaymentMethod::Card],
        }
    }
}

/// Represents a pet-care business.
///
/// Maps to the `businesses` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - owner_id: BIGINT NOT NULL REFERENCES users(id)
/// - name: VARCHAR(100) NOT NULL
/// - email / phone: VARCHAR NULL
/// - address, working_hours, settings: JSONB
/// - subscription_plan: VARCHAR(20) DEFAULT 'free'
/// - is_active: BOOLEAN DEFAULT TRUE
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Address,
    pub working_hours: Vec<WorkingDay>,
    pub settings: BusinessSettings,
    pub subscription_plan: SubscriptionPlan,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Business {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            owner_id: 0,
            name: String::new(),
            email: None,
            phone: None,
            address: Address::default(),
            working_hours: default_working_hours(),
            settings: BusinessSettings::default(),
            subscription_plan: SubscriptionPlan::default(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Repository trait for Business data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BusinessRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Business>, AppError>;

    /// Insert the owner account and its business atomically.
    async fn create_with_owner(&self, business: &Business, owner: &User) -> Result<(Business, User), AppError>;

    /// Update profile, working hours, settings and plan.
    async fn update(&self, business: &Business) -> Result<Business, AppError>;

    async fn list(&self, page: PageRequest) -> Result<(Vec<Business>, i64), AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_working_hours_cover_week() {
        let hours = default_working_hours();
        assert_eq!(hours.len(), 7);
        assert!(hours[0].is_closed);
        assert_eq!(hours[6].close, "13:00");
        assert!(hours.iter().enumerate().all(|(i, d)| d.day as usize == i));
    }

    #[test]
    fn test_settings_json_shape() {
        let json = serde_json::to_value(BusinessSettings::default()).unwrap();
        assert_eq!(json["cancellation_policy"]["hours_before"], 24);
        assert_eq!(json["payment_methods"][0], "cash");
    }

    #[test]
    fn test_subscription_plan_parse_falls_back_to_free() {
        assert_eq!(SubscriptionPlan::parse("PREMIUM"), SubscriptionPlan::Premium);
        assert_eq!(SubscriptionPlan::parse("gold"), SubscriptionPlan::Free);
    }
}
