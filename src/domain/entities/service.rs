//! Service (catalog offering) entity and repository trait.
//!
//! Maps to the `services` table: what a business sells, how much it costs,
//! how long it takes and who may book it.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::pet::{Pet, Species};
use crate::shared::error::AppError;
use crate::shared::pagination::PageRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServiceCategory {
    Grooming,
    Boarding,
    Daycare,
    Training,
    Veterinary,
    Walking,
    #[default]
    Other,
}

impl ServiceCategory {
    pub const ALL: [ServiceCategory; 7] = [
        Self::Grooming,
        Self::Boarding,
        Self::Daycare,
        Self::Training,
        Self::Veterinary,
        Self::Walking,
        Self::Other,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "grooming" => Some(Self::Grooming),
            "boarding" => Some(Self::Boarding),
            "daycare" => Some(Self::Daycare),
            "training" => Some(Self::Training),
            "veterinary" => Some(Self::Veterinary),
            "walking" => Some(Self::Walking),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grooming => "grooming",
            Self::Boarding => "boarding",
            Self::Daycare => "daycare",
            Self::Training => "training",
            Self::Veterinary => "veterinary",
            Self::Walking => "walking",
            Self::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Grooming => "Grooming",
            Self::Boarding => "Boarding",
            Self::Daycare => "Daycare",
            Self::Training => "Training",
            Self::Veterinary => "Veterinary",
            Self::Walking => "Walking",
            Self::Other => "Other",
        }
    }
}

/// A priced variant of a service (e.g. "Large dog").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceVariation {
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub duration_minutes: Option<i32>,
}

/// Pet eligibility rules, stored as JSONB.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRequirements {
    #[serde(default)]
    pub vaccination_required: bool,
    #[serde(default)]
    pub min_age_months: Option<i32>,
    #[serde(default)]
    pub max_age_months: Option<i32>,
    /// Empty means every species
    #[serde(default)]
    pub species: Vec<Species>,
}

impl ServiceRequirements {
    /// Check species and age rules for a pet. Vaccination needs a record
    /// lookup and is checked by the caller.
    pub fn check_pet(&self, pet: &Pet, today: NaiveDate) -> Result<(), String> {
        if !self.species.is_empty() && !self.species.contains(&pet.species) {
            return Err(format!("This service is not available for {}s", pet.species.as_str()));
        }

        if self.min_age_months.is_some() || self.max_age_months.is_some() {
            let age = pet
                .age_in_months(today)
                .ok_or_else(|| "This service requires the pet's date of birth".to_string())?;
            if let Some(min) = self.min_age_months {
                if age < min {
                    return Err(format!("Pet must be at least {} months old", min));
                }
            }
            if let Some(max) = self.max_age_months {
                if age > max {
                    return Err(format!("Pet must be at most {} months old", max));
                }
            }
        }

        Ok(())
    }
}

/// Represents a bookable service.
///
/// Maps to the `services` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - business_id: BIGINT NOT NULL REFERENCES businesses(id)
/// - name: VARCHAR(100) NOT NULL
/// - description: TEXT NULL
/// - category: VARCHAR(20) NOT NULL
/// - base_price: DOUBLE PRECISION NOT NULL
/// - variations, requirements: JSONB
/// - duration_minutes: INTEGER NOT NULL
/// - staff_ids: BIGINT[] NOT NULL DEFAULT '{}'
/// - is_active: BOOLEAN NOT NULL DEFAULT TRUE
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: i64,
    pub business_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category: ServiceCategory,
    pub base_price: f64,
    pub variations: Vec<PriceVariation>,
    pub duration_minutes: i32,
    pub requirements: ServiceRequirements,
    pub staff_ids: Vec<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Service {
    /// Price and duration for an optional variation name.
    pub fn quote(&self, variation: Option<&str>) -> Option<(f64, i32)> {
        match variation {
            None => Some((self.base_price, self.duration_minutes)),
            Some(name) => self
                .variations
                .iter()
                .find(|v| v.name.eq_ignore_ascii_case(name))
                .map(|v| (v.price, v.duration_minutes.unwrap_or(self.duration_minutes))),
        }
    }

    /// Whether a staff member is assigned. No assignment means anyone may perform it.
    pub fn can_be_performed_by(&self, staff_id: i64) -> bool {
        self.staff_ids.is_empty() || self.staff_ids.contains(&staff_id)
    }
}

impl Default for Service {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            business_id: 0,
            name: String::new(),
            description: None,
            category: ServiceCategory::default(),
            base_price: 0.0,
            variations: Vec::new(),
            duration_minutes: 60,
            requirements: ServiceRequirements::default(),
            staff_ids: Vec::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Filter for listing services.
#[derive(Debug, Clone, Default)]
pub struct ServiceFilter {
    pub business_id: Option<i64>,
    pub category: Option<ServiceCategory>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

/// Aggregate numbers for the services screen.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServiceStats {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
    pub average_price: f64,
}

/// A service with how often it was booked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceBookingCount {
    pub service_id: i64,
    pub name: String,
    pub bookings: i64,
}

/// Repository trait for Service data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ServiceRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Service>, AppError>;

    async fn list(&self, filter: &ServiceFilter, page: PageRequest) -> Result<(Vec<Service>, i64), AppError>;

    async fn create(&self, service: &Service) -> Result<Service, AppError>;

    async fn update(&self, service: &Service) -> Result<Service, AppError>;

    /// Soft delete (is_active = false).
    async fn deactivate(&self, id: i64) -> Result<(), AppError>;

    /// Active service count per category (categories without services omitted).
    async fn category_counts(&self, business_id: Option<i64>) -> Result<Vec<(ServiceCategory, i64)>, AppError>;

    async fn stats(&self, business_id: Option<i64>) -> Result<ServiceStats, AppError>;

    /// Most booked services, excluding cancelled appointments.
    async fn top_booked(&self, business_id: Option<i64>, limit: i64) -> Result<Vec<ServiceBookingCount>, AppError>;
}
