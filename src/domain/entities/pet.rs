//! Pet entity, medical history and repository trait.
//!
//! Maps to the `pets` and `pet_medical_records` tables.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;
use crate::shared::pagination::PageRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    #[default]
    Dog,
    Cat,
    Bird,
    Rabbit,
    Reptile,
    Other,
}

impl Species {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dog" => Some(Self::Dog),
            "cat" => Some(Self::Cat),
            "bird" => Some(Self::Bird),
            "rabbit" => Some(Self::Rabbit),
            "reptile" => Some(Self::Reptile),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dog => "dog",
            Self::Cat => "cat",
            Self::Bird => "bird",
            Self::Rabbit => "rabbit",
            Self::Reptile => "reptile",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PetGender {
    Male,
    Female,
    #[default]
    Unknown,
}

impl PetGender {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "male" => Self::Male,
            "female" => Self::Female,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Unknown => "unknown",
        }
    }
}

/// Represents a pet owned by a client.
///
/// Maps to the `pets` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - business_id: BIGINT NOT NULL REFERENCES businesses(id)
/// - owner_id: BIGINT NOT NULL REFERENCES users(id)
/// - name: VARCHAR(50) NOT NULL
/// - species: VARCHAR(20) NOT NULL
/// - breed: VARCHAR(50) NULL
/// - date_of_birth: DATE NULL
/// - weight_kg: DOUBLE PRECISION NULL
/// - gender: VARCHAR(10) NOT NULL DEFAULT 'unknown'
/// - notes: TEXT NULL
/// - is_active: BOOLEAN NOT NULL DEFAULT TRUE
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pet {
    pub id: i64,
    pub business_id: i64,
    pub owner_id: i64,
    pub name: String,
    pub species: Species,
    pub breed: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub weight_kg: Option<f64>,
    pub gender: PetGender,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pet {
    /// Age in whole months at `today`, if the birth date is known.
    pub fn age_in_months(&self, today: NaiveDate) -> Option<i32> {
        let dob = self.date_of_birth?;
        if dob > today {
            return Some(0);
        }
        let mut months = (today.year() - dob.year()) * 12 + today.month() as i32 - dob.month() as i32;
        if today.day() < dob.day() {
            months -= 1;
        }
        Some(months.max(0))
    }
}

impl Default for Pet {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            business_id: 0,
            owner_id: 0,
            name: String::new(),
            species: Species::default(),
            breed: None,
            date_of_birth: None,
            weight_kg: None,
            gender: PetGender::default(),
            notes: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Vaccination,
    Checkup,
    Treatment,
    Surgery,
    Allergy,
    Medication,
}

impl RecordType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "vaccination" => Some(Self::Vaccination),
            "checkup" => Some(Self::Checkup),
            "treatment" => Some(Self::Treatment),
            "surgery" => Some(Self::Surgery),
            "allergy" => Some(Self::Allergy),
            "medication" => Some(Self::Medication),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vaccination => "vaccination",
            Self::Checkup => "checkup",
            Self::Treatment => "treatment",
            Self::Surgery => "surgery",
            Self::Allergy => "allergy",
            Self::Medication => "medication",
        }
    }
}

/// One entry of a pet's medical history (`pet_medical_records` table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub id: i64,
    pub pet_id: i64,
    pub record_type: RecordType,
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub veterinarian: Option<String>,
    pub next_due_date: Option<NaiveDate>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
}

/// Filter for listing pets.
#[derive(Debug, Clone, Default)]
pub struct PetFilter {
    pub business_id: Option<i64>,
    pub owner_id: Option<i64>,
    pub species: Option<Species>,
    pub include_inactive: bool,
    /// Case-insensitive match on pet name or breed
    pub search: Option<String>,
}

/// Repository trait for Pet data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PetRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Pet>, AppError>;

    async fn find_by_owner(&self, owner_id: i64) -> Result<Vec<Pet>, AppError>;

    async fn list(&self, filter: &PetFilter, page: PageRequest) -> Result<(Vec<Pet>, i64), AppError>;

    async fn create(&self, pet: &Pet) -> Result<Pet, AppError>;

    async fn update(&self, pet: &Pet) -> Result<Pet, AppError>;

    /// Soft delete (is_active = false).
    async fn deactivate(&self, id: i64) -> Result<(), AppError>;

    async fn count_active(&self, business_id: Option<i64>) -> Result<i64, AppError>;

    async fn add_medical_record(&self, record: &MedicalRecord) -> Result<MedicalRecord, AppError>;

    /// Medical history, most recent first.
    async fn list_medical_records(&self, pet_id: i64) -> Result<Vec<MedicalRecord>, AppError>;

    /// Whether the pet has a vaccination record not past its due date.
    async fn has_current_vaccination(&self, pet_id: i64, on: NaiveDate) -> Result<bool, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_age_in_months() {
        let pet = Pet {
            date_of_birth: Some(date(2023, 3, 15)),
            ..Default::default()
        };

        assert_eq!(pet.age_in_months(date(2024, 3, 15)), Some(12));
        assert_eq!(pet.age_in_months(date(2024, 3, 14)), Some(11));
        assert_eq!(pet.age_in_months(date(2023, 3, 20)), Some(0));
    }

    #[test]
    fn test_age_unknown_without_birth_date() {
        assert_eq!(Pet::default().age_in_months(date(2024, 1, 1)), None);
    }

    #[test]
    fn test_future_birth_date_is_zero_months() {
        let pet = Pet {
            date_of_birth: Some(date(2030, 1, 1)),
            ..Default::default()
        };
        assert_eq!(pet.age_in_months(date(2024, 1, 1)), Some(0));
    }

    #[test]
    fn test_species_parse() {
        assert_eq!(Species::parse("CAT"), Some(Species::Cat));
        assert_eq!(Species::parse("other"), Some(Species::Other));
        assert_eq!(Species::parse("ferret"), None);
    }

    #[test]
    fn test_record_type_parse() {
        assert_eq!(RecordType::parse("surgery"), Some(RecordType::Surgery));
        assert_eq!(RecordType::parse("grooming"), None);
    }
}
