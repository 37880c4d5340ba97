//! Request DTOs
//!
//! Data structures for API request bodies and query strings. Ids travel as
//! strings and are parsed by the services so a bad id is reported against
//! its field.

use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::domain::entities::{
    Address, PaymentMethod, PriceVariation, ReminderSettings, ServiceRequirements, WorkingDay,
};
use crate::shared::validation::validate_clock_time;

fn validate_otp_code(code: &str) -> Result<(), ValidationError> {
    if code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("otp_code").with_message("Code must be 6 digits".into()))
    }
}

fn validate_date(value: &str) -> Result<(), ValidationError> {
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| ValidationError::new("date").with_message("Date must be in YYYY-MM-DD format".into()))
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Registration request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 50, message = "First name is required"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 50, message = "Last name is required"))]
    pub last_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(max = 30, message = "Phone must be at most 30 characters"))]
    pub phone: Option<String>,

    /// `client` (default) or `business_admin`
    pub role: Option<String>,

    #[validate(length(min = 2, max = 100, message = "Business name must be 2-100 characters"))]
    pub business_name: Option<String>,

    pub business_id: Option<String>,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Profile update request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 50, message = "First name must be 1-50 characters"))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 50, message = "Last name must be 1-50 characters"))]
    pub last_name: Option<String>,

    #[validate(length(max = 30, message = "Phone must be at most 30 characters"))]
    pub phone: Option<String>,

    pub address: Option<Address>,
}

/// Password change request
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

// ---------------------------------------------------------------------------
// OTP
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct SendOtpRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// `login`, `password_reset` or `email_verification`
    pub purpose: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(custom(function = "validate_otp_code"))]
    pub code: String,

    pub purpose: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(custom(function = "validate_otp_code"))]
    pub code: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

// ---------------------------------------------------------------------------
// Appointments
// ---------------------------------------------------------------------------

/// Flat appointment form payload. Required fields are checked by the
/// service so each missing selection gets its own message.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateAppointmentRequest {
    pub client_id: Option<String>,
    pub pet_id: Option<String>,
    pub service_id: Option<String>,
    pub staff_id: Option<String>,

    /// `YYYY-MM-DD`, UTC
    pub date: Option<String>,

    /// `HH:MM`, UTC
    pub time: Option<String>,

    /// Name of a service price variation
    pub variation: Option<String>,

    #[validate(range(min = 5, max = 1440, message = "Duration must be 5-1440 minutes"))]
    pub duration_minutes: Option<i32>,

    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: Option<f64>,

    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateAppointmentRequest {
    #[validate(custom(function = "validate_date"))]
    pub date: Option<String>,

    #[validate(custom(function = "validate_clock_time"))]
    pub time: Option<String>,

    /// Empty string unassigns
    pub staff_id: Option<String>,

    #[validate(range(min = 5, max = 1440, message = "Duration must be 5-1440 minutes"))]
    pub duration_minutes: Option<i32>,

    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: Option<f64>,

    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CancelAppointmentRequest {
    #[validate(length(max = 500, message = "Reason must be at most 500 characters"))]
    pub reason: Option<String>,
}

/// Appointment list query string
#[derive(Debug, Default, Deserialize)]
pub struct AppointmentQuery {
    pub status: Option<String>,
    /// Single day, `YYYY-MM-DD`
    pub date: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub client_id: Option<String>,
    pub pet_id: Option<String>,
    pub staff_id: Option<String>,
    pub service_id: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub year: i32,
    pub month: u32,
}

// ---------------------------------------------------------------------------
// Clients & pets
// ---------------------------------------------------------------------------

/// Client wizard step 1
#[derive(Debug, Deserialize, Validate)]
pub struct ClientProfileInput {
    #[validate(length(min = 1, max = 50, message = "First name is required"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 50, message = "Last name is required"))]
    pub last_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(max = 30, message = "Phone must be at most 30 characters"))]
    pub phone: Option<String>,

    /// Random when omitted; the client can reset it through OTP
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
}

/// Client wizard payload: profile, address, pets
#[derive(Debug, Deserialize, Validate)]
pub struct CreateClientRequest {
    #[validate(nested)]
    pub profile: ClientProfileInput,

    #[serde(default)]
    pub address: Address,

    #[serde(default)]
    #[validate(nested)]
    pub pets: Vec<PetInput>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateClientRequest {
    #[validate(length(min = 1, max = 50, message = "First name must be 1-50 characters"))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 50, message = "Last name must be 1-50 characters"))]
    pub last_name: Option<String>,

    #[validate(length(max = 30, message = "Phone must be at most 30 characters"))]
    pub phone: Option<String>,

    pub address: Option<Address>,
    pub is_active: Option<bool>,
}

/// Shared list query for clients and staff
#[derive(Debug, Default, Deserialize)]
pub struct PeopleQuery {
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Pet fields, used by the client wizard and `POST /pets`
#[derive(Debug, Default, Deserialize, Validate)]
pub struct PetInput {
    #[validate(length(min = 1, max = 50, message = "Pet name is required"))]
    pub name: String,

    pub species: Option<String>,

    #[validate(length(max = 50, message = "Breed must be at most 50 characters"))]
    pub breed: Option<String>,

    #[validate(custom(function = "validate_date"))]
    pub date_of_birth: Option<String>,

    #[validate(range(min = 0.0, max = 500.0, message = "Weight must be 0-500 kg"))]
    pub weight_kg: Option<f64>,

    pub gender: Option<String>,

    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePetRequest {
    /// Required for staff and admins; clients always own their pets
    pub owner_id: Option<String>,

    #[serde(flatten)]
    #[validate(nested)]
    pub pet: PetInput,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdatePetRequest {
    #[validate(length(min = 1, max = 50, message = "Pet name must be 1-50 characters"))]
    pub name: Option<String>,

    pub species: Option<String>,

    #[validate(length(max = 50, message = "Breed must be at most 50 characters"))]
    pub breed: Option<String>,

    #[validate(custom(function = "validate_date"))]
    pub date_of_birth: Option<String>,

    #[validate(range(min = 0.0, max = 500.0, message = "Weight must be 0-500 kg"))]
    pub weight_kg: Option<f64>,

    pub gender: Option<String>,

    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PetQuery {
    pub owner_id: Option<String>,
    pub species: Option<String>,
    pub search: Option<String>,
    pub include_inactive: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMedicalRecordRequest {
    pub record_type: String,

    #[validate(length(min = 1, max = 100, message = "Title is required"))]
    pub title: String,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    #[validate(custom(function = "validate_date"))]
    pub date: String,

    #[validate(length(max = 100, message = "Veterinarian must be at most 100 characters"))]
    pub veterinarian: Option<String>,

    #[validate(custom(function = "validate_date"))]
    pub next_due_date: Option<String>,
}

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

/// Service wizard pricing step
#[derive(Debug, Deserialize, Validate)]
pub struct PricingInput {
    #[validate(range(min = 0.0, message = "Base price cannot be negative"))]
    pub base_price: f64,

    #[serde(default)]
    pub variations: Vec<PriceVariation>,
}

/// Service wizard payload
#[derive(Debug, Deserialize, Validate)]
pub struct CreateServiceRequest {
    #[validate(length(min = 2, max = 100, message = "Service name must be 2-100 characters"))]
    pub name: String,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    pub category: String,

    #[validate(nested)]
    pub pricing: PricingInput,

    #[validate(range(min = 5, max = 1440, message = "Duration must be 5-1440 minutes"))]
    pub duration_minutes: i32,

    #[serde(default)]
    pub requirements: ServiceRequirements,

    #[serde(default)]
    pub staff_ids: Vec<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateServiceRequest {
    #[validate(length(min = 2, max = 100, message = "Service name must be 2-100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    pub category: Option<String>,

    #[validate(nested)]
    pub pricing: Option<PricingInput>,

    #[validate(range(min = 5, max = 1440, message = "Duration must be 5-1440 minutes"))]
    pub duration_minutes: Option<i32>,

    pub requirements: Option<ServiceRequirements>,
    pub staff_ids: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServiceQuery {
    pub category: Option<String>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

// ---------------------------------------------------------------------------
// Staff
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateStaffRequest {
    #[validate(length(min = 1, max = 50, message = "First name is required"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 50, message = "Last name is required"))]
    pub last_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(max = 30, message = "Phone must be at most 30 characters"))]
    pub phone: Option<String>,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateStaffRequest {
    #[validate(length(min = 1, max = 50, message = "First name must be 1-50 characters"))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 50, message = "Last name must be 1-50 characters"))]
    pub last_name: Option<String>,

    #[validate(length(max = 30, message = "Phone must be at most 30 characters"))]
    pub phone: Option<String>,

    pub is_active: Option<bool>,
}

// ---------------------------------------------------------------------------
// Business
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateBusinessRequest {
    #[validate(length(min = 2, max = 100, message = "Business name must be 2-100 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(max = 30, message = "Phone must be at most 30 characters"))]
    pub phone: Option<String>,

    pub address: Option<Address>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CancellationPolicyInput {
    #[validate(range(min = 0, max = 720, message = "Cancellation window must be 0-720 hours"))]
    pub hours_before: i64,

    #[validate(range(min = 0.0, message = "Cancellation fee cannot be negative"))]
    pub fee: f64,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateSettingsRequest {
    #[validate(nested)]
    pub cancellation_policy: Option<CancellationPolicyInput>,
    pub reminders: Option<ReminderSettings>,
    pub payment_methods: Option<Vec<PaymentMethod>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateWorkingHoursRequest {
    pub working_hours: Vec<WorkingDay>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::error::AppError;
    use crate::shared::validation::validate_request;

    #[test]
    fn test_otp_code_must_be_six_digits() {
        let mut request = VerifyOtpRequest {
            email: "a@b.co".into(),
            code: "12345".into(),
            purpose: "login".into(),
        };
        assert!(validate_request(&request).is_err());

        request.code = "12a456".into();
        assert!(validate_request(&request).is_err());

        request.code = "012345".into();
        assert!(validate_request(&request).is_ok());
    }

    #[test]
    fn test_client_wizard_validates_nested_pets() {
        let json = serde_json::json!({
            "profile": {"first_name": "Dana", "last_name": "Reyes", "email": "dana@example.com"},
            "pets": [{"name": "", "species": "dog"}]
        });
        let request: CreateClientRequest = serde_json::from_value(json).unwrap();

        match validate_request(&request).unwrap_err() {
            AppError::InvalidFields(errors) => {
                assert!(errors.iter().any(|e| e.message == "Pet name is required"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_create_pet_flattens_fields() {
        let json = serde_json::json!({"owner_id": "7", "name": "Biscuit", "species": "dog"});
        let request: CreatePetRequest = serde_json::from_value(json).unwrap();

        assert_eq!(request.owner_id.as_deref(), Some("7"));
        assert_eq!(request.pet.name, "Biscuit");
    }

    #[test]
    fn test_update_appointment_checks_time_format() {
        let request = UpdateAppointmentRequest {
            time: Some("9am".into()),
            ..Default::default()
        };
        assert!(validate_request(&request).is_err());
    }
}
