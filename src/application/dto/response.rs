//! Response DTOs
//!
//! Data structures for API response bodies. Every success body is wrapped in
//! [`ApiResponse`]; ids are rendered as strings.

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::application::services::AuthTokens;
use crate::domain::entities::{
    Address, AppointmentDetails, Business, BusinessSettings, MedicalRecord, Pet, PriceVariation, Service,
    ServiceBookingCount, ServiceCategory, ServiceRequirements, ServiceStats, User, WorkingDay,
};
use crate::domain::value_objects::{AppointmentStatus, StatusAction};
use crate::shared::pagination::{Page, Pagination};

/// `{"success": true, "data": ..., "message"?: ...}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
            status: StatusCode::OK,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok(data)
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<serde_json::Value> {
    /// `data: null` with a message.
    pub fn message_only(message: impl Into<String>) -> Self {
        Self::ok(serde_json::Value::Null).with_message(message)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

fn id_string(id: i64) -> String {
    id.to_string()
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
}

impl From<AuthTokens> for TokenResponse {
    fn from(tokens: AuthTokens) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
            token_type: tokens.token_type,
        }
    }
}

/// User plus a fresh token pair (register, login, OTP login)
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    #[serde(flatten)]
    pub tokens: TokenResponse,
}

impl AuthResponse {
    pub fn new(user: User, tokens: AuthTokens) -> Self {
        Self {
            user: UserResponse::from(user),
            tokens: TokenResponse::from(tokens),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub business_id: Option<String>,
    pub role: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub address: Address,
    pub is_active: bool,
    pub is_email_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: id_string(user.id),
            business_id: user.business_id.map(id_string),
            role: user.role.as_str().to_string(),
            full_name: user.full_name(),
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            phone: user.phone,
            avatar_url: user.avatar_url,
            address: user.address,
            is_active: user.is_active,
            is_email_verified: user.is_email_verified,
            created_at: user.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Business
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct BusinessResponse {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Address,
    pub working_hours: Vec<WorkingDay>,
    pub settings: BusinessSettings,
    pub subscription_plan: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Business> for BusinessResponse {
    fn from(business: Business) -> Self {
        Self {
            id: id_string(business.id),
            owner_id: id_string(business.owner_id),
            name: business.name,
            email: business.email,
            phone: business.phone,
            address: business.address,
            working_hours: business.working_hours,
            settings: business.settings,
            subscription_plan: business.subscription_plan.as_str().to_string(),
            is_active: business.is_active,
            created_at: business.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BusinessListResponse {
    pub businesses: Vec<BusinessResponse>,
    pub pagination: Pagination,
}

impl From<Page<Business>> for BusinessListResponse {
    fn from(page: Page<Business>) -> Self {
        let page = page.map(BusinessResponse::from);
        Self {
            businesses: page.items,
            pagination: page.pagination,
        }
    }
}

// ---------------------------------------------------------------------------
// Clients, staff & pets
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct PetResponse {
    pub id: String,
    pub business_id: String,
    pub owner_id: String,
    pub name: String,
    pub species: String,
    pub breed: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub age_months: Option<i32>,
    pub weight_kg: Option<f64>,
    pub gender: String,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Pet> for PetResponse {
    fn from(pet: Pet) -> Self {
        Self {
            age_months: pet.age_in_months(Utc::now().date_naive()),
            id: id_string(pet.id),
            business_id: id_string(pet.business_id),
            owner_id: id_string(pet.owner_id),
            name: pet.name,
            species: pet.species.as_str().to_string(),
            breed: pet.breed,
            date_of_birth: pet.date_of_birth,
            weight_kg: pet.weight_kg,
            gender: pet.gender.as_str().to_string(),
            notes: pet.notes,
            is_active: pet.is_active,
            created_at: pet.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PetListResponse {
    pub pets: Vec<PetResponse>,
    pub pagination: Pagination,
}

impl From<Page<Pet>> for PetListResponse {
    fn from(page: Page<Pet>) -> Self {
        let page = page.map(PetResponse::from);
        Self {
            pets: page.items,
            pagination: page.pagination,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MedicalRecordResponse {
    pub id: String,
    pub pet_id: String,
    pub record_type: String,
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub veterinarian: Option<String>,
    pub next_due_date: Option<NaiveDate>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl From<MedicalRecord> for MedicalRecordResponse {
    fn from(record: MedicalRecord) -> Self {
        Self {
            id: id_string(record.id),
            pet_id: id_string(record.pet_id),
            record_type: record.record_type.as_str().to_string(),
            title: record.title,
            description: record.description,
            date: record.date,
            veterinarian: record.veterinarian,
            next_due_date: record.next_due_date,
            created_by: id_string(record.created_by),
            created_at: record.created_at,
        }
    }
}

/// A client with their pets
#[derive(Debug, Serialize)]
pub struct ClientResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub pets: Vec<PetResponse>,
}

impl ClientResponse {
    pub fn new(user: User, pets: Vec<Pet>) -> Self {
        Self {
            user: UserResponse::from(user),
            pets: pets.into_iter().map(PetResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClientListResponse {
    pub clients: Vec<UserResponse>,
    pub pagination: Pagination,
}

impl From<Page<User>> for ClientListResponse {
    fn from(page: Page<User>) -> Self {
        let page = page.map(UserResponse::from);
        Self {
            clients: page.items,
            pagination: page.pagination,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StaffListResponse {
    pub staff: Vec<UserResponse>,
    pub pagination: Pagination,
}

impl From<Page<User>> for StaffListResponse {
    fn from(page: Page<User>) -> Self {
        let page = page.map(UserResponse::from);
        Self {
            staff: page.items,
            pagination: page.pagination,
        }
    }
}

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct PricingResponse {
    pub base_price: f64,
    pub variations: Vec<PriceVariation>,
}

#[derive(Debug, Serialize)]
pub struct ServiceResponse {
    pub id: String,
    pub business_id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub pricing: PricingResponse,
    pub duration_minutes: i32,
    pub requirements: ServiceRequirements,
    pub staff_ids: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Service> for ServiceResponse {
    fn from(service: Service) -> Self {
        Self {
            id: id_string(service.id),
            business_id: id_string(service.business_id),
            name: service.name,
            description: service.description,
            category: service.category.as_str().to_string(),
            pricing: PricingResponse {
                base_price: service.base_price,
                variations: service.variations,
            },
            duration_minutes: service.duration_minutes,
            requirements: service.requirements,
            staff_ids: service.staff_ids.into_iter().map(id_string).collect(),
            is_active: service.is_active,
            created_at: service.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ServiceListResponse {
    pub services: Vec<ServiceResponse>,
    pub pagination: Pagination,
}

impl From<Page<Service>> for ServiceListResponse {
    fn from(page: Page<Service>) -> Self {
        let page = page.map(ServiceResponse::from);
        Self {
            services: page.items,
            pagination: page.pagination,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCountResponse {
    pub category: String,
    pub label: String,
    pub count: i64,
}

impl CategoryCountResponse {
    pub fn new(category: ServiceCategory, count: i64) -> Self {
        Self {
            category: category.as_str().to_string(),
            label: category.label().to_string(),
            count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TopServiceResponse {
    pub service_id: String,
    pub name: String,
    pub bookings: i64,
}

impl From<ServiceBookingCount> for TopServiceResponse {
    fn from(count: ServiceBookingCount) -> Self {
        Self {
            service_id: id_string(count.service_id),
            name: count.name,
            bookings: count.bookings,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ServiceStatsResponse {
    #[serde(flatten)]
    pub totals: ServiceStats,
    pub by_category: Vec<CategoryCountResponse>,
    pub top_services: Vec<TopServiceResponse>,
}

// ---------------------------------------------------------------------------
// Appointments
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct AppointmentResponse {
    pub id: String,
    pub business_id: String,
    pub client_id: String,
    pub client_name: String,
    pub pet_id: String,
    pub pet_name: String,
    pub service_id: String,
    pub service_name: String,
    pub staff_id: Option<String>,
    pub staff_name: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub available_actions: Vec<String>,
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

impl From<AppointmentDetails> for AppointmentResponse {
    fn from(details: AppointmentDetails) -> Self {
        let a = details.appointment;
        Self {
            id: id_string(a.id),
            business_id: id_string(a.business_id),
            client_id: id_string(a.client_id),
            client_name: details.client_name,
            pet_id: id_string(a.pet_id),
            pet_name: details.pet_name,
            service_id: id_string(a.service_id),
            service_name: details.service_name,
            staff_id: a.staff_id.map(id_string),
            staff_name: details.staff_name,
            ends_at: a.ends_at(),
            scheduled_at: a.scheduled_at,
            duration_minutes: a.duration_minutes,
            status: a.status,
            available_actions: a
                .status
                .available_actions()
                .iter()
                .map(StatusAction::as_str)
                .map(String::from)
                .collect(),
            price: a.price,
            notes: a.notes,
            cancellation_reason: a.cancellation_reason,
            checked_in_at: a.checked_in_at,
            started_at: a.started_at,
            completed_at: a.completed_at,
            cancelled_at: a.cancelled_at,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

/// `{appointments, pagination}`
#[derive(Debug, Serialize)]
pub struct AppointmentListResponse {
    pub appointments: Vec<AppointmentResponse>,
    pub pagination: Pagination,
}

impl From<Page<AppointmentDetails>> for AppointmentListResponse {
    fn from(page: Page<AppointmentDetails>) -> Self {
        let page = page.map(AppointmentResponse::from);
        Self {
            appointments: page.items,
            pagination: page.pagination,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CalendarResponse {
    pub year: i32,
    pub month: u32,
    pub days: BTreeMap<String, Vec<AppointmentResponse>>,
}

impl CalendarResponse {
    pub fn new(year: i32, month: u32, days: BTreeMap<String, Vec<AppointmentDetails>>) -> Self {
        Self {
            year,
            month,
            days: days
                .into_iter()
                .map(|(day, list)| (day, list.into_iter().map(AppointmentResponse::from).collect()))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RevenueSummary {
    pub this_month: f64,
    pub all_time: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardStatsResponse {
    pub today_appointments: i64,
    pub upcoming_appointments: i64,
    pub appointments_by_status: BTreeMap<String, i64>,
    pub total_clients: i64,
    pub total_pets: i64,
    pub revenue: RevenueSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Appointment;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn test_envelope_shape_and_status() {
        let response = ApiResponse::created(serde_json::json!({"id": "1"}))
            .with_message("Created")
            .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["id"], "1");
        assert_eq!(json["message"], "Created");
        assert!(json.get("status").is_none());
    }

    #[test]
    fn test_user_response_hides_password_and_stringifies_ids() {
        let user = User {
            id: 9007199254740993,
            business_id: Some(5),
            first_name: "Dana".into(),
            password_hash: "secret".into(),
            ..Default::default()
        };

        let json = serde_json::to_value(UserResponse::from(user)).unwrap();
        assert_eq!(json["id"], "9007199254740993");
        assert_eq!(json["business_id"], "5");
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn test_appointment_response_lists_actions() {
        let details = AppointmentDetails {
            appointment: Appointment {
                status: AppointmentStatus::Confirmed,
                ..Default::default()
            },
            client_name: "Dana Reyes".into(),
            pet_name: "Biscuit".into(),
            service_name: "Bath".into(),
            staff_name: None,
        };

        let response = AppointmentResponse::from(details);
        assert_eq!(response.available_actions, vec!["checkin", "start", "cancel", "no-show"]);
    }
}
