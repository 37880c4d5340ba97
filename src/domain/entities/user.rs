//! User entity and repository trait.
//!
//! Maps to the `users` table in the database schema. Clients, staff and
//! administrators are all users; `role` tells them apart and `business_id`
//! binds everyone except super admins to a tenant.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::pet::Pet;
use crate::domain::value_objects::Role;
use crate::shared::error::AppError;
use crate::shared::pagination::PageRequest;

/// Postal address, stored as JSONB on users and businesses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// Represents a user account.
///
/// Maps to the `users` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - business_id: BIGINT NULL REFERENCES businesses(id)
/// - role: VARCHAR(20) NOT NULL
/// - first_name / last_name: VARCHAR(50) NOT NULL
/// - email: VARCHAR(255) NOT NULL UNIQUE (lower-cased)
/// - phone: VARCHAR(30) NULL
/// - password_hash: VARCHAR(255) NOT NULL
/// - avatar_url: TEXT NULL
/// - address: JSONB NOT NULL DEFAULT '{}'
/// - is_active / is_email_verified: BOOLEAN
/// - created_at / updated_at: TIMESTAMPTZ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub business_id: Option<i64>,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,

    /// Argon2 password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub avatar_url: Option<String>,
    pub address: Address,
    pub is_active: bool,
    pub is_email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// "First Last", trimmed.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Whether this user belongs to the given tenant.
    pub fn belongs_to(&self, business_id: i64) -> bool {
        self.business_id == Some(business_id)
    }
}

impl Default for User {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            business_id: None,
            role: Role::default(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            phone: None,
            password_hash: String::new(),
            avatar_url: None,
            address: Address::default(),
            is_active: true,
            is_email_verified: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Filter for listing users of a tenant (clients, staff).
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// `None` lists across all tenants (super admin only)
    pub business_id: Option<i64>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    /// Case-insensitive match on name, email or phone
    pub search: Option<String>,
}

/// Normalize an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Repository trait for User data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by their Snowflake ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;

    /// Find a user by their (normalized) email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Check if an email address is already registered.
    async fn email_exists(&self, email: &str) -> Result<bool, AppError>;

    /// Create a new user.
    async fn create(&self, user: &User) -> Result<User, AppError>;

    /// Create a client together with their pets in one transaction.
    async fn create_with_pets(&self, user: &User, pets: &[Pet]) -> Result<(User, Vec<Pet>), AppError>;

    /// Update profile fields, role and activity flag.
    async fn update(&self, user: &User) -> Result<User, AppError>;

    /// Replace the password hash.
    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), AppError>;

    /// Set or clear the avatar URL.
    async fn update_avatar(&self, id: i64, avatar_url: Option<String>) -> Result<User, AppError>;

    /// Flag the email address as verified.
    async fn mark_email_verified(&self, id: i64) -> Result<(), AppError>;

    /// List users matching a filter, newest first, with the total count.
    async fn list(&self, filter: &UserFilter, page: PageRequest) -> Result<(Vec<User>, i64), AppError>;

    /// Count active users of a role inside a tenant (all tenants when `None`).
    async fn count_active(&self, business_id: Option<i64>, role: Role) -> Result<i64, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_user() -> User {
        User {
            id: 12345678901234567,
            business_id: Some(42),
            role: Role::Client,
            first_name: "Dana".to_string(),
            last_name: "Reyes".to_string(),
            email: "dana@example.com".to_string(),
            password_hash: "hashed_password".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_user_default() {
        let user = User::default();

        assert_eq!(user.id, 0);
        assert_eq!(user.role, Role::Client);
        assert!(user.is_active);
        assert!(!user.is_email_verified);
        assert!(user.business_id.is_none());
    }

    #[test]
    fn test_full_name() {
        let mut user = create_test_user();
        assert_eq!(user.full_name(), "Dana Reyes");

        user.last_name.clear();
        assert_eq!(user.full_name(), "Dana");
    }

    #[test]
    fn test_belongs_to() {
        let user = create_test_user();
        assert!(user.belongs_to(42));
        assert!(!user.belongs_to(7));
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = create_test_user();
        let serialized = serde_json::to_string(&user).expect("Failed to serialize user");

        assert!(!serialized.contains("password_hash"));
        assert!(!serialized.contains("hashed_password"));
        assert!(serialized.contains("\"role\":\"client\""));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Dana@Example.COM "), "dana@example.com");
    }

    #[test]
    fn test_address_deserializes_partial() {
        let address: Address = serde_json::from_str(r#"{"city":"Austin"}"#).unwrap();
        assert_eq!(address.city.as_deref(), Some("Austin"));
        assert!(address.street.is_none());
    }
}
