//! User Repository Implementation
//!
//! PostgreSQL implementation of the UserRepository trait.
//! Maps between the `users` table and the domain User entity.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};

use super::pet_repository::insert_pet;
use crate::domain::{Address, Pet, Role, User, UserFilter, UserRepository};
use crate::shared::error::AppError;
use crate::shared::pagination::PageRequest;
use super::contains_pattern;

const USER_COLUMNS: &str = "id, business_id, role, first_name, last_name, email, phone, password_hash, \
     avatar_url, address, is_active, is_email_verified, created_at, updated_at";

/// Shared WHERE clause for list and count; `$1` business, `$2` role, `$3` active, `$4` search.
const LIST_FILTER: &str = r#"
    ($1::BIGINT IS NULL OR business_id = $1)
    AND ($2::VARCHAR IS NULL OR role = $2)
    AND ($3::BOOLEAN IS NULL OR is_active = $3)
    AND ($4::TEXT IS NULL
         OR first_name ILIKE $4 ESCAPE '\'
         OR last_name ILIKE $4 ESCAPE '\'
         OR (first_name || ' ' || last_name) ILIKE $4 ESCAPE '\'
         OR email ILIKE $4 ESCAPE '\'
         OR phone ILIKE $4 ESCAPE '\')
"#;

/// Database row representation of the users table.
#[derive(Debug, sqlx::FromRow)]
pub(super) struct UserRow {
    id: i64,
    business_id: Option<i64>,
    role: String,
    first_name: String,
    last_name: String,
    email: String,
    phone: Option<String>,
    password_hash: String,
    avatar_url: Option<String>,
    address: Json<Address>,
    is_active: bool,
    is_email_verified: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    /// Convert database row to domain User entity.
    pub(super) fn into_user(self) -> Result<User, AppError> {
        let role = Role::parse(&self.role)
            .ok_or_else(|| AppError::Internal(format!("Unknown role '{}'", self.role)))?;

        Ok(User {
            id: self.id,
            business_id: self.business_id,
            role,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            password_hash: self.password_hash,
            avatar_url: self.avatar_url,
            address: self.address.0,
            is_active: self.is_active,
            is_email_verified: self.is_email_verified,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn map_unique_violation(e: sqlx::Error) -> AppError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict("Email already registered".to_string())
        }
        _ => AppError::Database(e),
    }
}

/// Insert a user with any executor (pool or open transaction).
pub(super) async fn insert_user<'e, E>(executor: E, user: &User) -> Result<User, AppError>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        r#"
        INSERT INTO users (id, business_id, role, first_name, last_name, email, phone,
                           password_hash, avatar_url, address, is_active, is_email_verified)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING {USER_COLUMNS}
        "#
    );

    let row = sqlx::query_as::<_, UserRow>(&sql)
        .bind(user.id)
        .bind(user.business_id)
        .bind(user.role.as_str())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(&user.avatar_url)
        .bind(Json(&user.address))
        .bind(user.is_active)
        .bind(user.is_email_verified)
        .fetch_one(executor)
        .await
        .map_err(map_unique_violation)?;

    row.into_user()
}

/// PostgreSQL user repository implementation.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new PgUserRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    async fn create(&self, user: &User) -> Result<User, AppError> {
        insert_user(&self.pool, user).await
    }

    /// Client wizard: the user and every pet in one transaction.
    async fn create_with_pets(&self, user: &User, pets: &[Pet]) -> Result<(User, Vec<Pet>), AppError> {
        let mut tx = self.pool.begin().await?;

        let user = insert_user(&mut *tx, user).await?;
        let mut created = Vec::with_capacity(pets.len());
        for pet in pets {
            created.push(insert_pet(&mut *tx, pet).await?);
        }

        tx.commit().await?;
        Ok((user, created))
    }

    async fn update(&self, user: &User) -> Result<User, AppError> {
        let sql = format!(
            r#"
            UPDATE users
            SET first_name = $2,
                last_name = $3,
                phone = $4,
                address = $5,
                is_active = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user.id)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.phone)
            .bind(Json(&user.address))
            .bind(user.is_active)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", user.id)))?;

        row.into_user()
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        Ok(())
    }

    async fn update_avatar(&self, id: i64, avatar_url: Option<String>) -> Result<User, AppError> {
        let sql = format!(
            "UPDATE users SET avatar_url = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(avatar_url)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;

        row.into_user()
    }

    async fn mark_email_verified(&self, id: i64) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET is_email_verified = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list(&self, filter: &UserFilter, page: PageRequest) -> Result<(Vec<User>, i64), AppError> {
        let role = filter.role.map(|r| r.as_str());

        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {LIST_FILTER} \
             ORDER BY last_name, first_name, id LIMIT $5 OFFSET $6"
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(filter.business_id)
            .bind(role)
            .bind(filter.is_active)
            .bind(contains_pattern(filter.search.as_deref()))
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM users WHERE {LIST_FILTER}"))
            .bind(filter.business_id)
            .bind(role)
            .bind(filter.is_active)
            .bind(contains_pattern(filter.search.as_deref()))
            .fetch_one(&self.pool)
            .await?;

        let users = rows.into_iter().map(UserRow::into_user).collect::<Result<Vec<_>, _>>()?;
        Ok((users, total))
    }

    async fn count_active(&self, business_id: Option<i64>, role: Role) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM users
            WHERE ($1::BIGINT IS NULL OR business_id = $1) AND role = $2 AND is_active
            "#,
        )
        .bind(business_id)
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(role: &str) -> UserRow {
        let now = Utc::now();
        UserRow {
            id: 1,
            business_id: Some(7),
            role: role.to_string(),
            first_name: "Ana".to_string(),
            last_name: "Silva".to_string(),
            email: "ana@example.com".to_string(),
            phone: None,
            password_hash: "hash".to_string(),
            avatar_url: None,
            address: Json(Address::default()),
            is_active: true,
            is_email_verified: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_row_maps_stored_role() {
        let user = row("staff").into_user().unwrap();
        assert_eq!(user.role, Role::Staff);
    }

    #[test]
    fn test_unknown_stored_role_is_internal_error() {
        let err = row("owner").into_user().unwrap_err();
        assert!(matches!(err, AppError::Internal(msg) if msg.contains("owner")));
    }
}
