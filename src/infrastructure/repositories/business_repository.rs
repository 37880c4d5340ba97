//! Business Repository Implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};

use super::user_repository::insert_user;
use crate::domain::{
    Address, Business, BusinessRepository, BusinessSettings, SubscriptionPlan, User, WorkingDay,
};
use crate::shared::error::AppError;
use crate::shared::pagination::PageRequest;

const BUSINESS_COLUMNS: &str = "id, owner_id, name, email, phone, address, working_hours, settings, \
     subscription_plan, is_active, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct BusinessRow {
    id: i64,
    owner_id: i64,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    address: Json<Address>,
    working_hours: Json<Vec<WorkingDay>>,
    settings: Json<BusinessSettings>,
    subscription_plan: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BusinessRow {
    fn into_business(self) -> Business {
        Business {
            id: self.id,
            owner_id: self.owner_id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            address: self.address.0,
            working_hours: self.working_hours.0,
            settings: self.settings.0,
            subscription_plan: SubscriptionPlan::parse(&self.subscription_plan),
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

async fn insert_business<'e, E>(executor: E, business: &Business) -> Result<Business, AppError>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        r#"
        INSERT INTO businesses (id, owner_id, name, email, phone, address, working_hours,
                                settings, subscription_plan, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {BUSINESS_COLUMNS}
        "#
    );

    let row = sqlx::query_as::<_, BusinessRow>(&sql)
        .bind(business.id)
        .bind(business.owner_id)
        .bind(&business.name)
        .bind(&business.email)
        .bind(&business.phone)
        .bind(Json(&business.address))
        .bind(Json(&business.working_hours))
        .bind(Json(&business.settings))
        .bind(business.subscription_plan.as_str())
        .bind(business.is_active)
        .fetch_one(executor)
        .await?;

    Ok(row.into_business())
}

/// PostgreSQL business repository implementation.
#[derive(Clone)]
pub struct PgBusinessRepository {
    pool: PgPool,
}

impl PgBusinessRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BusinessRepository for PgBusinessRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Business>, AppError> {
        let sql = format!("SELECT {BUSINESS_COLUMNS} FROM businesses WHERE id = $1");
        let row = sqlx::query_as::<_, BusinessRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(BusinessRow::into_business))
    }

    /// Owner and business reference each other; both foreign keys are
    /// checked at commit.
    async fn create_with_owner(&self, business: &Business, owner: &User) -> Result<(Business, User), AppError> {
        let mut tx = self.pool.begin().await?;

        let owner = insert_user(&mut *tx, owner).await?;
        let business = insert_business(&mut *tx, business).await?;

        tx.commit().await?;
        Ok((business, owner))
    }

    async fn update(&self, business: &Business) -> Result<Business, AppError> {
        let sql = format!(
            r#"
            UPDATE businesses
            SET name = $2, email = $3, phone = $4, address = $5, working_hours = $6,
                settings = $7, subscription_plan = $8, is_active = $9, updated_at = NOW()
            WHERE id = $1
            RETURNING {BUSINESS_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, BusinessRow>(&sql)
            .bind(business.id)
            .bind(&business.name)
            .bind(&business.email)
            .bind(&business.phone)
            .bind(Json(&business.address))
            .bind(Json(&business.working_hours))
            .bind(Json(&business.settings))
            .bind(business.subscription_plan.as_str())
            .bind(business.is_active)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Business with id {} not found", business.id)))?;

        Ok(row.into_business())
    }

    async fn list(&self, page: PageRequest) -> Result<(Vec<Business>, i64), AppError> {
        let sql = format!("SELECT {BUSINESS_COLUMNS} FROM businesses ORDER BY created_at DESC, id LIMIT $1 OFFSET $2");
        let rows = sqlx::query_as::<_, BusinessRow>(&sql)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM businesses")
            .fetch_one(&self.pool)
            .await?;

        Ok((rows.into_iter().map(BusinessRow::into_business).collect(), total))
    }
}
