//! Service Repository Implementation
//!
//! PostgreSQL implementation of the ServiceRepository trait. Pricing
//! variations and requirements are JSONB, assigned staff a BIGINT[].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::{
    PriceVariation, Service, ServiceBookingCount, ServiceCategory, ServiceFilter, ServiceRepository,
    ServiceRequirements, ServiceStats,
};
use crate::shared::error::AppError;
use crate::shared::pagination::PageRequest;
use super::contains_pattern;

const SERVICE_COLUMNS: &str = "id, business_id, name, description, category, base_price, variations, \
     duration_minutes, requirements, staff_ids, is_active, created_at, updated_at";

/// `$1` business, `$2` category, `$3` active, `$4` search.
const LIST_FILTER: &str = r#"
    ($1::BIGINT IS NULL OR business_id = $1)
    AND ($2::VARCHAR IS NULL OR category = $2)
    AND ($3::BOOLEAN IS NULL OR is_active = $3)
    AND ($4::TEXT IS NULL OR name ILIKE $4 ESCAPE '\' OR description ILIKE $4 ESCAPE '\')
"#;

#[derive(Debug, sqlx::FromRow)]
struct ServiceRow {
    id: i64,
    business_id: i64,
    name: String,
    description: Option<String>,
    category: String,
    base_price: f64,
    variations: Json<Vec<PriceVariation>>,
    duration_minutes: i32,
    requirements: Json<ServiceRequirements>,
    staff_ids: Vec<i64>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ServiceRow {
    fn into_service(self) -> Service {
        Service {
            id: self.id,
            business_id: self.business_id,
            name: self.name,
            description: self.description,
            category: ServiceCategory::parse(&self.category).unwrap_or_default(),
            base_price: self.base_price,
            variations: self.variations.0,
            duration_minutes: self.duration_minutes,
            requirements: self.requirements.0,
            staff_ids: self.staff_ids,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// PostgreSQL service repository implementation.
#[derive(Clone)]
pub struct PgServiceRepository {
    pool: PgPool,
}

impl PgServiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ServiceRepository for PgServiceRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Service>, AppError> {
        let sql = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = $1");
        let row = sqlx::query_as::<_, ServiceRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(ServiceRow::into_service))
    }

    async fn list(&self, filter: &ServiceFilter, page: PageRequest) -> Result<(Vec<Service>, i64), AppError> {
        let category = filter.category.map(|c| c.as_str());

        let sql = format!(
            "SELECT {SERVICE_COLUMNS} FROM services WHERE {LIST_FILTER} ORDER BY name, id LIMIT $5 OFFSET $6"
        );
        let rows = sqlx::query_as::<_, ServiceRow>(&sql)
            .bind(filter.business_id)
            .bind(category)
            .bind(filter.is_active)
            .bind(contains_pattern(filter.search.as_deref()))
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM services WHERE {LIST_FILTER}"))
            .bind(filter.business_id)
            .bind(category)
            .bind(filter.is_active)
            .bind(contains_pattern(filter.search.as_deref()))
            .fetch_one(&self.pool)
            .await?;

        Ok((rows.into_iter().map(ServiceRow::into_service).collect(), total))
    }

    async fn create(&self, service: &Service) -> Result<Service, AppError> {
        let sql = format!(
            r#"
            INSERT INTO services (id, business_id, name, description, category, base_price, variations,
                                  duration_minutes, requirements, staff_ids, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {SERVICE_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, ServiceRow>(&sql)
            .bind(service.id)
            .bind(service.business_id)
            .bind(&service.name)
            .bind(&service.description)
            .bind(service.category.as_str())
            .bind(service.base_price)
            .bind(Json(&service.variations))
            .bind(service.duration_minutes)
            .bind(Json(&service.requirements))
            .bind(&service.staff_ids)
            .bind(service.is_active)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into_service())
    }

    async fn update(&self, service: &Service) -> Result<Service, AppError> {
        let sql = format!(
            r#"
            UPDATE services
            SET name = $2, description = $3, category = $4, base_price = $5, variations = $6,
                duration_minutes = $7, requirements = $8, staff_ids = $9, is_active = $10,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {SERVICE_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, ServiceRow>(&sql)
            .bind(service.id)
            .bind(&service.name)
            .bind(&service.description)
            .bind(service.category.as_str())
            .bind(service.base_price)
            .bind(Json(&service.variations))
            .bind(service.duration_minutes)
            .bind(Json(&service.requirements))
            .bind(&service.staff_ids)
            .bind(service.is_active)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Service with id {} not found", service.id)))?;

        Ok(row.into_service())
    }

    async fn deactivate(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE services SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Service with id {} not found", id)));
        }
        Ok(())
    }

    async fn category_counts(&self, business_id: Option<i64>) -> Result<Vec<(ServiceCategory, i64)>, AppError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT category, COUNT(*) FROM services
            WHERE ($1::BIGINT IS NULL OR business_id = $1) AND is_active
            GROUP BY category
            "#,
        )
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(category, count)| ServiceCategory::parse(&category).map(|c| (c, count)))
            .collect())
    }

    async fn stats(&self, business_id: Option<i64>) -> Result<ServiceStats, AppError> {
        let (total, active, inactive, average_price) = sqlx::query_as::<_, (i64, i64, i64, f64)>(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE is_active),
                   COUNT(*) FILTER (WHERE NOT is_active),
                   COALESCE(AVG(base_price), 0)::FLOAT8
            FROM services
            WHERE ($1::BIGINT IS NULL OR business_id = $1)
            "#,
        )
        .bind(business_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(ServiceStats {
            total,
            active,
            inactive,
            average_price,
        })
    }

    async fn top_booked(&self, business_id: Option<i64>, limit: i64) -> Result<Vec<ServiceBookingCount>, AppError> {
        let rows = sqlx::query_as::<_, (i64, String, i64)>(
            r#"
            SELECT s.id, s.name, COUNT(a.id) AS bookings
            FROM services s
            JOIN appointments a ON a.service_id = s.id AND a.status <> 'cancelled'
            WHERE ($1::BIGINT IS NULL OR s.business_id = $1)
            GROUP BY s.id, s.name
            ORDER BY bookings DESC, s.name
            LIMIT $2
            "#,
        )
        .bind(business_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(service_id, name, bookings)| ServiceBookingCount {
                service_id,
                name,
                bookings,
            })
            .collect())
    }
}
