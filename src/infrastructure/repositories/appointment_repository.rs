//! Appointment Repository Implementation
//!
//! PostgreSQL implementation of the AppointmentRepository trait. Reads for
//! list and calendar views join the client, pet, service and staff names.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgConnection, PgPool};

use crate::domain::{Appointment, AppointmentDetails, AppointmentFilter, AppointmentRepository, AppointmentStatus};
use crate::shared::error::AppError;
use crate::shared::pagination::PageRequest;
use super::contains_pattern;

const APPOINTMENT_COLUMNS: &str = "id, business_id, client_id, pet_id, service_id, staff_id, scheduled_at, \
     duration_minutes, status, price, notes, cancellation_reason, checked_in_at, started_at, completed_at, \
     cancelled_at, created_at, updated_at";

const DETAILS_SELECT: &str = r#"
    SELECT a.id, a.business_id, a.client_id, a.pet_id, a.service_id, a.staff_id, a.scheduled_at,
           a.duration_minutes, a.status, a.price, a.notes, a.cancellation_reason, a.checked_in_at,
           a.started_at, a.completed_at, a.cancelled_at, a.created_at, a.updated_at,
           c.first_name || ' ' || c.last_name AS client_name,
           p.name AS pet_name,
           s.name AS service_name,
           CASE WHEN st.id IS NULL THEN NULL ELSE st.first_name || ' ' || st.last_name END AS staff_name
    FROM appointments a
    JOIN users c ON c.id = a.client_id
    JOIN pets p ON p.id = a.pet_id
    JOIN services s ON s.id = a.service_id
    LEFT JOIN users st ON st.id = a.staff_id
"#;

/// `$1` business, `$2` client, `$3` pet, `$4` staff, `$5` service, `$6` status,
/// `$7` first day, `$8` last day (inclusive), `$9` search.
const LIST_FILTER: &str = r#"
    ($1::BIGINT IS NULL OR a.business_id = $1)
    AND ($2::BIGINT IS NULL OR a.client_id = $2)
    AND ($3::BIGINT IS NULL OR a.pet_id = $3)
    AND ($4::BIGINT IS NULL OR a.staff_id = $4)
    AND ($5::BIGINT IS NULL OR a.service_id = $5)
    AND ($6::VARCHAR IS NULL OR a.status = $6)
    AND ($7::DATE IS NULL OR a.scheduled_at >= $7::DATE::TIMESTAMP AT TIME ZONE 'UTC')
    AND ($8::DATE IS NULL OR a.scheduled_at < ($8::DATE + 1)::TIMESTAMP AT TIME ZONE 'UTC')
    AND ($9::TEXT IS NULL
         OR p.name ILIKE $9 ESCAPE '\'
         OR (c.first_name || ' ' || c.last_name) ILIKE $9 ESCAPE '\')
"#;

#[derive(Debug, sqlx::FromRow)]
struct AppointmentRow {
    id: i64,
    business_id: i64,
    client_id: i64,
    pet_id: i64,
    service_id: i64,
    staff_id: Option<i64>,
    scheduled_at: DateTime<Utc>,
    duration_minutes: i32,
    status: String,
    price: f64,
    notes: Option<String>,
    cancellation_reason: Option<String>,
    checked_in_at: Option<DateTime<Utc>>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AppointmentRow {
    fn into_appointment(self) -> Appointment {
        Appointment {
            id: self.id,
            business_id: self.business_id,
            client_id: self.client_id,
            pet_id: self.pet_id,
            service_id: self.service_id,
            staff_id: self.staff_id,
            scheduled_at: self.scheduled_at,
            duration_minutes: self.duration_minutes,
            status: AppointmentStatus::parse(&self.status).unwrap_or_default(),
            price: self.price,
            notes: self.notes,
            cancellation_reason: self.cancellation_reason,
            checked_in_at: self.checked_in_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
            cancelled_at: self.cancelled_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DetailsRow {
    #[sqlx(flatten)]
    appointment: AppointmentRow,
    client_name: String,
    pet_name: String,
    service_name: String,
    staff_name: Option<String>,
}

impl DetailsRow {
    fn into_details(self) -> AppointmentDetails {
        AppointmentDetails {
            appointment: self.appointment.into_appointment(),
            client_name: self.client_name,
            pet_name: self.pet_name,
            service_name: self.service_name,
            staff_name: self.staff_name,
        }
    }
}

/// Take the per-staff booking lock for the rest of the transaction, then
/// report whether a slot-blocking appointment overlaps `[start, end)`.
async fn staff_slot_taken(
    conn: &mut PgConnection,
    staff_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude_id: Option<i64>,
) -> Result<bool, AppError> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(staff_id)
        .execute(&mut *conn)
        .await?;

    let overlap = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM appointments
            WHERE staff_id = $1
              AND status IN ('scheduled', 'confirmed', 'in_progress')
              AND scheduled_at < $3
              AND scheduled_at + duration_minutes * INTERVAL '1 minute' > $2
              AND ($4::BIGINT IS NULL OR id <> $4)
        )
        "#,
    )
    .bind(staff_id)
    .bind(start)
    .bind(end)
    .bind(exclude_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(overlap)
}

/// PostgreSQL appointment repository implementation.
#[derive(Clone)]
pub struct PgAppointmentRepository {
    pool: PgPool,
}

impl PgAppointmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AppointmentRepository for PgAppointmentRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Appointment>, AppError> {
        let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = $1");
        let row = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(AppointmentRow::into_appointment))
    }

    async fn find_details(&self, id: i64) -> Result<Option<AppointmentDetails>, AppError> {
        let sql = format!("{DETAILS_SELECT} WHERE a.id = $1");
        let row = sqlx::query_as::<_, DetailsRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(DetailsRow::into_details))
    }

    async fn list(
        &self,
        filter: &AppointmentFilter,
        page: PageRequest,
    ) -> Result<(Vec<AppointmentDetails>, i64), AppError> {
        let status = filter.status.map(|s| s.as_str());
        let date_from: Option<NaiveDate> = filter.date_from;
        let date_to: Option<NaiveDate> = filter.date_to;

        let sql = format!(
            "{DETAILS_SELECT} WHERE {LIST_FILTER} ORDER BY a.scheduled_at DESC, a.id DESC LIMIT $10 OFFSET $11"
        );
        let rows = sqlx::query_as::<_, DetailsRow>(&sql)
            .bind(filter.business_id)
            .bind(filter.client_id)
            .bind(filter.pet_id)
            .bind(filter.staff_id)
            .bind(filter.service_id)
            .bind(status)
            .bind(date_from)
            .bind(date_to)
            .bind(contains_pattern(filter.search.as_deref()))
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let count_sql = format!(
            r#"
            SELECT COUNT(*) FROM appointments a
            JOIN users c ON c.id = a.client_id
            JOIN pets p ON p.id = a.pet_id
            WHERE {LIST_FILTER}
            "#
        );
        let total = sqlx::query_scalar::<_, i64>(&count_sql)
            .bind(filter.business_id)
            .bind(filter.client_id)
            .bind(filter.pet_id)
            .bind(filter.staff_id)
            .bind(filter.service_id)
            .bind(status)
            .bind(date_from)
            .bind(date_to)
            .bind(contains_pattern(filter.search.as_deref()))
            .fetch_one(&self.pool)
            .await?;

        Ok((rows.into_iter().map(DetailsRow::into_details).collect(), total))
    }

    async fn list_between(
        &self,
        business_id: Option<i64>,
        client_id: Option<i64>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AppointmentDetails>, AppError> {
        let sql = format!(
            r#"
            {DETAILS_SELECT}
            WHERE ($1::BIGINT IS NULL OR a.business_id = $1)
              AND ($2::BIGINT IS NULL OR a.client_id = $2)
              AND a.scheduled_at >= $3 AND a.scheduled_at < $4
            ORDER BY a.scheduled_at, a.id
            "#
        );
        let rows = sqlx::query_as::<_, DetailsRow>(&sql)
            .bind(business_id)
            .bind(client_id)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(DetailsRow::into_details).collect())
    }

    async fn create(&self, appointment: &Appointment) -> Result<Option<Appointment>, AppError> {
        let mut tx = self.pool.begin().await?;
        if let Some(staff_id) = appointment.staff_id {
            if staff_slot_taken(&mut tx, staff_id, appointment.scheduled_at, appointment.ends_at(), None).await? {
                return Ok(None);
            }
        }

        let sql = format!(
            r#"
            INSERT INTO appointments (id, business_id, client_id, pet_id, service_id, staff_id,
                                      scheduled_at, duration_minutes, status, price, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {APPOINTMENT_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(appointment.id)
            .bind(appointment.business_id)
            .bind(appointment.client_id)
            .bind(appointment.pet_id)
            .bind(appointment.service_id)
            .bind(appointment.staff_id)
            .bind(appointment.scheduled_at)
            .bind(appointment.duration_minutes)
            .bind(appointment.status.as_str())
            .bind(appointment.price)
            .bind(&appointment.notes)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Some(row.into_appointment()))
    }

    async fn update(&self, appointment: &Appointment) -> Result<Option<Appointment>, AppError> {
        let mut tx = self.pool.begin().await?;
        if let Some(staff_id) = appointment.staff_id {
            let taken = staff_slot_taken(
                &mut tx,
                staff_id,
                appointment.scheduled_at,
                appointment.ends_at(),
                Some(appointment.id),
            )
            .await?;
            if taken {
                return Ok(None);
            }
        }

        let sql = format!(
            r#"
            UPDATE appointments
            SET staff_id = $2, scheduled_at = $3, duration_minutes = $4, price = $5,
                notes = $6, updated_at = NOW()
            WHERE id = $1
            RETURNING {APPOINTMENT_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(appointment.id)
            .bind(appointment.staff_id)
            .bind(appointment.scheduled_at)
            .bind(appointment.duration_minutes)
            .bind(appointment.price)
            .bind(&appointment.notes)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Appointment with id {} not found", appointment.id)))?;
        tx.commit().await?;

        Ok(Some(row.into_appointment()))
    }

    async fn save_transition(
        &self,
        appointment: &Appointment,
        expected: AppointmentStatus,
    ) -> Result<Option<Appointment>, AppError> {
        let sql = format!(
            r#"
            UPDATE appointments
            SET status = $3, cancellation_reason = $4, checked_in_at = $5, started_at = $6,
                completed_at = $7, cancelled_at = $8, updated_at = $9
            WHERE id = $1 AND status = $2
            RETURNING {APPOINTMENT_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(appointment.id)
            .bind(expected.as_str())
            .bind(appointment.status.as_str())
            .bind(&appointment.cancellation_reason)
            .bind(appointment.checked_in_at)
            .bind(appointment.started_at)
            .bind(appointment.completed_at)
            .bind(appointment.cancelled_at)
            .bind(appointment.updated_at)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(AppointmentRow::into_appointment))
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM appointments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Appointment with id {} not found", id)));
        }
        Ok(())
    }

    async fn status_counts(&self, business_id: Option<i64>) -> Result<Vec<(AppointmentStatus, i64)>, AppError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT status, COUNT(*) FROM appointments
            WHERE ($1::BIGINT IS NULL OR business_id = $1)
            GROUP BY status
            "#,
        )
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(status, count)| AppointmentStatus::parse(&status).map(|s| (s, count)))
            .collect())
    }

    async fn count_between(
        &self,
        business_id: Option<i64>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM appointments
            WHERE ($1::BIGINT IS NULL OR business_id = $1)
              AND scheduled_at >= $2 AND scheduled_at < $3
              AND status <> 'cancelled'
            "#,
        )
        .bind(business_id)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn count_upcoming(&self, business_id: Option<i64>, now: DateTime<Utc>) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM appointments
            WHERE ($1::BIGINT IS NULL OR business_id = $1)
              AND scheduled_at > $2
              AND status IN ('scheduled', 'confirmed')
            "#,
        )
        .bind(business_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn revenue_between(
        &self,
        business_id: Option<i64>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<f64, AppError> {
        let revenue = sqlx::query_scalar::<_, f64>(
            r#"
            SELECT COALESCE(SUM(price), 0)::FLOAT8 FROM appointments
            WHERE ($1::BIGINT IS NULL OR business_id = $1)
              AND status = 'completed'
              AND ($2::TIMESTAMPTZ IS NULL OR completed_at >= $2)
              AND ($3::TIMESTAMPTZ IS NULL OR completed_at < $3)
            "#,
        )
        .bind(business_id)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(revenue)
    }
}
