//! OTP Repository Implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{OtpCode, OtpPurpose, OtpRepository};
use crate::shared::error::AppError;

const OTP_COLUMNS: &str = "id, email, purpose, code_hash, attempts, expires_at, consumed_at, created_at";

#[derive(Debug, sqlx::FromRow)]
struct OtpRow {
    id: i64,
    email: String,
    purpose: String,
    code_hash: String,
    attempts: i32,
    expires_at: DateTime<Utc>,
    consumed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl OtpRow {
    fn into_code(self) -> Result<OtpCode, AppError> {
        let purpose = OtpPurpose::parse(&self.purpose)
            .ok_or_else(|| AppError::Internal(format!("Unknown OTP purpose '{}'", self.purpose)))?;

        Ok(OtpCode {
            id: self.id,
            email: self.email,
            purpose,
            code_hash: self.code_hash,
            attempts: self.attempts,
            expires_at: self.expires_at,
            consumed_at: self.consumed_at,
            created_at: self.created_at,
        })
    }
}

/// PostgreSQL OTP code repository implementation.
#[derive(Clone)]
pub struct PgOtpRepository {
    pool: PgPool,
}

impl PgOtpRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OtpRepository for PgOtpRepository {
    async fn create(&self, code: &OtpCode) -> Result<OtpCode, AppError> {
        let sql = format!(
            r#"
            INSERT INTO otp_codes (id, email, purpose, code_hash, attempts, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {OTP_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, OtpRow>(&sql)
            .bind(code.id)
            .bind(&code.email)
            .bind(code.purpose.as_str())
            .bind(&code.code_hash)
            .bind(code.attempts)
            .bind(code.expires_at)
            .fetch_one(&self.pool)
            .await?;

        row.into_code()
    }

    async fn find_latest_active(&self, email: &str, purpose: OtpPurpose) -> Result<Option<OtpCode>, AppError> {
        let sql = format!(
            r#"
            SELECT {OTP_COLUMNS} FROM otp_codes
            WHERE email = $1 AND purpose = $2 AND consumed_at IS NULL
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#
        );
        let row = sqlx::query_as::<_, OtpRow>(&sql)
            .bind(email)
            .bind(purpose.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(OtpRow::into_code).transpose()
    }

    async fn reserve_attempt(&self, id: i64, max_attempts: i32) -> Result<Option<i32>, AppError> {
        let attempts = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE otp_codes SET attempts = attempts + 1
            WHERE id = $1 AND consumed_at IS NULL AND attempts < $2
            RETURNING attempts
            "#,
        )
        .bind(id)
        .bind(max_attempts)
        .fetch_optional(&self.pool)
        .await?;

        Ok(attempts)
    }

    async fn consume(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE otp_codes SET consumed_at = NOW() WHERE id = $1 AND consumed_at IS NULL")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_expired(&self, before: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM otp_codes WHERE expires_at < $1")
            .bind(before)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
