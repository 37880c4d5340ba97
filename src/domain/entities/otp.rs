//! One-time passcode entity, repository trait and delivery port.
//!
//! Maps to the `otp_codes` table. Only a SHA-256 hash of the code is stored.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// What a code may be used for. A code issued for one purpose never
/// verifies another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    Login,
    PasswordReset,
    EmailVerification,
}

impl OtpPurpose {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "login" => Some(Self::Login),
            "password_reset" => Some(Self::PasswordReset),
            "email_verification" => Some(Self::EmailVerification),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::PasswordReset => "password_reset",
            Self::EmailVerification => "email_verification",
        }
    }
}

/// A stored passcode.
#[derive(Debug, Clone)]
pub struct OtpCode {
    pub id: i64,
    pub email: String,
    pub purpose: OtpPurpose,
    pub code_hash: String,
    pub attempts: i32,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl OtpCode {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }

    pub fn attempts_exhausted(&self, max_attempts: i32) -> bool {
        self.attempts >= max_attempts
    }
}

/// Repository trait for OTP code storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OtpRepository: Send + Sync {
    async fn create(&self, code: &OtpCode) -> Result<OtpCode, AppError>;

    /// Latest unconsumed code for an email and purpose, expired or not.
    async fn find_latest_active(&self, email: &str, purpose: OtpPurpose) -> Result<Option<OtpCode>, AppError>;

    /// Atomically take one attempt on an unconsumed code, returning the new
    /// count. `None` once `max_attempts` have been taken.
    async fn reserve_attempt(&self, id: i64, max_attempts: i32) -> Result<Option<i32>, AppError>;

    /// Mark a code used. Returns false if it was already consumed.
    async fn consume(&self, id: i64) -> Result<bool, AppError>;

    /// Drop codes that expired before `before`.
    async fn delete_expired(&self, before: DateTime<Utc>) -> Result<u64, AppError>;
}

/// Outbound channel for passcodes (email, SMS, ...).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OtpDelivery: Send + Sync {
    async fn deliver(&self, email: &str, purpose: OtpPurpose, code: &str) -> Result<(), AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_code_state() {
        let now = Utc::now();
        let code = OtpCode {
            id: 1,
            email: "a@b.co".into(),
            purpose: OtpPurpose::Login,
            code_hash: String::new(),
            attempts: 4,
            expires_at: now + Duration::minutes(5),
            consumed_at: None,
            created_at: now,
        };

        assert!(!code.is_expired(now));
        assert!(code.is_expired(now + Duration::minutes(5)));
        assert!(!code.attempts_exhausted(5));
        assert!(code.attempts_exhausted(4));
        assert!(!code.is_consumed());
    }

    #[test]
    fn test_purpose_parse() {
        assert_eq!(OtpPurpose::parse("PASSWORD_RESET"), Some(OtpPurpose::PasswordReset));
        assert_eq!(OtpPurpose::parse("signup"), None);
        assert_eq!(
            serde_json::to_string(&OtpPurpose::EmailVerification).unwrap(),
            "\"email_verification\""
        );
    }
}
