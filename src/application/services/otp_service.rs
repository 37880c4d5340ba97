//! One-time passcode service
//!
//! Passwordless login, email verification and password reset by a 6-digit
//! code sent through an [`OtpDelivery`] port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::Rng;

use super::auth_service::{hash_password, sha256_hex, AuthError, AuthTokens, TokenIssuer};
use crate::config::{JwtSettings, OtpSettings};
use crate::domain::{
    normalize_email, OtpCode, OtpDelivery, OtpPurpose, OtpRepository, SessionRepository, User, UserRepository,
};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

#[async_trait]
pub trait OtpService: Send + Sync {
    /// Issue and deliver a code. Unknown emails get the same answer as known ones.
    async fn send(&self, email: &str, purpose: OtpPurpose) -> Result<(), OtpError>;

    /// Check a code and apply its purpose.
    async fn verify(&self, email: &str, code: &str, purpose: OtpPurpose) -> Result<OtpVerification, OtpError>;

    /// Consume a password-reset code and set a new password.
    async fn reset_password(&self, email: &str, code: &str, new_password: &str) -> Result<(), OtpError>;
}

/// Result of a successful verification.
#[derive(Debug)]
pub enum OtpVerification {
    /// Login code: the user and a fresh token pair
    LoggedIn(User, AuthTokens),
    /// Email verification code: the user is now verified
    EmailVerified,
    /// Password reset code is valid; it stays usable for the reset itself
    ResetAllowed,
}

#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    #[error("Invalid or expired code")]
    InvalidCode,

    #[error("Code has expired, please request a new one")]
    Expired,

    #[error("Too many failed attempts, please request a new code")]
    TooManyAttempts,

    #[error("Please wait {0} seconds before requesting another code")]
    Cooldown(i64),

    #[error("Account is deactivated")]
    AccountDisabled,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    App(#[from] AppError),
}

impl From<OtpError> for AppError {
    fn from(err: OtpError) -> Self {
        match err {
            OtpError::InvalidCode | OtpError::Expired | OtpError::TooManyAttempts => {
                AppError::BadRequest(err.to_string())
            }
            OtpError::Cooldown(_) => AppError::TooManyRequests(err.to_string()),
            OtpError::AccountDisabled => AppError::Forbidden(err.to_string()),
            OtpError::Auth(e) => e.into(),
            OtpError::App(e) => e,
        }
    }
}

/// Uniform 6-digit code, zero padded.
pub fn generate_code() -> String {
    format!("{:06}", rand::rng().random_range(0..1_000_000))
}

pub struct OtpServiceImpl<U, O, S, D>
where
    U: UserRepository,
    O: OtpRepository,
    S: SessionRepository,
    D: OtpDelivery,
{
    user_repo: Arc<U>,
    otp_repo: Arc<O>,
    session_repo: Arc<S>,
    delivery: Arc<D>,
    id_generator: Arc<SnowflakeGenerator>,
    settings: OtpSettings,
    tokens: TokenIssuer,
}

impl<U, O, S, D> OtpServiceImpl<U, O, S, D>
where
    U: UserRepository,
    O: OtpRepository,
    S: SessionRepository,
    D: OtpDelivery,
{
    pub fn new(
        user_repo: Arc<U>,
        otp_repo: Arc<O>,
        session_repo: Arc<S>,
        delivery: Arc<D>,
        id_generator: Arc<SnowflakeGenerator>,
        settings: OtpSettings,
        jwt_settings: JwtSettings,
    ) -> Self {
        Self {
            user_repo,
            otp_repo,
            session_repo,
            delivery,
            id_generator,
            settings,
            tokens: TokenIssuer::new(jwt_settings),
        }
    }

    /// Validate the latest code for `email`/`purpose`. Every guess takes an
    /// attempt before the hash is compared. Consumes the code when `consume` is set.
    async fn check_code(&self, email: &str, code: &str, purpose: OtpPurpose, consume: bool) -> Result<(), OtpError> {
        let stored = self
            .otp_repo
            .find_latest_active(email, purpose)
            .await?
            .ok_or(OtpError::InvalidCode)?;

        if stored.is_expired(Utc::now()) {
            return Err(OtpError::Expired);
        }
        if stored.attempts_exhausted(self.settings.max_attempts) {
            return Err(OtpError::TooManyAttempts);
        }

        let attempts = self
            .otp_repo
            .reserve_attempt(stored.id, self.settings.max_attempts)
            .await?
            .ok_or(OtpError::TooManyAttempts)?;

        if sha256_hex(code) != stored.code_hash {
            tracing::debug!(otp_id = stored.id, attempts, "Wrong OTP code");
            return Err(if attempts >= self.settings.max_attempts {
                OtpError::TooManyAttempts
            } else {
                OtpError::InvalidCode
            });
        }

        if consume && !self.otp_repo.consume(stored.id).await? {
            return Err(OtpError::InvalidCode);
        }

        Ok(())
    }

    async fn active_user(&self, email: &str) -> Result<User, OtpError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(OtpError::InvalidCode)?;
        if !user.is_active {
            return Err(OtpError::AccountDisabled);
        }
        Ok(user)
    }
}

#[async_trait]
impl<U, O, S, D> OtpService for OtpServiceImpl<U, O, S, D>
where
    U: UserRepository + 'static,
    O: OtpRepository + 'static,
    S: SessionRepository + 'static,
    D: OtpDelivery + 'static,
{
    async fn send(&self, email: &str, purpose: OtpPurpose) -> Result<(), OtpError> {
        let email = normalize_email(email);
        let now = Utc::now();

        if let Some(latest) = self.otp_repo.find_latest_active(&email, purpose).await? {
            let ready_at = latest.created_at + Duration::seconds(self.settings.resend_cooldown_seconds);
            if ready_at > now {
                return Err(OtpError::Cooldown((ready_at - now).num_seconds().max(1)));
            }
        }

        let deliverable = matches!(
            self.user_repo.find_by_email(&email).await?,
            Some(user) if user.is_active
        );

        // Unknown accounts get an undelivered code so the cooldown applies to them too.
        let code = generate_code();
        let otp = OtpCode {
            id: self.id_generator.generate(),
            email: email.clone(),
            purpose,
            code_hash: sha256_hex(&code),
            attempts: 0,
            expires_at: now + Duration::minutes(self.settings.expiry_minutes),
            consumed_at: None,
            created_at: now,
        };
        self.otp_repo.create(&otp).await?;

        if !deliverable {
            tracing::debug!(purpose = purpose.as_str(), "OTP requested for unknown or inactive account");
            return Ok(());
        }
        self.delivery.deliver(&email, purpose, &code).await?;

        tracing::info!(otp_id = otp.id, purpose = purpose.as_str(), "OTP issued");
        Ok(())
    }

    async fn verify(&self, email: &str, code: &str, purpose: OtpPurpose) -> Result<OtpVerification, OtpError> {
        let email = normalize_email(email);

        match purpose {
            OtpPurpose::Login => {
                self.check_code(&email, code, purpose, true).await?;
                let user = self.active_user(&email).await?;
                let tokens = self
                    .tokens
                    .start_session(self.session_repo.as_ref(), &user)
                    .await?;
                Ok(OtpVerification::LoggedIn(user, tokens))
            }
            OtpPurpose::EmailVerification => {
                self.check_code(&email, code, purpose, true).await?;
                let user = self.active_user(&email).await?;
                self.user_repo.mark_email_verified(user.id).await?;
                tracing::info!(user_id = user.id, "Email verified");
                Ok(OtpVerification::EmailVerified)
            }
            OtpPurpose::PasswordReset => {
                self.check_code(&email, code, purpose, false).await?;
                Ok(OtpVerification::ResetAllowed)
            }
        }
    }

    async fn reset_password(&self, email: &str, code: &str, new_password: &str) -> Result<(), OtpError> {
        let email = normalize_email(email);

        self.check_code(&email, code, OtpPurpose::PasswordReset, true).await?;
        let user = self.active_user(&email).await?;

        let hash = hash_password(new_password)?;
        self.user_repo.update_password(user.id, &hash).await?;
        let revoked = self.session_repo.revoke_all_for_user(user.id).await?;

        tracing::info!(user_id = user.id, revoked_sessions = revoked, "Password reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MockOtpDelivery, MockOtpRepository, MockSessionRepository, MockUserRepository};
    use mockall::predicate::eq;

    type Svc = OtpServiceImpl<MockUserRepository, MockOtpRepository, MockSessionRepository, MockOtpDelivery>;

    fn settings() -> OtpSettings {
        OtpSettings {
            expiry_minutes: 10,
            max_attempts: 3,
            resend_cooldown_seconds: 60,
        }
    }

    fn jwt() -> JwtSettings {
        JwtSettings {
            secret: "test-secret-that-is-at-least-32-characters-long".into(),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 7,
        }
    }

    fn service(
        users: MockUserRepository,
        otps: MockOtpRepository,
        sessions: MockSessionRepository,
        delivery: MockOtpDelivery,
    ) -> Svc {
        OtpServiceImpl::new(
            Arc::new(users),
            Arc::new(otps),
            Arc::new(sessions),
            Arc::new(delivery),
            Arc::new(SnowflakeGenerator::new(1, 1)),
            settings(),
            jwt(),
        )
    }

    fn stored(code: &str, age_seconds: i64, attempts: i32) -> OtpCode {
        let created_at = Utc::now() - Duration::seconds(age_seconds);
        OtpCode {
            id: 11,
            email: "dana@example.com".into(),
            purpose: OtpPurpose::Login,
            code_hash: sha256_hex(code),
            attempts,
            expires_at: created_at + Duration::minutes(10),
            consumed_at: None,
            created_at,
        }
    }

    fn known_user() -> MockUserRepository {
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(|email| {
            Ok(Some(User {
                id: 5,
                email: email.to_string(),
                ..Default::default()
            }))
        });
        users
    }

    #[test]
    fn test_generate_code_is_six_digits() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn test_send_delivers_code() {
        let mut otps = MockOtpRepository::new();
        otps.expect_find_latest_active().returning(|_, _| Ok(None));
        otps.expect_create()
            .withf(|code| code.email == "dana@example.com" && code.attempts == 0)
            .returning(|c| Ok(c.clone()));

        let mut delivery = MockOtpDelivery::new();
        delivery
            .expect_deliver()
            .withf(|email, purpose, code| email == "dana@example.com" && *purpose == OtpPurpose::Login && code.len() == 6)
            .times(1)
            .returning(|_, _, _| Ok(()));

        let svc = service(known_user(), otps, MockSessionRepository::new(), delivery);
        svc.send(" Dana@Example.com ", OtpPurpose::Login).await.unwrap();
    }

    #[tokio::test]
    async fn test_send_unknown_email_is_silent() {
        let mut otps = MockOtpRepository::new();
        otps.expect_find_latest_active().returning(|_, _| Ok(None));
        otps.expect_create().times(1).returning(|c| Ok(c.clone()));

        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(|_| Ok(None));

        let mut delivery = MockOtpDelivery::new();
        delivery.expect_deliver().never();

        let svc = service(users, otps, MockSessionRepository::new(), delivery);
        assert!(svc.send("ghost@example.com", OtpPurpose::PasswordReset).await.is_ok());
    }

    #[tokio::test]
    async fn test_send_within_cooldown_is_rate_limited() {
        let mut otps = MockOtpRepository::new();
        otps.expect_find_latest_active()
            .returning(|_, _| Ok(Some(stored("123456", 10, 0))));

        let svc = service(MockUserRepository::new(), otps, MockSessionRepository::new(), MockOtpDelivery::new());
        let err = svc.send("dana@example.com", OtpPurpose::Login).await.unwrap_err();

        assert!(matches!(err, OtpError::Cooldown(_)));
        assert_eq!(AppError::from(err).status_code(), axum::http::StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_wrong_code_counts_attempt() {
        let mut otps = MockOtpRepository::new();
        otps.expect_find_latest_active()
            .returning(|_, _| Ok(Some(stored("123456", 5, 0))));
        otps.expect_reserve_attempt().with(eq(11), eq(3)).returning(|_, _| Ok(Some(1)));
        otps.expect_consume().never();

        let svc = service(MockUserRepository::new(), otps, MockSessionRepository::new(), MockOtpDelivery::new());
        let err = svc.verify("dana@example.com", "654321", OtpPurpose::Login).await.unwrap_err();

        assert!(matches!(err, OtpError::InvalidCode));
    }

    #[tokio::test]
    async fn test_last_wrong_attempt_burns_code() {
        let mut otps = MockOtpRepository::new();
        otps.expect_find_latest_active()
            .returning(|_, _| Ok(Some(stored("123456", 5, 2))));
        otps.expect_reserve_attempt().returning(|_, _| Ok(Some(3)));

        let svc = service(MockUserRepository::new(), otps, MockSessionRepository::new(), MockOtpDelivery::new());
        let err = svc.verify("dana@example.com", "000000", OtpPurpose::Login).await.unwrap_err();

        assert!(matches!(err, OtpError::TooManyAttempts));
    }

    #[tokio::test]
    async fn test_expired_code() {
        let mut otps = MockOtpRepository::new();
        otps.expect_find_latest_active()
            .returning(|_, _| Ok(Some(stored("123456", 3600, 0))));

        let svc = service(MockUserRepository::new(), otps, MockSessionRepository::new(), MockOtpDelivery::new());
        let err = svc.verify("dana@example.com", "123456", OtpPurpose::Login).await.unwrap_err();

        assert!(matches!(err, OtpError::Expired));
    }

    #[tokio::test]
    async fn test_login_code_issues_tokens() {
        let mut otps = MockOtpRepository::new();
        otps.expect_find_latest_active()
            .returning(|_, _| Ok(Some(stored("123456", 5, 0))));
        otps.expect_reserve_attempt().returning(|_, _| Ok(Some(1)));
        otps.expect_consume().with(eq(11)).returning(|_| Ok(true));

        let mut sessions = MockSessionRepository::new();
        sessions.expect_create().times(1).returning(|s| Ok(s.clone()));

        let svc = service(known_user(), otps, sessions, MockOtpDelivery::new());
        match svc.verify("dana@example.com", "123456", OtpPurpose::Login).await.unwrap() {
            OtpVerification::LoggedIn(user, tokens) => {
                assert_eq!(user.id, 5);
                assert_eq!(tokens.token_type, "Bearer");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reset_password_revokes_sessions() {
        let mut otps = MockOtpRepository::new();
        otps.expect_find_latest_active()
            .returning(|_, _| Ok(Some(stored("123456", 5, 0))));
        otps.expect_reserve_attempt().returning(|_, _| Ok(Some(1)));
        otps.expect_consume().returning(|_| Ok(true));

        let mut users = known_user();
        users.expect_update_password().withf(|id, _| *id == 5).times(1).returning(|_, _| Ok(()));

        let mut sessions = MockSessionRepository::new();
        sessions.expect_revoke_all_for_user().with(eq(5)).times(1).returning(|_| Ok(2));

        let svc = service(users, otps, sessions, MockOtpDelivery::new());
        svc.reset_password("dana@example.com", "123456", "new-password-1").await.unwrap();
    }

    /// In-memory code table shared by the mock's closures.
    fn recording_otps() -> MockOtpRepository {
        let table: Arc<std::sync::Mutex<Option<OtpCode>>> = Arc::default();
        let mut otps = MockOtpRepository::new();
        let latest = table.clone();
        otps.expect_find_latest_active()
            .returning(move |_, _| Ok(latest.lock().unwrap().clone()));
        otps.expect_create().returning(move |code| {
            *table.lock().unwrap() = Some(code.clone());
            Ok(code.clone())
        });
        otps
    }

    #[tokio::test]
    async fn test_resend_answers_the_same_for_known_and_unknown_emails() {
        let mut delivery = MockOtpDelivery::new();
        delivery.expect_deliver().times(1).returning(|_, _, _| Ok(()));
        let known = service(known_user(), recording_otps(), MockSessionRepository::new(), delivery);

        let mut nobody = MockUserRepository::new();
        nobody.expect_find_by_email().returning(|_| Ok(None));
        let mut silent = MockOtpDelivery::new();
        silent.expect_deliver().never();
        let unknown = service(nobody, recording_otps(), MockSessionRepository::new(), silent);

        for svc in [&known, &unknown] {
            assert!(svc.send("dana@example.com", OtpPurpose::PasswordReset).await.is_ok());
            let second = svc.send("dana@example.com", OtpPurpose::PasswordReset).await;
            assert!(matches!(second, Err(OtpError::Cooldown(_))));
        }
    }

    #[tokio::test]
    async fn test_concurrent_guesses_are_bounded_by_max_attempts() {
        use std::sync::atomic::{AtomicI32, Ordering};

        let taken = Arc::new(AtomicI32::new(0));
        let compared = Arc::new(AtomicI32::new(0));

        let mut otps = MockOtpRepository::new();
        // Every reader sees the untouched row, as concurrent requests would.
        otps.expect_find_latest_active()
            .returning(|_, _| Ok(Some(stored("123456", 5, 0))));
        let counter = taken.clone();
        let granted = compared.clone();
        otps.expect_reserve_attempt().returning(move |_, max| {
            let reserved = counter
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| (n < max).then_some(n + 1))
                .ok()
                .map(|n| n + 1);
            if reserved.is_some() {
                granted.fetch_add(1, Ordering::SeqCst);
            }
            Ok(reserved)
        });
        otps.expect_consume().never();

        let svc = service(MockUserRepository::new(), otps, MockSessionRepository::new(), MockOtpDelivery::new());
        let guesses = (0..50).map(|i| {
            let code = format!("{:06}", 200_000 + i);
            let svc = &svc;
            async move { svc.verify("dana@example.com", &code, OtpPurpose::Login).await }
        });
        let results = futures::future::join_all(guesses).await;

        assert!(results.iter().all(|r| r.is_err()));
        assert_eq!(compared.load(Ordering::SeqCst), settings().max_attempts);
        let exhausted = results
            .iter()
            .filter(|r| matches!(r, Err(OtpError::TooManyAttempts)))
            .count();
        assert_eq!(exhausted, 50 - 2);
    }
}
