//! Authentication Service
//!
//! Registration, password login, JWT issuing with refresh-token rotation,
//! and the caller's own profile.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::application::dto::request::{RegisterRequest, UpdateProfileRequest};
use crate::config::JwtSettings;
use crate::domain::{
    normalize_email, Business, BusinessRepository, Role, Session, SessionRepository, User, UserRepository,
};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;
use crate::shared::validation::{field_error, require_id};

/// Authentication service trait for dependency injection
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Register a client of an existing business, or a business admin with a new business
    async fn register(&self, request: RegisterRequest) -> Result<(User, AuthTokens), AuthError>;

    /// Authenticate with email and password
    async fn login(&self, email: &str, password: &str) -> Result<(User, AuthTokens), AuthError>;

    /// Exchange a refresh token for a new pair (rotation)
    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, AuthError>;

    /// Revoke a refresh token
    async fn logout(&self, refresh_token: &str) -> Result<(), AuthError>;

    async fn get_profile(&self, user_id: i64) -> Result<User, AuthError>;

    async fn update_profile(&self, user_id: i64, request: UpdateProfileRequest) -> Result<User, AuthError>;

    async fn change_password(&self, user_id: i64, current: &str, new_password: &str) -> Result<(), AuthError>;

    /// Store a new avatar URL, returning the updated user and the previous URL
    async fn set_avatar(&self, user_id: i64, avatar_url: Option<String>) -> Result<(User, Option<String>), AuthError>;
}

/// Authentication tokens response
#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Account role
    pub role: String,
    /// Tenant; absent for super admins
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_id: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
    /// JWT ID
    pub jti: String,
}

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is deactivated")]
    AccountDisabled,

    #[error("Email already registered")]
    EmailExists,

    #[error("This role cannot be self-registered")]
    RoleNotAllowed,

    #[error("Business not found")]
    BusinessNotFound,

    #[error("Current password is incorrect")]
    WrongPassword,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid or expired refresh token")]
    SessionNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    App(#[from] AppError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::TokenExpired
            | AuthError::InvalidToken
            | AuthError::SessionNotFound => AppError::Unauthorized(err.to_string()),
            AuthError::AccountDisabled | AuthError::RoleNotAllowed => AppError::Forbidden(err.to_string()),
            AuthError::EmailExists => AppError::Conflict(err.to_string()),
            AuthError::BusinessNotFound | AuthError::UserNotFound => AppError::NotFound(err.to_string()),
            AuthError::WrongPassword => AppError::BadRequest(err.to_string()),
            AuthError::Internal(msg) => AppError::Internal(msg),
            AuthError::App(e) => e,
        }
    }
}

/// Hash a password using Argon2id
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AuthError::Internal(format!("Invalid password hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Hex SHA-256, used for refresh tokens and OTP codes at rest
pub fn sha256_hex(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Decode and validate an access token
pub fn decode_access_token(secret: &str, token: &str) -> Result<Claims, AuthError> {
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })
}

/// Issues access tokens and opaque refresh tokens for a user.
#[derive(Clone)]
pub struct TokenIssuer {
    settings: JwtSettings,
}

impl TokenIssuer {
    pub fn new(settings: JwtSettings) -> Self {
        Self { settings }
    }

    fn refresh_expiry(&self) -> DateTime<Utc> {
        Utc::now() + Duration::days(self.settings.refresh_token_expiry_days)
    }

    /// Token pair plus the hash of the refresh token.
    fn generate(&self, user: &User) -> Result<(AuthTokens, String), AuthError> {
        let now = Utc::now();
        let access_expiry = now + Duration::minutes(self.settings.access_token_expiry_minutes);

        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role.as_str().to_string(),
            business_id: user.business_id.map(|id| id.to_string()),
            exp: access_expiry.timestamp(),
            iat: now.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.settings.secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(format!("Token generation failed: {}", e)))?;

        // Opaque: carries no user data
        let refresh_token = format!("{}.{}", uuid::Uuid::new_v4(), uuid::Uuid::new_v4());
        let refresh_hash = sha256_hex(&refresh_token);

        Ok((
            AuthTokens {
                access_token,
                refresh_token,
                expires_in: self.settings.access_token_expiry_minutes * 60,
                token_type: "Bearer".to_string(),
            },
            refresh_hash,
        ))
    }

    /// Issue tokens and persist a new session for them.
    pub async fn start_session<S: SessionRepository + ?Sized>(
        &self,
        sessions: &S,
        user: &User,
    ) -> Result<AuthTokens, AuthError> {
        let (tokens, refresh_hash) = self.generate(user)?;
        let session = Session::new(user.id, refresh_hash, self.refresh_expiry());
        sessions.create(&session).await?;
        Ok(tokens)
    }

    /// Issue tokens for an existing session and rotate its refresh hash.
    pub async fn rotate_session<S: SessionRepository + ?Sized>(
        &self,
        sessions: &S,
        session: &Session,
        user: &User,
    ) -> Result<AuthTokens, AuthError> {
        let (tokens, refresh_hash) = self.generate(user)?;
        sessions
            .rotate(session.id, &refresh_hash, self.refresh_expiry())
            .await?;
        Ok(tokens)
    }

    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        decode_access_token(&self.settings.secret, token)
    }
}

/// AuthService implementation
pub struct AuthServiceImpl<U, B, S>
where
    U: UserRepository,
    B: BusinessRepository,
    S: SessionRepository,
{
    user_repo: Arc<U>,
    business_repo: Arc<B>,
    session_repo: Arc<S>,
    id_generator: Arc<SnowflakeGenerator>,
    tokens: TokenIssuer,
}

impl<U, B, S> AuthServiceImpl<U, B, S>
where
    U: UserRepository,
    B: BusinessRepository,
    S: SessionRepository,
{
    pub fn new(
        user_repo: Arc<U>,
        business_repo: Arc<B>,
        session_repo: Arc<S>,
        id_generator: Arc<SnowflakeGenerator>,
        jwt_settings: JwtSettings,
    ) -> Self {
        Self {
            user_repo,
            business_repo,
            session_repo,
            id_generator,
            tokens: TokenIssuer::new(jwt_settings),
        }
    }

    async fn load_user(&self, user_id: i64) -> Result<User, AuthError> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

#[async_trait]
impl<U, B, S> AuthService for AuthServiceImpl<U, B, S>
where
    U: UserRepository + 'static,
    B: BusinessRepository + 'static,
    S: SessionRepository + 'static,
{
    async fn register(&self, request: RegisterRequest) -> Result<(User, AuthTokens), AuthError> {
        let role = match request.role.as_deref() {
            None | Some("") => Role::Client,
            Some(raw) => Role::parse(raw).ok_or_else(|| field_error("role", "Invalid role"))?,
        };
        if !role.is_self_registrable() {
            return Err(AuthError::RoleNotAllowed);
        }

        let email = normalize_email(&request.email);
        if self.user_repo.email_exists(&email).await? {
            return Err(AuthError::EmailExists);
        }

        let now = Utc::now();
        let mut user = User {
            id: self.id_generator.generate(),
            business_id: None,
            role,
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            email,
            phone: request.phone,
            password_hash: hash_password(&request.password)?,
            created_at: now,
            updated_at: now,
            ..Default::default()
        };

        let created = match role {
            Role::BusinessAdmin => {
                let name = request
                    .business_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| field_error("business_name", "Business name is required"))?;

                let business = Business {
                    id: self.id_generator.generate(),
                    owner_id: user.id,
                    name: name.to_string(),
                    email: Some(user.email.clone()),
                    phone: user.phone.clone(),
                    created_at: now,
                    updated_at: now,
                    ..Default::default()
                };
                user.business_id = Some(business.id);

                let (business, owner) = self.business_repo.create_with_owner(&business, &user).await?;
                tracing::info!(business_id = business.id, user_id = owner.id, "Business registered");
                owner
            }
            _ => {
                let business_id = require_id(
                    "business_id",
                    request.business_id.as_deref(),
                    "Please select a business",
                )?;
                let business = self
                    .business_repo
                    .find_by_id(business_id)
                    .await?
                    .filter(|b| b.is_active)
                    .ok_or(AuthError::BusinessNotFound)?;
                user.business_id = Some(business.id);

                self.user_repo.create(&user).await?
            }
        };

        let tokens = self
            .tokens
            .start_session(self.session_repo.as_ref(), &created)
            .await?;

        Ok((created, tokens))
    }

    async fn login(&self, email: &str, password: &str) -> Result<(User, AuthTokens), AuthError> {
        let user = self
            .user_repo
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        let tokens = self
            .tokens
            .start_session(self.session_repo.as_ref(), &user)
            .await?;

        tracing::debug!(user_id = user.id, "User logged in");
        Ok((user, tokens))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, AuthError> {
        let session = self
            .session_repo
            .find_by_token_hash(&sha256_hex(refresh_token))
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        if !session.is_active() {
            return Err(AuthError::TokenExpired);
        }

        let user = self.load_user(session.user_id).await?;
        if !user.is_active {
            self.session_repo.revoke(session.id).await?;
            return Err(AuthError::AccountDisabled);
        }

        self.tokens
            .rotate_session(self.session_repo.as_ref(), &session, &user)
            .await
    }

    async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        let session = self
            .session_repo
            .find_by_token_hash(&sha256_hex(refresh_token))
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        self.session_repo.revoke(session.id).await?;
        Ok(())
    }

    async fn get_profile(&self, user_id: i64) -> Result<User, AuthError> {
        self.load_user(user_id).await
    }

    async fn update_profile(&self, user_id: i64, request: UpdateProfileRequest) -> Result<User, AuthError> {
        let mut user = self.load_user(user_id).await?;

        if let Some(first_name) = request.first_name {
            user.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = request.last_name {
            user.last_name = last_name.trim().to_string();
        }
        if let Some(phone) = request.phone {
            user.phone = Some(phone).filter(|p| !p.trim().is_empty());
        }
        if let Some(address) = request.address {
            user.address = address;
        }
        user.updated_at = Utc::now();

        Ok(self.user_repo.update(&user).await?)
    }

    async fn change_password(&self, user_id: i64, current: &str, new_password: &str) -> Result<(), AuthError> {
        let user = self.load_user(user_id).await?;

        if !verify_password(current, &user.password_hash)? {
            return Err(AuthError::WrongPassword);
        }

        let hash = hash_password(new_password)?;
        self.user_repo.update_password(user.id, &hash).await?;

        tracing::info!(user_id, "Password changed");
        Ok(())
    }

    async fn set_avatar(&self, user_id: i64, avatar_url: Option<String>) -> Result<(User, Option<String>), AuthError> {
        let previous = self.load_user(user_id).await?.avatar_url;
        let user = self.user_repo.update_avatar(user_id, avatar_url).await?;
        Ok((user, previous))
    }
}
