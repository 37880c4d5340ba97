//! Authentication Middleware
//!
//! JWT validation middleware for protected routes.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::application::services::{decode_access_token, Claims};
use crate::domain::services::Actor;
use crate::domain::Role;
use crate::shared::error::AppError;
use crate::shared::snowflake::parse_id;
use crate::startup::AppState;

/// Authenticated user extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i64,
    pub role: Role,
    pub business_id: Option<i64>,
}

impl AuthUser {
    /// Caller identity as seen by the domain access policy.
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.role, self.business_id)
    }
}

impl TryFrom<Claims> for AuthUser {
    type Error = AppError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let invalid = || AppError::Unauthorized("Invalid token claims".into());

        let user_id = parse_id(&claims.sub).ok_or_else(invalid)?;
        let role = Role::parse(&claims.role).ok_or_else(invalid)?;
        let business_id = match claims.business_id.as_deref() {
            Some(raw) => Some(parse_id(raw).ok_or_else(invalid)?),
            None => None,
        };

        Ok(Self {
            user_id,
            role,
            business_id,
        })
    }
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".into()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization header format".into()))?;

    let claims = decode_access_token(&state.settings.jwt.secret, token)?;
    let user = AuthUser::try_from(claims)?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn claims(sub: &str, role: &str, business_id: Option<&str>) -> Claims {
        Claims {
            sub: sub.into(),
            role: role.into(),
            business_id: business_id.map(Into::into),
            exp: 0,
            iat: 0,
            jti: "jti".into(),
        }
    }

    #[test]
    fn test_claims_become_auth_user() {
        let user = AuthUser::try_from(claims("42", "staff", Some("7"))).unwrap();

        assert_eq!(
            user,
            AuthUser {
                user_id: 42,
                role: Role::Staff,
                business_id: Some(7),
            }
        );
        assert_eq!(user.actor().business_id, Some(7));
    }

    #[test]
    fn test_super_admin_has_no_business() {
        let user = AuthUser::try_from(claims("1", "super_admin", None)).unwrap();
        assert_eq!(user.business_id, None);
    }

    #[test]
    fn test_bad_claims_are_unauthorized() {
        assert!(matches!(
            AuthUser::try_from(claims("abc", "staff", None)),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            AuthUser::try_from(claims("1", "owner", None)),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            AuthUser::try_from(claims("1", "client", Some("x"))),
            Err(AppError::Unauthorized(_))
        ));
    }
}
