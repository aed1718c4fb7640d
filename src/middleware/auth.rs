use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use uuid::Uuid;

use rollcall_auth::{Claims, verify_token};
use rollcall_core::{AppError, UserRole};

use crate::modules::sections::service::Viewer;
use crate::state::AppState;

/// Extractor that validates the bearer token and exposes its claims.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.0.sub)
            .map_err(|_| AppError::unauthorized("Invalid user ID in token"))
    }

    pub fn role(&self) -> UserRole {
        self.0.role
    }

    pub fn institution_id(&self) -> Uuid {
        self.0.institution_id
    }

    pub fn email(&self) -> &str {
        &self.0.email
    }

    pub fn is_admin(&self) -> bool {
        self.0.role == UserRole::Admin
    }

    pub fn viewer(&self) -> Result<Viewer, AppError> {
        Ok(Viewer {
            institution_id: self.institution_id(),
            user_id: self.user_id()?,
            role: self.role(),
        })
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("Invalid authorization header format"))?;

        let claims = verify_token(token, &state.jwt_config)?;

        Ok(AuthUser(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: UserRole) -> Claims {
        Claims {
            sub: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role,
            institution_id: Uuid::new_v4(),
            exp: 9999999999,
            iat: 1234567890,
        }
    }

    #[test]
    fn test_user_id() {
        let user_id = Uuid::new_v4();
        let auth_user = AuthUser(Claims {
            sub: user_id.to_string(),
            ..claims(UserRole::Student)
        });
        assert_eq!(auth_user.user_id().unwrap(), user_id);
    }

    #[test]
    fn test_invalid_subject_is_unauthorized() {
        let auth_user = AuthUser(Claims {
            sub: "not-a-uuid".to_string(),
            ..claims(UserRole::Admin)
        });
        assert_eq!(auth_user.user_id().unwrap_err().status.as_u16(), 401);
    }

    #[test]
    fn test_role_helpers() {
        assert!(AuthUser(claims(UserRole::Admin)).is_admin());
        assert!(!AuthUser(claims(UserRole::Faculty)).is_admin());
        assert_eq!(AuthUser(claims(UserRole::Parent)).role(), UserRole::Parent);
    }
}
