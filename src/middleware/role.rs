//! Role checks, as route middleware and as a plain helper.

use axum::{
    extract::{FromRequestParts, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use rollcall_core::{AppError, UserRole};

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Rejects the request unless the token's role is one of `allowed_roles`.
pub async fn require_roles(
    state: AppState,
    req: Request,
    next: Next,
    allowed_roles: &[UserRole],
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();
    let auth_user = AuthUser::from_request_parts(&mut parts, &state).await?;

    check_any_role(&auth_user, allowed_roles)?;

    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// Admin-only routes.
pub async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> Response {
    require_roles(state, req, next, &[UserRole::Admin])
        .await
        .unwrap_or_else(IntoResponse::into_response)
}

pub fn check_any_role(auth_user: &AuthUser, allowed_roles: &[UserRole]) -> Result<(), AppError> {
    if allowed_roles.contains(&auth_user.role()) {
        return Ok(());
    }

    let allowed = allowed_roles
        .iter()
        .map(UserRole::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    Err(AppError::forbidden(format!(
        "Access denied. Required role: {}",
        allowed
    )))
}
