use axum::Json;
use axum::extract::State;
use tracing::instrument;

use rollcall_core::{AppError, UserRole};
use rollcall_models::institutions::{Institution, UpdateInstitutionDto};

use super::service::InstitutionService;
use crate::docs::ErrorResponse;
use crate::middleware::auth::AuthUser;
use crate::middleware::role::check_any_role;
use crate::state::AppState;
use crate::validator::ValidatedJson;

/// Get the caller's institution
#[utoipa::path(
    get,
    path = "/api/institution",
    responses(
        (status = 200, description = "Institution", body = Institution),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "Institution",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_institution(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Institution>, AppError> {
    let institution =
        InstitutionService::get_institution(&state.db, auth_user.institution_id()).await?;
    Ok(Json(institution))
}

/// Update the institution's name, address or contact email
#[utoipa::path(
    put,
    path = "/api/institution",
    request_body = UpdateInstitutionDto,
    responses(
        (status = 200, description = "Institution updated", body = Institution),
        (status = 403, description = "Admin only", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Institution",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn update_institution(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<UpdateInstitutionDto>,
) -> Result<Json<Institution>, AppError> {
    check_any_role(&auth_user, &[UserRole::Admin])?;
    let institution =
        InstitutionService::update_institution(&state.db, auth_user.institution_id(), dto).await?;
    Ok(Json(institution))
}
