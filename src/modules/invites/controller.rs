use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use tracing::instrument;
use uuid::Uuid;

use rollcall_core::{AppError, PaginationParams};
use rollcall_models::invites::{CreateInviteDto, InviteResponse, PaginatedInvitesResponse};

use super::service::InviteService;
use crate::docs::ErrorResponse;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;
use crate::validator::ValidatedJson;

/// Create an invite code
#[utoipa::path(
    post,
    path = "/api/invites",
    request_body = CreateInviteDto,
    responses(
        (status = 201, description = "Invite created", body = InviteResponse),
        (status = 400, description = "Invite code already exists", body = ErrorResponse),
        (status = 403, description = "Admin only", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Invites",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn create_invite(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateInviteDto>,
) -> Result<(StatusCode, Json<InviteResponse>), AppError> {
    let invite = InviteService::create_invite(
        &state.db,
        auth_user.institution_id(),
        auth_user.user_id()?,
        dto,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(invite)))
}

/// List invite codes, newest first
#[utoipa::path(
    get,
    path = "/api/invites",
    params(PaginationParams),
    responses(
        (status = 200, description = "Paginated invites", body = PaginatedInvitesResponse),
        (status = 403, description = "Admin only", body = ErrorResponse)
    ),
    tag = "Invites",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn list_invites(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<PaginatedInvitesResponse>, AppError> {
    let invites =
        InviteService::list_invites(&state.db, auth_user.institution_id(), pagination).await?;
    Ok(Json(invites))
}

/// Revoke an invite code
#[utoipa::path(
    delete,
    path = "/api/invites/{id}",
    params(("id" = Uuid, Path, description = "Invite ID")),
    responses(
        (status = 200, description = "Invite revoked", body = InviteResponse),
        (status = 403, description = "Admin only", body = ErrorResponse),
        (status = 404, description = "Invite not found", body = ErrorResponse)
    ),
    tag = "Invites",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn revoke_invite(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<InviteResponse>, AppError> {
    let invite = InviteService::revoke_invite(&state.db, auth_user.institution_id(), id).await?;
    Ok(Json(invite))
}
