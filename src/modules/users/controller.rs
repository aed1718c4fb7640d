use axum::Json;
use axum::extract::{Path, Query, State};
use tracing::instrument;
use uuid::Uuid;

use rollcall_core::{AppError, UserRole};
use rollcall_models::MessageResponse;
use rollcall_models::users::{
    ChangePasswordDto, LinkedStudent, PaginatedUsersResponse, UpdateProfileDto,
    UpdateUserStatusDto, User, UserFilterParams, UserWithProfile,
};

use super::service::UserService;
use crate::docs::ErrorResponse;
use crate::middleware::auth::AuthUser;
use crate::middleware::role::check_any_role;
use crate::state::AppState;
use crate::validator::ValidatedJson;

/// List users of the caller's institution
#[utoipa::path(
    get,
    path = "/api/users",
    params(UserFilterParams),
    responses(
        (status = 200, description = "Paginated users", body = PaginatedUsersResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Admin only", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn list_users(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(filters): Query<UserFilterParams>,
) -> Result<Json<PaginatedUsersResponse>, AppError> {
    check_any_role(&auth_user, &[UserRole::Admin])?;
    let users = UserService::list_users(&state.db, auth_user.institution_id(), filters).await?;
    Ok(Json(users))
}

/// Get a user with their profile
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User with profile", body = UserWithProfile),
        (status = 403, description = "Admin only", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserWithProfile>, AppError> {
    check_any_role(&auth_user, &[UserRole::Admin])?;
    let user = UserService::get_user_with_profile(&state.db, auth_user.institution_id(), id).await?;
    Ok(Json(user))
}

/// Activate or deactivate a user
#[utoipa::path(
    patch,
    path = "/api/users/{id}/status",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserStatusDto,
    responses(
        (status = 200, description = "Status updated", body = User),
        (status = 400, description = "Cannot deactivate yourself", body = ErrorResponse),
        (status = 403, description = "Admin only", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn update_user_status(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateUserStatusDto>,
) -> Result<Json<User>, AppError> {
    check_any_role(&auth_user, &[UserRole::Admin])?;
    let user = UserService::set_status(
        &state.db,
        auth_user.institution_id(),
        auth_user.user_id()?,
        id,
        dto.is_active,
    )
    .await?;
    Ok(Json(user))
}

/// Update your own name or phone
#[utoipa::path(
    put,
    path = "/api/users/me",
    request_body = UpdateProfileDto,
    responses(
        (status = 200, description = "Profile updated", body = User),
        (status = 400, description = "Phone number already registered", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn update_me(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<UpdateProfileDto>,
) -> Result<Json<User>, AppError> {
    let user = UserService::update_profile(
        &state.db,
        auth_user.institution_id(),
        auth_user.user_id()?,
        dto,
    )
    .await?;
    Ok(Json(user))
}

/// Change your password
#[utoipa::path(
    put,
    path = "/api/users/me/password",
    request_body = ChangePasswordDto,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Current password is incorrect", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn change_password(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<ChangePasswordDto>,
) -> Result<Json<MessageResponse>, AppError> {
    UserService::change_password(&state.db, auth_user.user_id()?, dto).await?;
    Ok(Json(MessageResponse::new("Password changed successfully")))
}

/// List the students linked to a parent account
#[utoipa::path(
    get,
    path = "/api/users/me/children",
    responses(
        (status = 200, description = "Linked students", body = Vec<LinkedStudent>),
        (status = 403, description = "Parents only", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn my_children(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Vec<LinkedStudent>>, AppError> {
    check_any_role(&auth_user, &[UserRole::Parent])?;
    let children = UserService::get_children(&state.db, auth_user.user_id()?).await?;
    Ok(Json(children))
}
