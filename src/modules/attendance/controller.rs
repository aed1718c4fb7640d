use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use tracing::instrument;
use uuid::Uuid;

use rollcall_core::{AppError, UserRole};
use rollcall_models::MessageResponse;
use rollcall_models::attendance::{
    AttendanceSession, AttendanceSummary, CreateSessionDto, MarkPunchesDto, MarkPunchesResponse,
    PaginatedSessionsResponse, SessionDetail, SessionFilterParams, SummaryParams,
};

use super::service::AttendanceService;
use crate::docs::ErrorResponse;
use crate::middleware::auth::AuthUser;
use crate::middleware::role::check_any_role;
use crate::state::AppState;
use crate::validator::ValidatedJson;

const STAFF: &[UserRole] = &[UserRole::Faculty, UserRole::Admin];

/// Open an attendance session for a section
#[utoipa::path(
    post,
    path = "/api/attendance/sessions",
    request_body = CreateSessionDto,
    responses(
        (status = 201, description = "Session created", body = AttendanceSession),
        (status = 400, description = "Session already exists", body = ErrorResponse),
        (status = 403, description = "Not assigned to the section", body = ErrorResponse),
        (status = 404, description = "Section not found", body = ErrorResponse),
        (status = 422, description = "Date in the future", body = ErrorResponse)
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn create_session(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateSessionDto>,
) -> Result<(StatusCode, Json<AttendanceSession>), AppError> {
    check_any_role(&auth_user, STAFF)?;
    let session = AttendanceService::create_session(&state.db, auth_user.viewer()?, dto).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// List attendance sessions
#[utoipa::path(
    get,
    path = "/api/attendance/sessions",
    params(SessionFilterParams),
    responses(
        (status = 200, description = "Paginated sessions", body = PaginatedSessionsResponse),
        (status = 403, description = "Faculty or admin only", body = ErrorResponse)
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn list_sessions(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(filters): Query<SessionFilterParams>,
) -> Result<Json<PaginatedSessionsResponse>, AppError> {
    check_any_role(&auth_user, STAFF)?;
    let sessions = AttendanceService::list_sessions(&state.db, auth_user.viewer()?, filters).await?;
    Ok(Json(sessions))
}

/// Get a session with its punches and unmarked students
#[utoipa::path(
    get,
    path = "/api/attendance/sessions/{id}",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session detail", body = SessionDetail),
        (status = 403, description = "Not assigned to the section", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_session(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionDetail>, AppError> {
    check_any_role(&auth_user, STAFF)?;
    let detail = AttendanceService::get_session(&state.db, auth_user.viewer()?, id).await?;
    Ok(Json(detail))
}

/// Record or correct punches for a session
#[utoipa::path(
    put,
    path = "/api/attendance/sessions/{id}/punches",
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = MarkPunchesDto,
    responses(
        (status = 200, description = "Punches saved", body = MarkPunchesResponse),
        (status = 400, description = "Repeated or unenrolled students, or session closed", body = ErrorResponse),
        (status = 403, description = "Not assigned to the section", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn mark_punches(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<MarkPunchesDto>,
) -> Result<Json<MarkPunchesResponse>, AppError> {
    check_any_role(&auth_user, STAFF)?;
    let response = AttendanceService::mark_punches(&state.db, auth_user.viewer()?, id, dto).await?;
    Ok(Json(response))
}

/// Close a session to further edits
#[utoipa::path(
    post,
    path = "/api/attendance/sessions/{id}/close",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session closed", body = AttendanceSession),
        (status = 403, description = "Not the creator", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn close_session(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<AttendanceSession>, AppError> {
    check_any_role(&auth_user, STAFF)?;
    let session = AttendanceService::close_session(&state.db, auth_user.viewer()?, id).await?;
    Ok(Json(session))
}

/// Delete a session and its punches
#[utoipa::path(
    delete,
    path = "/api/attendance/sessions/{id}",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session deleted", body = MessageResponse),
        (status = 403, description = "Not the creator", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_session(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    check_any_role(&auth_user, STAFF)?;
    AttendanceService::delete_session(&state.db, auth_user.viewer()?, id).await?;
    Ok(Json(MessageResponse::new("Attendance session deleted")))
}

/// Attendance counts and percentage for a student
#[utoipa::path(
    get,
    path = "/api/attendance/students/{student_id}/summary",
    params(
        ("student_id" = Uuid, Path, description = "Student user ID"),
        SummaryParams
    ),
    responses(
        (status = 200, description = "Attendance summary", body = AttendanceSummary),
        (status = 403, description = "Not allowed to view this student", body = ErrorResponse),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn student_summary(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(student_id): Path<Uuid>,
    Query(params): Query<SummaryParams>,
) -> Result<Json<AttendanceSummary>, AppError> {
    let summary =
        AttendanceService::student_summary(&state.db, auth_user.viewer()?, student_id, params)
            .await?;
    Ok(Json(summary))
}
