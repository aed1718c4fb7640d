use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use tracing::instrument;
use uuid::Uuid;

use rollcall_core::{AppError, UserRole};
use rollcall_models::MessageResponse;
use rollcall_models::sections::{
    AssignFacultyDto, CreateEnrollmentDto, CreateSectionDto, EnrolledStudent, Enrollment,
    PaginatedSectionsResponse, Section, SectionFaculty, SectionFilterParams, UpdateSectionDto,
};

use super::service::SectionService;
use crate::docs::ErrorResponse;
use crate::middleware::auth::AuthUser;
use crate::middleware::role::check_any_role;
use crate::state::AppState;
use crate::validator::ValidatedJson;

/// Create a section
#[utoipa::path(
    post,
    path = "/api/sections",
    request_body = CreateSectionDto,
    responses(
        (status = 201, description = "Section created", body = Section),
        (status = 400, description = "Section already exists", body = ErrorResponse),
        (status = 403, description = "Admin only", body = ErrorResponse),
        (status = 422, description = "Fields do not match the institution kind", body = ErrorResponse)
    ),
    tag = "Sections",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn create_section(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateSectionDto>,
) -> Result<(StatusCode, Json<Section>), AppError> {
    check_any_role(&auth_user, &[UserRole::Admin])?;
    let section = SectionService::create_section(&state.db, auth_user.institution_id(), dto).await?;
    Ok((StatusCode::CREATED, Json(section)))
}

/// List the sections visible to the caller
#[utoipa::path(
    get,
    path = "/api/sections",
    params(SectionFilterParams),
    responses(
        (status = 200, description = "Paginated sections", body = PaginatedSectionsResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "Sections",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn list_sections(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(filters): Query<SectionFilterParams>,
) -> Result<Json<PaginatedSectionsResponse>, AppError> {
    let sections = SectionService::list_sections(&state.db, auth_user.viewer()?, filters).await?;
    Ok(Json(sections))
}

/// Get a section
#[utoipa::path(
    get,
    path = "/api/sections/{id}",
    params(("id" = Uuid, Path, description = "Section ID")),
    responses(
        (status = 200, description = "Section", body = Section),
        (status = 404, description = "Section not found", body = ErrorResponse)
    ),
    tag = "Sections",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_section(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Section>, AppError> {
    let section = SectionService::get_visible_section(&state.db, auth_user.viewer()?, id).await?;
    Ok(Json(section))
}

/// Update a section
#[utoipa::path(
    put,
    path = "/api/sections/{id}",
    params(("id" = Uuid, Path, description = "Section ID")),
    request_body = UpdateSectionDto,
    responses(
        (status = 200, description = "Section updated", body = Section),
        (status = 400, description = "Section already exists", body = ErrorResponse),
        (status = 404, description = "Section not found", body = ErrorResponse),
        (status = 422, description = "Fields do not match the institution kind", body = ErrorResponse)
    ),
    tag = "Sections",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn update_section(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateSectionDto>,
) -> Result<Json<Section>, AppError> {
    check_any_role(&auth_user, &[UserRole::Admin])?;
    let section =
        SectionService::update_section(&state.db, auth_user.institution_id(), id, dto).await?;
    Ok(Json(section))
}

/// Delete a section without attendance history
#[utoipa::path(
    delete,
    path = "/api/sections/{id}",
    params(("id" = Uuid, Path, description = "Section ID")),
    responses(
        (status = 200, description = "Section deleted", body = MessageResponse),
        (status = 400, description = "Section has attendance sessions", body = ErrorResponse),
        (status = 404, description = "Section not found", body = ErrorResponse)
    ),
    tag = "Sections",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_section(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    check_any_role(&auth_user, &[UserRole::Admin])?;
    SectionService::delete_section(&state.db, auth_user.institution_id(), id).await?;
    Ok(Json(MessageResponse::new("Section deleted successfully")))
}

/// Enroll a student in a section
#[utoipa::path(
    post,
    path = "/api/sections/{id}/enrollments",
    params(("id" = Uuid, Path, description = "Section ID")),
    request_body = CreateEnrollmentDto,
    responses(
        (status = 201, description = "Student enrolled", body = Enrollment),
        (status = 400, description = "Not a student, already enrolled, or roll number taken", body = ErrorResponse),
        (status = 404, description = "Section not found", body = ErrorResponse)
    ),
    tag = "Sections",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn enroll_student(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<CreateEnrollmentDto>,
) -> Result<(StatusCode, Json<Enrollment>), AppError> {
    check_any_role(&auth_user, &[UserRole::Admin])?;
    let enrollment =
        SectionService::enroll_student(&state.db, auth_user.institution_id(), id, dto).await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

/// List the students enrolled in a section
#[utoipa::path(
    get,
    path = "/api/sections/{id}/students",
    params(("id" = Uuid, Path, description = "Section ID")),
    responses(
        (status = 200, description = "Section roster", body = Vec<EnrolledStudent>),
        (status = 403, description = "Not assigned to this section", body = ErrorResponse),
        (status = 404, description = "Section not found", body = ErrorResponse)
    ),
    tag = "Sections",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn list_students(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<EnrolledStudent>>, AppError> {
    SectionService::get_section(&state.db, auth_user.institution_id(), id).await?;
    SectionService::ensure_can_manage(&state.db, auth_user.viewer()?, id).await?;
    let students = SectionService::list_students(&state.db, id).await?;
    Ok(Json(students))
}

/// Remove a student from a section
#[utoipa::path(
    delete,
    path = "/api/sections/{id}/enrollments/{student_id}",
    params(
        ("id" = Uuid, Path, description = "Section ID"),
        ("student_id" = Uuid, Path, description = "Student user ID")
    ),
    responses(
        (status = 200, description = "Student removed", body = MessageResponse),
        (status = 404, description = "Enrollment not found", body = ErrorResponse)
    ),
    tag = "Sections",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn unenroll_student(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((id, student_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<MessageResponse>, AppError> {
    check_any_role(&auth_user, &[UserRole::Admin])?;
    SectionService::unenroll_student(&state.db, auth_user.institution_id(), id, student_id)
        .await?;
    Ok(Json(MessageResponse::new("Student removed from section")))
}

/// Assign a faculty member to a section
#[utoipa::path(
    post,
    path = "/api/sections/{id}/faculty",
    params(("id" = Uuid, Path, description = "Section ID")),
    request_body = AssignFacultyDto,
    responses(
        (status = 201, description = "Faculty assigned", body = SectionFaculty),
        (status = 400, description = "Not a faculty member or already assigned", body = ErrorResponse),
        (status = 404, description = "Section not found", body = ErrorResponse)
    ),
    tag = "Sections",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn assign_faculty(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<AssignFacultyDto>,
) -> Result<(StatusCode, Json<SectionFaculty>), AppError> {
    check_any_role(&auth_user, &[UserRole::Admin])?;
    let assignment =
        SectionService::assign_faculty(&state.db, auth_user.institution_id(), id, dto).await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

/// List the faculty assigned to a section
#[utoipa::path(
    get,
    path = "/api/sections/{id}/faculty",
    params(("id" = Uuid, Path, description = "Section ID")),
    responses(
        (status = 200, description = "Assigned faculty", body = Vec<SectionFaculty>),
        (status = 404, description = "Section not found", body = ErrorResponse)
    ),
    tag = "Sections",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn list_faculty(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<SectionFaculty>>, AppError> {
    SectionService::get_visible_section(&state.db, auth_user.viewer()?, id).await?;
    let faculty = SectionService::list_faculty(&state.db, id).await?;
    Ok(Json(faculty))
}

/// Unassign a faculty member from a section
#[utoipa::path(
    delete,
    path = "/api/sections/{id}/faculty/{faculty_id}",
    params(
        ("id" = Uuid, Path, description = "Section ID"),
        ("faculty_id" = Uuid, Path, description = "Faculty user ID")
    ),
    responses(
        (status = 200, description = "Faculty unassigned", body = MessageResponse),
        (status = 404, description = "Assignment not found", body = ErrorResponse)
    ),
    tag = "Sections",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn remove_faculty(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((id, faculty_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<MessageResponse>, AppError> {
    check_any_role(&auth_user, &[UserRole::Admin])?;
    SectionService::remove_faculty(&state.db, auth_user.institution_id(), id, faculty_id).await?;
    Ok(Json(MessageResponse::new("Faculty removed from section")))
}
