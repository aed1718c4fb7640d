use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};

use rollcall_core::{InstitutionKind, PaginationMeta, PaginationParams, UserRole};
use rollcall_import::{
    ColumnMapping, ColumnReport, Field, ImportKind, ImportRow, RowFields, RowIssue, TemplateColumn,
};
use rollcall_models::attendance::{
    AttendanceSession, AttendanceSummary, AttendanceTally, CreateSessionDto, MarkPunchesDto,
    MarkPunchesResponse, PaginatedSessionsResponse, PunchInput, PunchRecord, PunchStatus,
    SessionDetail, SessionFilterParams, SessionStatus, SummaryParams, UnmarkedStudent,
};
use rollcall_models::auth::{
    AccessTokenResponse, AuthResponse, FacultySignupDetails, ForgotPasswordRequest,
    InviteCheckResponse, LoginRequest, MessageResponse, OtpPurpose, ParentSignupDetails,
    RefreshTokenRequest, RequestSignupOtpDto, ResetPasswordRequest, SignupDto,
    StudentSignupDetails,
};
use rollcall_models::imports::{ImportCommitResponse, ImportDraftView, ImportTemplateResponse};
use rollcall_models::institutions::{Institution, InstitutionSummary, UpdateInstitutionDto};
use rollcall_models::invites::{CreateInviteDto, InviteResponse, PaginatedInvitesResponse};
use rollcall_models::sections::{
    AssignFacultyDto, CreateEnrollmentDto, CreateSectionDto, EnrolledStudent, Enrollment,
    PaginatedSectionsResponse, Section, SectionFaculty, SectionFilterParams, UpdateSectionDto,
};
use rollcall_models::users::{
    ChangePasswordDto, FacultyProfile, LinkedStudent, PaginatedUsersResponse, StudentProfile,
    UpdateProfileDto, UpdateUserStatusDto, User, UserFilterParams, UserWithProfile,
};

/// Body of every non-2xx response.
#[derive(ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::auth::controller::check_invite,
        crate::modules::auth::controller::request_signup_otp,
        crate::modules::auth::controller::signup,
        crate::modules::auth::controller::login,
        crate::modules::auth::controller::refresh,
        crate::modules::auth::controller::forgot_password,
        crate::modules::auth::controller::reset_password,
        crate::modules::auth::controller::me,
        crate::modules::users::controller::list_users,
        crate::modules::users::controller::get_user,
        crate::modules::users::controller::update_user_status,
        crate::modules::users::controller::update_me,
        crate::modules::users::controller::change_password,
        crate::modules::users::controller::my_children,
        crate::modules::institutions::controller::get_institution,
        crate::modules::institutions::controller::update_institution,
        crate::modules::invites::controller::create_invite,
        crate::modules::invites::controller::list_invites,
        crate::modules::invites::controller::revoke_invite,
        crate::modules::sections::controller::create_section,
        crate::modules::sections::controller::list_sections,
        crate::modules::sections::controller::get_section,
        crate::modules::sections::controller::update_section,
        crate::modules::sections::controller::delete_section,
        crate::modules::sections::controller::enroll_student,
        crate::modules::sections::controller::list_students,
        crate::modules::sections::controller::unenroll_student,
        crate::modules::sections::controller::assign_faculty,
        crate::modules::sections::controller::list_faculty,
        crate::modules::sections::controller::remove_faculty,
        crate::modules::attendance::controller::create_session,
        crate::modules::attendance::controller::list_sessions,
        crate::modules::attendance::controller::get_session,
        crate::modules::attendance::controller::mark_punches,
        crate::modules::attendance::controller::close_session,
        crate::modules::attendance::controller::delete_session,
        crate::modules::attendance::controller::student_summary,
        crate::modules::imports::controller::get_template,
        crate::modules::imports::controller::upload,
        crate::modules::imports::controller::get_draft,
        crate::modules::imports::controller::update_row,
        crate::modules::imports::controller::remove_row,
        crate::modules::imports::controller::commit,
        crate::modules::imports::controller::delete_draft,
    ),
    components(
        schemas(
            ErrorResponse,
            MessageResponse,
            UserRole,
            InstitutionKind,
            PaginationMeta,
            PaginationParams,
            OtpPurpose,
            InviteCheckResponse,
            RequestSignupOtpDto,
            StudentSignupDetails,
            FacultySignupDetails,
            ParentSignupDetails,
            SignupDto,
            LoginRequest,
            AuthResponse,
            RefreshTokenRequest,
            AccessTokenResponse,
            ForgotPasswordRequest,
            ResetPasswordRequest,
            User,
            StudentProfile,
            FacultyProfile,
            LinkedStudent,
            UserWithProfile,
            UserFilterParams,
            PaginatedUsersResponse,
            UpdateUserStatusDto,
            UpdateProfileDto,
            ChangePasswordDto,
            Institution,
            InstitutionSummary,
            UpdateInstitutionDto,
            InviteResponse,
            CreateInviteDto,
            PaginatedInvitesResponse,
            Section,
            CreateSectionDto,
            UpdateSectionDto,
            SectionFilterParams,
            PaginatedSectionsResponse,
            Enrollment,
            CreateEnrollmentDto,
            EnrolledStudent,
            AssignFacultyDto,
            SectionFaculty,
            SessionStatus,
            PunchStatus,
            AttendanceSession,
            CreateSessionDto,
            SessionFilterParams,
            PaginatedSessionsResponse,
            PunchRecord,
            UnmarkedStudent,
            SessionDetail,
            PunchInput,
            MarkPunchesDto,
            AttendanceTally,
            MarkPunchesResponse,
            SummaryParams,
            AttendanceSummary,
            ImportKind,
            Field,
            RowFields,
            RowIssue,
            ImportRow,
            ColumnMapping,
            ColumnReport,
            TemplateColumn,
            ImportDraftView,
            ImportTemplateResponse,
            ImportCommitResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Invite codes, signup, login and password recovery"),
        (name = "Users", description = "User directory and self-service profile"),
        (name = "Institution", description = "Institution settings"),
        (name = "Invites", description = "Invite code management"),
        (name = "Sections", description = "Sections, enrollments and faculty assignment"),
        (name = "Attendance", description = "Attendance sessions, punches and summaries"),
        (name = "Imports", description = "Spreadsheet roster imports")
    ),
    info(
        title = "Rollcall API",
        version = "0.1.0",
        description = "Attendance tracking for schools and colleges, built with Rust, Axum, and PostgreSQL.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }

    #[test]
    fn test_openapi_documents_attendance_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/attendance/sessions/{id}/punches"));
        assert!(doc.paths.paths.contains_key("/api/auth/signup"));
    }
}
