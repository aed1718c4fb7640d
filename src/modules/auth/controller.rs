use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::instrument;

use rollcall_core::AppError;
use rollcall_models::auth::{
    AccessTokenResponse, AuthResponse, ForgotPasswordRequest, InviteCheckResponse, LoginRequest,
    MessageResponse, RefreshTokenRequest, RequestSignupOtpDto, ResetPasswordRequest, SignupDto,
};
use rollcall_models::users::UserWithProfile;

use super::service::AuthService;
use crate::docs::ErrorResponse;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;
use crate::validator::ValidatedJson;

/// Check an invite code before signing up
#[utoipa::path(
    get,
    path = "/api/auth/invites/{code}",
    params(("code" = String, Path, description = "Invite code")),
    responses(
        (status = 200, description = "Invite is usable", body = InviteCheckResponse),
        (status = 400, description = "Invite revoked, expired or used up", body = ErrorResponse),
        (status = 404, description = "Invite code not found", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state))]
pub async fn check_invite(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<InviteCheckResponse>, AppError> {
    let response = AuthService::check_invite(&state.db, &code).await?;
    Ok(Json(response))
}

/// Email a signup verification code
#[utoipa::path(
    post,
    path = "/api/auth/signup/otp",
    request_body = RequestSignupOtpDto,
    responses(
        (status = 200, description = "Code sent", body = MessageResponse),
        (status = 400, description = "Invite not usable or email already registered", body = ErrorResponse),
        (status = 404, description = "Invite code not found", body = ErrorResponse),
        (status = 429, description = "Code requested too recently", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, dto))]
pub async fn request_signup_otp(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<RequestSignupOtpDto>,
) -> Result<Json<MessageResponse>, AppError> {
    AuthService::request_signup_otp(&state.db, dto, &state.otp_config, &state.email_config)
        .await?;
    Ok(Json(MessageResponse::new(
        "Verification code sent to your email",
    )))
}

/// Create an account with an invite code and email OTP
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupDto,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid OTP, invite or duplicate account", body = ErrorResponse),
        (status = 404, description = "Invite or linked student not found", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, dto))]
pub async fn signup(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<SignupDto>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let response = AuthService::signup(
        &state.db,
        dto,
        &state.jwt_config,
        &state.otp_config,
        &state.email_config,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Login and receive access and refresh tokens
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 403, description = "Account is deactivated", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, dto))]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let response = AuthService::login(&state.db, dto, &state.jwt_config).await?;
    Ok(Json(response))
}

/// Exchange a refresh token for a new access token
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New access token", body = AccessTokenResponse),
        (status = 401, description = "Invalid refresh token or inactive user", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, dto))]
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<RefreshTokenRequest>,
) -> Result<Json<AccessTokenResponse>, AppError> {
    let response = AuthService::refresh(&state.db, dto, &state.jwt_config).await?;
    Ok(Json(response))
}

/// Request a password reset code
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Code sent if the account exists", body = MessageResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, dto))]
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    AuthService::forgot_password(&state.db, dto, &state.otp_config, &state.email_config).await?;
    Ok(Json(MessageResponse::new(
        "If an account exists with that email, a reset code has been sent",
    )))
}

/// Set a new password with a reset code
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password has been reset", body = MessageResponse),
        (status = 400, description = "Invalid or expired code", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, dto))]
pub async fn reset_password(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    AuthService::reset_password(&state.db, dto, &state.otp_config).await?;
    Ok(Json(MessageResponse::new("Password has been reset")))
}

/// Get the authenticated user
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user with profile", body = UserWithProfile),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<UserWithProfile>, AppError> {
    let user = AuthService::me(&state.db, auth_user.institution_id(), auth_user.user_id()?).await?;
    Ok(Json(user))
}
