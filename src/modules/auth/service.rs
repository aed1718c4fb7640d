use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use rollcall_auth::{create_access_token, create_refresh_token, verify_refresh_token};
use rollcall_config::{EmailConfig, JwtConfig, OtpConfig};
use rollcall_core::{AppError, UserRole, hash_password, verify_password};
use rollcall_db::sequences::{FACULTY_EMPLOYEE, STUDENT_REGISTRATION};
use rollcall_db::{format_sequence_code, next_sequence_value};
use rollcall_import::normalize_phone;
use rollcall_models::auth::{
    AccessTokenResponse, AuthResponse, ForgotPasswordRequest, InviteCheckResponse, LoginRequest,
    OtpPurpose, RefreshTokenRequest, RequestSignupOtpDto, ResetPasswordRequest, SignupDto,
};
use rollcall_models::invites::Invite;
use rollcall_models::users::{USER_COLUMNS, User, UserWithProfile};

use super::otp::OtpService;
use crate::metrics::{track_login_failure, track_login_success, track_otp_issued, track_signup};
use crate::modules::institutions::service::InstitutionService;
use crate::modules::invites::service::INVITE_COLUMNS;
use crate::modules::users::service::{NewUser, UserService};
use crate::utils::codes::normalize_invite_code;
use crate::utils::email::EmailService;

#[derive(sqlx::FromRow)]
struct UserWithPassword {
    #[sqlx(flatten)]
    user: User,
    password: String,
}

pub struct AuthService;

impl AuthService {
    fn ensure_usable(invite: &Invite, role: UserRole) -> Result<(), AppError> {
        if let Some(reason) = invite.unusable_reason(Utc::now()) {
            return Err(AppError::bad_request(anyhow::anyhow!(reason)));
        }
        if !invite.allows(role) {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Invite code does not allow signing up as {}",
                role
            )));
        }
        Ok(())
    }

    async fn find_invite(db: &PgPool, code: &str) -> Result<Invite, AppError> {
        let sql = format!("SELECT {} FROM invites WHERE code = $1", INVITE_COLUMNS);
        sqlx::query_as::<_, Invite>(&sql)
            .bind(normalize_invite_code(code))
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Invite code not found")))
    }

    async fn email_registered(db: &PgPool, email: &str) -> Result<bool, AppError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(db)
                .await?;
        Ok(exists)
    }

    fn issue_tokens(user: &User, jwt_config: &JwtConfig) -> Result<(String, String), AppError> {
        let access_token = create_access_token(
            user.id,
            &user.email,
            user.role,
            user.institution_id,
            jwt_config,
        )?;
        let refresh_token = create_refresh_token(user.id, &user.email, jwt_config)?;
        Ok((access_token, refresh_token))
    }

    #[instrument(skip(db))]
    pub async fn check_invite(db: &PgPool, code: &str) -> Result<InviteCheckResponse, AppError> {
        let invite = Self::find_invite(db, code).await?;

        if let Some(reason) = invite.unusable_reason(Utc::now()) {
            debug!(invite.id = %invite.id, reason, "Unusable invite checked");
            return Err(AppError::bad_request(anyhow::anyhow!(reason)));
        }

        let institution = InstitutionService::get_institution(db, invite.institution_id).await?;

        Ok(InviteCheckResponse {
            code: invite.code,
            institution_name: institution.name,
            institution_kind: institution.kind,
            allowed_roles: invite.allowed_roles,
        })
    }

    #[instrument(skip(db, dto, otp_config, email_config), fields(role = %dto.role))]
    pub async fn request_signup_otp(
        db: &PgPool,
        dto: RequestSignupOtpDto,
        otp_config: &OtpConfig,
        email_config: &EmailConfig,
    ) -> Result<(), AppError> {
        let email = dto.email.trim().to_lowercase();
        let invite = Self::find_invite(db, &dto.invite_code).await?;
        Self::ensure_usable(&invite, dto.role)?;

        if Self::email_registered(db, &email).await? {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Email already registered"
            )));
        }

        let institution = InstitutionService::get_institution(db, invite.institution_id).await?;
        let code = OtpService::issue(db, &email, OtpPurpose::Signup, otp_config).await?;

        EmailService::new(email_config.clone())
            .send_signup_otp(&email, &institution.name, &code, otp_config.ttl_minutes())
            .await?;

        track_otp_issued("signup");
        info!(invite.id = %invite.id, "Signup OTP sent");
        Ok(())
    }

    /// Allocates `EMP-` codes until one is not already held by a custom ID.
    async fn next_free_employee_id(
        tx: &mut Transaction<'_, Postgres>,
        institution_id: Uuid,
    ) -> Result<String, AppError> {
        loop {
            let value = next_sequence_value(&mut **tx, institution_id, FACULTY_EMPLOYEE).await?;
            let employee_id = format_sequence_code("EMP", value);

            let taken = sqlx::query_scalar::<_, bool>(
                r#"SELECT EXISTS(
                    SELECT 1 FROM faculty_profiles WHERE institution_id = $1 AND employee_id = $2
                )"#,
            )
            .bind(institution_id)
            .bind(&employee_id)
            .fetch_one(&mut **tx)
            .await?;

            if !taken {
                return Ok(employee_id);
            }
            debug!(employee_id = %employee_id, "Generated employee ID already in use, skipping");
        }
    }

    /// Creates the role profile for a freshly inserted user.
    async fn create_profile(
        tx: &mut Transaction<'_, Postgres>,
        user: &User,
        dto: &SignupDto,
    ) -> Result<(), AppError> {
        match user.role {
            UserRole::Student => {
                let details = dto.student.clone().unwrap_or_default();
                let value =
                    next_sequence_value(&mut **tx, user.institution_id, STUDENT_REGISTRATION)
                        .await?;

                sqlx::query(
                    r#"INSERT INTO student_profiles
                        (user_id, institution_id, registration_number, date_of_birth, guardian_name, guardian_phone)
                       VALUES ($1, $2, $3, $4, $5, $6)"#,
                )
                .bind(user.id)
                .bind(user.institution_id)
                .bind(format_sequence_code("STU", value))
                .bind(details.date_of_birth)
                .bind(details.guardian_name.as_deref().map(str::trim))
                .bind(details.guardian_phone.as_deref().and_then(normalize_phone))
                .execute(&mut **tx)
                .await?;
            }
            UserRole::Faculty => {
                let details = dto.faculty.clone().unwrap_or_default();
                let employee_id = match details.employee_id.as_deref().map(str::trim) {
                    Some(id) if !id.is_empty() => id.to_uppercase(),
                    _ => Self::next_free_employee_id(tx, user.institution_id).await?,
                };

                sqlx::query(
                    r#"INSERT INTO faculty_profiles
                        (user_id, institution_id, employee_id, department, designation)
                       VALUES ($1, $2, $3, $4, $5)"#,
                )
                .bind(user.id)
                .bind(user.institution_id)
                .bind(employee_id)
                .bind(details.department.as_deref().map(str::trim))
                .bind(details.designation.as_deref().map(str::trim))
                .execute(&mut **tx)
                .await
                .map_err(|e| AppError::from_unique_violation(e, "Employee ID already in use"))?;
            }
            UserRole::Parent => {
                let details = dto.parent.as_ref().ok_or_else(|| {
                    AppError::bad_request(anyhow::anyhow!(
                        "Parent signup requires the student's registration number"
                    ))
                })?;

                let student_id = sqlx::query_scalar::<_, Uuid>(
                    r#"SELECT user_id FROM student_profiles
                       WHERE institution_id = $1 AND registration_number = $2"#,
                )
                .bind(user.institution_id)
                .bind(details.student_registration_number.trim().to_uppercase())
                .fetch_optional(&mut **tx)
                .await?
                .ok_or_else(|| {
                    AppError::not_found(anyhow::anyhow!(
                        "No student with that registration number"
                    ))
                })?;

                sqlx::query(
                    "INSERT INTO parent_students (parent_id, student_id, relationship) VALUES ($1, $2, $3)",
                )
                .bind(user.id)
                .bind(student_id)
                .bind(details.relationship.as_deref().map(str::trim))
                .execute(&mut **tx)
                .await?;
            }
            UserRole::Admin => {}
        }

        Ok(())
    }

    #[instrument(skip(db, dto, jwt_config, otp_config, email_config), fields(role = %dto.role))]
    pub async fn signup(
        db: &PgPool,
        dto: SignupDto,
        jwt_config: &JwtConfig,
        otp_config: &OtpConfig,
        email_config: &EmailConfig,
    ) -> Result<AuthResponse, AppError> {
        let email = dto.email.trim().to_lowercase();

        // Verified outside the transaction so failed attempts are kept.
        let otp_id =
            OtpService::verify(db, &email, OtpPurpose::Signup, &dto.otp, otp_config).await?;
        let password_hash = hash_password(&dto.password)?;

        let mut tx = db.begin().await?;

        let sql = format!(
            "SELECT {} FROM invites WHERE code = $1 FOR UPDATE",
            INVITE_COLUMNS
        );
        let invite = sqlx::query_as::<_, Invite>(&sql)
            .bind(normalize_invite_code(&dto.invite_code))
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Invite code not found")))?;
        Self::ensure_usable(&invite, dto.role)?;

        let user = UserService::insert_user(
            &mut *tx,
            NewUser {
                institution_id: invite.institution_id,
                first_name: &dto.first_name,
                last_name: &dto.last_name,
                email: &email,
                phone: dto.phone.as_deref(),
                password_hash: &password_hash,
                role: dto.role,
                email_verified: true,
            },
        )
        .await?;

        Self::create_profile(&mut tx, &user, &dto).await?;

        sqlx::query("UPDATE invites SET used_count = used_count + 1 WHERE id = $1")
            .bind(invite.id)
            .execute(&mut *tx)
            .await?;

        OtpService::consume(&mut *tx, otp_id).await?;

        tx.commit().await?;

        info!(user.id = %user.id, institution.id = %user.institution_id, "User signed up");
        track_signup(user.role.as_str());

        let institution = InstitutionService::get_institution(db, user.institution_id).await?;
        if let Err(e) = EmailService::new(email_config.clone())
            .send_welcome(&user.email, &user.first_name, &institution.name)
            .await
        {
            warn!(error = ?e.error, "Failed to send welcome email");
        }

        let (access_token, refresh_token) = Self::issue_tokens(&user, jwt_config)?;
        let user = UserService::with_profile(db, user).await?;

        Ok(AuthResponse {
            access_token,
            refresh_token,
            user,
        })
    }

    #[instrument(skip(db, dto, jwt_config))]
    pub async fn login(
        db: &PgPool,
        dto: LoginRequest,
        jwt_config: &JwtConfig,
    ) -> Result<AuthResponse, AppError> {
        let email = dto.email.trim().to_lowercase();
        let sql = format!(
            "SELECT {}, password FROM users WHERE email = $1",
            USER_COLUMNS
        );

        let Some(record) = sqlx::query_as::<_, UserWithPassword>(&sql)
            .bind(&email)
            .fetch_optional(db)
            .await?
        else {
            track_login_failure("unknown_email");
            return Err(AppError::unauthorized("Invalid email or password"));
        };

        if !verify_password(&dto.password, &record.password)? {
            warn!(user.id = %record.user.id, "Login with wrong password");
            track_login_failure("wrong_password");
            return Err(AppError::unauthorized("Invalid email or password"));
        }

        if !record.user.is_active {
            track_login_failure("inactive");
            return Err(AppError::forbidden("Account is deactivated"));
        }

        let user_sql = format!(
            "UPDATE users SET last_login_at = NOW() WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&user_sql)
            .bind(record.user.id)
            .fetch_one(db)
            .await?;

        let (access_token, refresh_token) = Self::issue_tokens(&user, jwt_config)?;
        track_login_success(user.role.as_str());
        info!(user.id = %user.id, "User logged in");

        let user = UserService::with_profile(db, user).await?;
        Ok(AuthResponse {
            access_token,
            refresh_token,
            user,
        })
    }

    #[instrument(skip(db, dto, jwt_config))]
    pub async fn refresh(
        db: &PgPool,
        dto: RefreshTokenRequest,
        jwt_config: &JwtConfig,
    ) -> Result<AccessTokenResponse, AppError> {
        let claims = verify_refresh_token(&dto.refresh_token, jwt_config)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::unauthorized("Invalid or expired refresh token"))?;

        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .fetch_optional(db)
            .await?
            .filter(|user| user.is_active)
            .ok_or_else(|| AppError::unauthorized("User not found or inactive"))?;

        let access_token = create_access_token(
            user.id,
            &user.email,
            user.role,
            user.institution_id,
            jwt_config,
        )?;

        Ok(AccessTokenResponse { access_token })
    }

    /// Sends a reset code when the account exists. Never reveals whether it does.
    #[instrument(skip(db, dto, otp_config, email_config))]
    pub async fn forgot_password(
        db: &PgPool,
        dto: ForgotPasswordRequest,
        otp_config: &OtpConfig,
        email_config: &EmailConfig,
    ) -> Result<(), AppError> {
        let email = dto.email.trim().to_lowercase();
        let sql = format!(
            "SELECT {} FROM users WHERE email = $1 AND is_active = true",
            USER_COLUMNS
        );
        let Some(user) = sqlx::query_as::<_, User>(&sql)
            .bind(&email)
            .fetch_optional(db)
            .await?
        else {
            debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let code = match OtpService::issue(db, &email, OtpPurpose::PasswordReset, otp_config).await
        {
            Ok(code) => code,
            Err(e) if e.status.as_u16() == 429 => {
                debug!(user.id = %user.id, "Password reset requested within cooldown");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        EmailService::new(email_config.clone())
            .send_password_reset_otp(&email, &user.first_name, &code, otp_config.ttl_minutes())
            .await?;

        track_otp_issued("password_reset");
        info!(user.id = %user.id, "Password reset OTP sent");
        Ok(())
    }

    #[instrument(skip(db, dto, otp_config))]
    pub async fn reset_password(
        db: &PgPool,
        dto: ResetPasswordRequest,
        otp_config: &OtpConfig,
    ) -> Result<(), AppError> {
        let email = dto.email.trim().to_lowercase();
        let otp_id =
            OtpService::verify(db, &email, OtpPurpose::PasswordReset, &dto.otp, otp_config)
                .await?;
        let password_hash = hash_password(&dto.new_password)?;

        let mut tx = db.begin().await?;

        let updated = sqlx::query(
            r#"UPDATE users
               SET password = $1,
                   email_verified_at = COALESCE(email_verified_at, NOW()),
                   updated_at = NOW()
               WHERE email = $2"#,
        )
        .bind(&password_hash)
        .bind(&email)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::bad_request(anyhow::anyhow!("Invalid OTP")));
        }

        OtpService::consume(&mut *tx, otp_id).await?;
        tx.commit().await?;

        info!("Password reset completed");
        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn me(
        db: &PgPool,
        institution_id: Uuid,
        user_id: Uuid,
    ) -> Result<UserWithProfile, AppError> {
        UserService::get_user_with_profile(db, institution_id, user_id).await
    }
}
