use sqlx::{PgExecutor, PgPool};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use rollcall_core::{AppError, PaginationMeta, UserRole, hash_password, verify_password};
use rollcall_import::normalize_phone;
use rollcall_models::users::{
    ChangePasswordDto, FacultyProfile, LinkedStudent, PaginatedUsersResponse, StudentProfile,
    USER_COLUMNS, UpdateProfileDto, User, UserFilterParams, UserWithProfile,
};

/// Fields for a new account row. Profiles are created separately.
#[derive(Debug)]
pub struct NewUser<'a> {
    pub institution_id: Uuid,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub phone: Option<&'a str>,
    pub password_hash: &'a str,
    pub role: UserRole,
    pub email_verified: bool,
}

/// Maps unique violations on `users` to the message for the offending column.
pub fn map_user_conflict(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err
        && db_err.is_unique_violation()
    {
        let message = match db_err.constraint() {
            Some("users_phone_unique") => "Phone number already registered",
            _ => "Email already registered",
        };
        return AppError::bad_request(anyhow::anyhow!(message));
    }
    AppError::database(err)
}

pub struct UserService;

impl UserService {
    pub async fn insert_user<'e, E>(executor: E, new_user: NewUser<'_>) -> Result<User, AppError>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            "INSERT INTO users
                (institution_id, first_name, last_name, email, phone, password, role, email_verified_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, CASE WHEN $8 THEN NOW() END)
             RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(new_user.institution_id)
            .bind(new_user.first_name.trim())
            .bind(new_user.last_name.trim())
            .bind(new_user.email.trim().to_lowercase())
            .bind(new_user.phone.and_then(normalize_phone))
            .bind(new_user.password_hash)
            .bind(new_user.role)
            .bind(new_user.email_verified)
            .fetch_one(executor)
            .await
            .map_err(map_user_conflict)
    }

    #[instrument(skip(db))]
    pub async fn get_user(
        db: &PgPool,
        institution_id: Uuid,
        user_id: Uuid,
    ) -> Result<User, AppError> {
        let sql = format!(
            "SELECT {} FROM users WHERE id = $1 AND institution_id = $2",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .bind(institution_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("User not found")))
    }

    /// Attaches the profile that belongs to the user's role.
    pub async fn with_profile(db: &PgPool, user: User) -> Result<UserWithProfile, AppError> {
        let mut result = UserWithProfile {
            student_profile: None,
            faculty_profile: None,
            children: Vec::new(),
            user,
        };

        match result.user.role {
            UserRole::Student => {
                result.student_profile = sqlx::query_as::<_, StudentProfile>(
                    r#"SELECT registration_number, date_of_birth, guardian_name, guardian_phone
                       FROM student_profiles WHERE user_id = $1"#,
                )
                .bind(result.user.id)
                .fetch_optional(db)
                .await?;
            }
            UserRole::Faculty => {
                result.faculty_profile = sqlx::query_as::<_, FacultyProfile>(
                    "SELECT employee_id, department, designation FROM faculty_profiles WHERE user_id = $1",
                )
                .bind(result.user.id)
                .fetch_optional(db)
                .await?;
            }
            UserRole::Parent => {
                result.children = Self::get_children(db, result.user.id).await?;
            }
            UserRole::Admin => {}
        }

        Ok(result)
    }

    #[instrument(skip(db))]
    pub async fn get_user_with_profile(
        db: &PgPool,
        institution_id: Uuid,
        user_id: Uuid,
    ) -> Result<UserWithProfile, AppError> {
        let user = Self::get_user(db, institution_id, user_id).await?;
        Self::with_profile(db, user).await
    }

    #[instrument(skip(db, filters), fields(db.table = "users"))]
    pub async fn list_users(
        db: &PgPool,
        institution_id: Uuid,
        filters: UserFilterParams,
    ) -> Result<PaginatedUsersResponse, AppError> {
        let pagination = filters.pagination();
        let search = filters.search.as_ref().map(|s| format!("%{}%", s));

        debug!(
            filter.role = ?filters.role,
            filter.is_active = ?filters.is_active,
            limit = pagination.limit(),
            "Listing users"
        );

        const WHERE: &str = r#"WHERE institution_id = $1
              AND ($2::user_role IS NULL OR role = $2)
              AND ($3::bool IS NULL OR is_active = $3)
              AND ($4::text IS NULL OR first_name ILIKE $4 OR last_name ILIKE $4 OR email ILIKE $4)"#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM users {}", WHERE))
            .bind(institution_id)
            .bind(filters.role)
            .bind(filters.is_active)
            .bind(&search)
            .fetch_one(db)
            .await?;

        let sql = format!(
            "SELECT {} FROM users {} ORDER BY last_name, first_name, id LIMIT $5 OFFSET $6",
            USER_COLUMNS, WHERE
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(institution_id)
            .bind(filters.role)
            .bind(filters.is_active)
            .bind(&search)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(db)
            .await?;

        Ok(PaginatedUsersResponse {
            data: users,
            meta: PaginationMeta::new(&pagination, total),
        })
    }

    #[instrument(skip(db))]
    pub async fn set_status(
        db: &PgPool,
        institution_id: Uuid,
        actor_id: Uuid,
        user_id: Uuid,
        is_active: bool,
    ) -> Result<User, AppError> {
        if actor_id == user_id && !is_active {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "You cannot deactivate your own account"
            )));
        }

        let sql = format!(
            "UPDATE users SET is_active = $3, updated_at = NOW()
             WHERE id = $1 AND institution_id = $2
             RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .bind(institution_id)
            .bind(is_active)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("User not found")))?;

        info!(user.id = %user.id, is_active, "User status changed");
        Ok(user)
    }

    #[instrument(skip(db, dto))]
    pub async fn update_profile(
        db: &PgPool,
        institution_id: Uuid,
        user_id: Uuid,
        dto: UpdateProfileDto,
    ) -> Result<User, AppError> {
        let sql = format!(
            "UPDATE users SET
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                phone = COALESCE($5, phone),
                updated_at = NOW()
             WHERE id = $1 AND institution_id = $2
             RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .bind(institution_id)
            .bind(dto.first_name.as_deref().map(str::trim))
            .bind(dto.last_name.as_deref().map(str::trim))
            .bind(dto.phone.as_deref().and_then(normalize_phone))
            .fetch_optional(db)
            .await
            .map_err(map_user_conflict)?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("User not found")))
    }

    #[instrument(skip(db, dto))]
    pub async fn change_password(
        db: &PgPool,
        user_id: Uuid,
        dto: ChangePasswordDto,
    ) -> Result<(), AppError> {
        let current_hash =
            sqlx::query_scalar::<_, String>("SELECT password FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(db)
                .await?
                .ok_or_else(|| AppError::not_found(anyhow::anyhow!("User not found")))?;

        if !verify_password(&dto.current_password, &current_hash)? {
            warn!(user.id = %user_id, "Password change with wrong current password");
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Current password is incorrect"
            )));
        }

        let new_hash = hash_password(&dto.new_password)?;
        sqlx::query("UPDATE users SET password = $1, updated_at = NOW() WHERE id = $2")
            .bind(new_hash)
            .bind(user_id)
            .execute(db)
            .await?;

        info!(user.id = %user_id, "Password changed");
        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn get_children(
        db: &PgPool,
        parent_id: Uuid,
    ) -> Result<Vec<LinkedStudent>, AppError> {
        let children = sqlx::query_as::<_, LinkedStudent>(
            r#"SELECT u.id AS student_id, u.first_name, u.last_name,
                      sp.registration_number, ps.relationship
               FROM parent_students ps
               JOIN users u ON u.id = ps.student_id
               JOIN student_profiles sp ON sp.user_id = u.id
               WHERE ps.parent_id = $1
               ORDER BY u.first_name, u.last_name"#,
        )
        .bind(parent_id)
        .fetch_all(db)
        .await?;

        Ok(children)
    }
}
