//! Institution bootstrap and invite creation.
//!
//! Institutions cannot be created over HTTP; the first admin of each one is
//! created here together with the institution.

use chrono::{Duration, Utc};
use data_encoding::BASE32_NOPAD;
use rand::Rng;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use rollcall_core::{UserRole, hash_password};
use rollcall_models::institutions::CreateInstitutionDto;

pub struct NewAdmin {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

pub struct CreatedInstitution {
    pub institution_id: Uuid,
    pub admin_id: Uuid,
}

fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.constraint() == Some(constraint))
}

/// Creates an institution and its first admin in one transaction.
pub async fn create_institution(
    db: &PgPool,
    dto: &CreateInstitutionDto,
    admin: &NewAdmin,
) -> Result<CreatedInstitution, Box<dyn std::error::Error>> {
    dto.validate()?;
    if admin.password.len() < 8 {
        return Err("Password must be at least 8 characters".into());
    }

    let password_hash = hash_password(&admin.password)
        .map_err(|e| format!("Failed to hash password: {}", e.error))?;

    let mut tx = db.begin().await?;

    let institution_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO institutions (name, kind, code, address, contact_email)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id",
    )
    .bind(dto.name.trim())
    .bind(dto.kind)
    .bind(dto.code.trim().to_ascii_uppercase())
    .bind(&dto.address)
    .bind(&dto.contact_email)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| -> Box<dyn std::error::Error> {
        if is_unique_violation(&e, "institutions_code_key") {
            "Institution code already exists".into()
        } else {
            e.into()
        }
    })?;

    let admin_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO users (institution_id, first_name, last_name, email, password, role, email_verified_at)
         VALUES ($1, $2, $3, $4, $5, $6, NOW())
         RETURNING id",
    )
    .bind(institution_id)
    .bind(admin.first_name.trim())
    .bind(admin.last_name.trim())
    .bind(admin.email.trim().to_lowercase())
    .bind(&password_hash)
    .bind(UserRole::Admin)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| -> Box<dyn std::error::Error> {
        if is_unique_violation(&e, "users_email_key") {
            "User with this email already exists".into()
        } else {
            e.into()
        }
    })?;

    tx.commit().await?;

    Ok(CreatedInstitution {
        institution_id,
        admin_id,
    })
}

/// A random uppercase base32 invite code.
pub fn generate_invite_code() -> String {
    let bytes: [u8; 8] = rand::thread_rng().r#gen();
    let mut code = BASE32_NOPAD.encode(&bytes);
    code.truncate(10);
    code
}

/// Creates an invite for the institution with the given code and returns
/// the invite code.
pub async fn create_invite(
    db: &PgPool,
    institution_code: &str,
    roles: &[UserRole],
    max_uses: i32,
    expires_in_days: Option<i64>,
) -> Result<String, Box<dyn std::error::Error>> {
    if roles.is_empty() {
        return Err("At least one role is required".into());
    }
    if max_uses < 1 {
        return Err("max_uses must be at least 1".into());
    }

    let institution_id = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM institutions WHERE code = $1",
    )
    .bind(institution_code.trim().to_ascii_uppercase())
    .fetch_optional(db)
    .await?
    .ok_or("No institution with that code")?;

    let mut roles = roles.to_vec();
    roles.sort_by_key(|r| r.as_str());
    roles.dedup();

    let code = generate_invite_code();
    let expires_at = expires_in_days.map(|days| Utc::now() + Duration::days(days));

    sqlx::query(
        "INSERT INTO invites (institution_id, code, allowed_roles, max_uses, expires_at)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(institution_id)
    .bind(&code)
    .bind(&roles)
    .bind(max_uses)
    .bind(expires_at)
    .execute(db)
    .await?;

    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invite_code_shape() {
        let code = generate_invite_code();
        assert_eq!(code.len(), 10);
        assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }
}
