//! Email one-time codes for signup and password reset.
//!
//! Only SHA-256 digests are stored. Issuing a code supersedes any earlier
//! unconsumed code for the same email and purpose. Wrong guesses are counted
//! on the row and the code stops working once the budget is spent.

use chrono::{DateTime, Duration, Utc};
use sqlx::{PgExecutor, PgPool};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use rollcall_config::OtpConfig;
use rollcall_core::AppError;
use rollcall_models::OtpPurpose;

use crate::utils::codes::{generate_otp, hash_code};

#[derive(Debug, sqlx::FromRow)]
struct OtpRow {
    id: Uuid,
    code_hash: String,
    attempts: i32,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

pub struct OtpService;

impl OtpService {
    async fn latest_unconsumed(
        db: &PgPool,
        email: &str,
        purpose: OtpPurpose,
    ) -> Result<Option<OtpRow>, AppError> {
        let row = sqlx::query_as::<_, OtpRow>(
            r#"SELECT id, code_hash, attempts, expires_at, created_at
               FROM otps
               WHERE email = $1 AND purpose = $2 AND consumed_at IS NULL
               ORDER BY created_at DESC
               LIMIT 1"#,
        )
        .bind(email)
        .bind(purpose)
        .fetch_optional(db)
        .await?;

        Ok(row)
    }

    /// Stores a new code and returns it in clear text for delivery.
    ///
    /// Fails with 429 while the previous code is younger than the resend
    /// cooldown.
    #[instrument(skip(db, config), fields(otp.purpose = ?purpose))]
    pub async fn issue(
        db: &PgPool,
        email: &str,
        purpose: OtpPurpose,
        config: &OtpConfig,
    ) -> Result<String, AppError> {
        let now = Utc::now();

        if let Some(previous) = Self::latest_unconsumed(db, email, purpose).await?
            && now - previous.created_at < Duration::seconds(config.resend_cooldown_seconds)
        {
            warn!("OTP requested again within the resend cooldown");
            return Err(AppError::too_many_requests(
                "Please wait before requesting another code",
            ));
        }

        let code = generate_otp();
        let mut tx = db.begin().await?;

        sqlx::query(
            "UPDATE otps SET consumed_at = NOW()
             WHERE email = $1 AND purpose = $2 AND consumed_at IS NULL",
        )
        .bind(email)
        .bind(purpose)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO otps (email, purpose, code_hash, expires_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(email)
        .bind(purpose)
        .bind(hash_code(&code))
        .bind(now + Duration::seconds(config.ttl_seconds))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!("OTP issued");

        Ok(code)
    }

    /// Checks `code` against the newest unconsumed code and returns its id.
    /// A wrong guess is recorded before the error is returned.
    #[instrument(skip(db, code, config), fields(otp.purpose = ?purpose))]
    pub async fn verify(
        db: &PgPool,
        email: &str,
        purpose: OtpPurpose,
        code: &str,
        config: &OtpConfig,
    ) -> Result<Uuid, AppError> {
        let otp = Self::latest_unconsumed(db, email, purpose)
            .await?
            .ok_or_else(|| AppError::bad_request(anyhow::anyhow!("Invalid or already used OTP")))?;

        if otp.attempts >= config.max_attempts {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Too many incorrect attempts, request a new code"
            )));
        }

        if otp.expires_at <= Utc::now() {
            return Err(AppError::bad_request(anyhow::anyhow!("OTP has expired")));
        }

        if otp.code_hash != hash_code(code) {
            sqlx::query("UPDATE otps SET attempts = attempts + 1 WHERE id = $1")
                .bind(otp.id)
                .execute(db)
                .await?;
            warn!(attempts = otp.attempts + 1, "Incorrect OTP");
            return Err(AppError::bad_request(anyhow::anyhow!("Invalid OTP")));
        }

        Ok(otp.id)
    }

    /// Marks a verified code as used. Fails if another request consumed it first.
    pub async fn consume<'e, E>(executor: E, otp_id: Uuid) -> Result<(), AppError>
    where
        E: PgExecutor<'e>,
    {
        let result =
            sqlx::query("UPDATE otps SET consumed_at = NOW() WHERE id = $1 AND consumed_at IS NULL")
                .bind(otp_id)
                .execute(executor)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "OTP has already been used"
            )));
        }
        Ok(())
    }
}
