use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use rollcall_core::{AppError, PaginationMeta, PaginationParams};
use rollcall_models::invites::{CreateInviteDto, Invite, InviteResponse, PaginatedInvitesResponse};

use crate::utils::codes::{generate_invite_code, normalize_invite_code};

/// Column list matching [`Invite`].
pub const INVITE_COLUMNS: &str = "id, institution_id, code, allowed_roles, max_uses, used_count, \
     expires_at, revoked_at, created_by, created_at";

pub struct InviteService;

impl InviteService {
    #[instrument(skip(db, dto), fields(invite.max_uses = dto.max_uses))]
    pub async fn create_invite(
        db: &PgPool,
        institution_id: Uuid,
        created_by: Uuid,
        dto: CreateInviteDto,
    ) -> Result<InviteResponse, AppError> {
        if let Some(expires_at) = dto.expires_at
            && expires_at <= Utc::now()
        {
            return Err(AppError::unprocessable(anyhow::anyhow!(
                "expires_at must be in the future"
            )));
        }

        let code = match dto.code.as_deref() {
            Some(code) => normalize_invite_code(code),
            None => generate_invite_code(),
        };

        let mut roles = dto.allowed_roles;
        roles.sort_by_key(|role| role.as_str());
        roles.dedup();

        let sql = format!(
            "INSERT INTO invites (institution_id, code, allowed_roles, max_uses, expires_at, created_by)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            INVITE_COLUMNS
        );
        let invite = sqlx::query_as::<_, Invite>(&sql)
            .bind(institution_id)
            .bind(&code)
            .bind(&roles)
            .bind(dto.max_uses)
            .bind(dto.expires_at)
            .bind(created_by)
            .fetch_one(db)
            .await
            .map_err(|e| AppError::from_unique_violation(e, "Invite code already exists"))?;

        info!(invite.id = %invite.id, "Invite created");
        Ok(invite.into())
    }

    #[instrument(skip(db))]
    pub async fn list_invites(
        db: &PgPool,
        institution_id: Uuid,
        pagination: PaginationParams,
    ) -> Result<PaginatedInvitesResponse, AppError> {
        let total =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM invites WHERE institution_id = $1")
                .bind(institution_id)
                .fetch_one(db)
                .await?;

        let sql = format!(
            "SELECT {} FROM invites WHERE institution_id = $1
             ORDER BY created_at DESC, id
             LIMIT $2 OFFSET $3",
            INVITE_COLUMNS
        );
        let invites = sqlx::query_as::<_, Invite>(&sql)
            .bind(institution_id)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(db)
            .await?;

        Ok(PaginatedInvitesResponse {
            data: invites.into_iter().map(InviteResponse::from).collect(),
            meta: PaginationMeta::new(&pagination, total),
        })
    }

    /// Revoking twice keeps the first timestamp.
    #[instrument(skip(db))]
    pub async fn revoke_invite(
        db: &PgPool,
        institution_id: Uuid,
        invite_id: Uuid,
    ) -> Result<InviteResponse, AppError> {
        let sql = format!(
            "UPDATE invites SET revoked_at = COALESCE(revoked_at, NOW())
             WHERE id = $1 AND institution_id = $2
             RETURNING {}",
            INVITE_COLUMNS
        );
        let invite = sqlx::query_as::<_, Invite>(&sql)
            .bind(invite_id)
            .bind(institution_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Invite not found")))?;

        info!(invite.id = %invite.id, "Invite revoked");
        Ok(invite.into())
    }
}
