use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use rollcall_core::{AppError, InstitutionKind};
use rollcall_models::institutions::{Institution, UpdateInstitutionDto};

const INSTITUTION_COLUMNS: &str =
    "id, name, kind, code, address, contact_email, created_at, updated_at";

pub struct InstitutionService;

impl InstitutionService {
    pub async fn kind(db: &PgPool, id: Uuid) -> Result<InstitutionKind, AppError> {
        sqlx::query_scalar::<_, InstitutionKind>("SELECT kind FROM institutions WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Institution not found")))
    }

    #[instrument(skip(db))]
    pub async fn get_institution(db: &PgPool, id: Uuid) -> Result<Institution, AppError> {
        let sql = format!(
            "SELECT {} FROM institutions WHERE id = $1",
            INSTITUTION_COLUMNS
        );
        sqlx::query_as::<_, Institution>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Institution not found")))
    }

    #[instrument(skip(db, dto))]
    pub async fn update_institution(
        db: &PgPool,
        id: Uuid,
        dto: UpdateInstitutionDto,
    ) -> Result<Institution, AppError> {
        let sql = format!(
            "UPDATE institutions SET
                name = COALESCE($2, name),
                address = COALESCE($3, address),
                contact_email = COALESCE($4, contact_email),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            INSTITUTION_COLUMNS
        );
        let institution = sqlx::query_as::<_, Institution>(&sql)
            .bind(id)
            .bind(dto.name.as_deref().map(str::trim))
            .bind(dto.address.as_deref().map(str::trim))
            .bind(dto.contact_email.as_deref().map(|e| e.trim().to_lowercase()))
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Institution not found")))?;

        info!(institution.id = %institution.id, "Institution updated");
        Ok(institution)
    }
}
