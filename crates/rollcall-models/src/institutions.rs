//! Institution entity and DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub use rollcall_core::InstitutionKind;

/// A tenant. Every other record belongs to exactly one institution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Institution {
    pub id: Uuid,
    pub name: String,
    pub kind: InstitutionKind,
    /// Short unique code, e.g. `GHS`
    pub code: String,
    pub address: Option<String>,
    pub contact_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Kind and code cannot be changed after creation.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateInstitutionDto {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub address: Option<String>,
    #[validate(email)]
    pub contact_email: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateInstitutionDto {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub kind: InstitutionKind,
    #[validate(length(min = 2, max = 32))]
    pub code: String,
    pub address: Option<String>,
    #[validate(email)]
    pub contact_email: Option<String>,
}

/// Institution details shown to someone holding an invite code.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InstitutionSummary {
    pub id: Uuid,
    pub name: String,
    pub kind: InstitutionKind,
}
