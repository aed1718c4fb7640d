//! Import drafts as stored and as returned to the client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use utoipa::ToSchema;
use uuid::Uuid;

use rollcall_import::{ColumnReport, ImportBatch, ImportKind, ImportRow, TemplateColumn};

#[derive(Debug, Clone, FromRow)]
pub struct ImportDraft {
    pub id: Uuid,
    pub institution_id: Uuid,
    pub kind: String,
    pub file_name: Option<String>,
    pub academic_year: Option<String>,
    pub columns: Json<ColumnReport>,
    pub rows: Json<Vec<ImportRow>>,
    pub created_by: Option<Uuid>,
    pub committed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImportDraftView {
    pub id: Uuid,
    pub kind: ImportKind,
    pub file_name: Option<String>,
    pub academic_year: Option<String>,
    pub columns: ColumnReport,
    pub rows: Vec<ImportRow>,
    pub total_rows: usize,
    pub rows_with_issues: usize,
    pub issue_count: usize,
    /// True when the draft can be committed as is
    pub ready: bool,
    pub committed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ImportDraftView {
    pub fn new(draft: &ImportDraft, batch: ImportBatch) -> Self {
        Self {
            id: draft.id,
            kind: batch.kind,
            file_name: draft.file_name.clone(),
            academic_year: draft.academic_year.clone(),
            columns: draft.columns.0.clone(),
            total_rows: batch.rows.len(),
            rows_with_issues: batch.rows_with_issues(),
            issue_count: batch.issue_count(),
            ready: batch.is_ready(),
            rows: batch.rows,
            committed_at: draft.committed_at,
            created_at: draft.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImportTemplateResponse {
    pub kind: ImportKind,
    pub columns: Vec<TemplateColumn>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImportCommitResponse {
    pub draft_id: Uuid,
    pub kind: ImportKind,
    pub created: usize,
    pub enrolled: usize,
}
