use std::collections::HashSet;

use chrono::Utc;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use rollcall_core::{AppError, InstitutionKind, UserRole, hash_password};
use rollcall_db::sequences::STUDENT_REGISTRATION;
use rollcall_db::{format_sequence_code, next_sequence_value};
use rollcall_import::{
    ExistingRecords, Field, ImportBatch, ImportError, ImportKind, KnownSection, RowFields,
    normalize_phone, parse_date, read_workbook, template,
};
use rollcall_models::imports::{
    ImportCommitResponse, ImportDraft, ImportDraftView, ImportTemplateResponse,
};

use crate::metrics::track_import;
use crate::modules::institutions::service::InstitutionService;
use crate::modules::users::service::{NewUser, UserService};
use crate::utils::codes::unusable_password;

const DRAFT_COLUMNS: &str = "id, institution_id, kind, file_name, academic_year, columns, rows, \
     created_by, committed_at, created_at, updated_at";

/// Import errors at the HTTP boundary.
pub fn map_import_error(err: ImportError) -> AppError {
    match err {
        ImportError::RowOutOfRange(_) => AppError::not_found(err),
        ImportError::UnknownKind(_) => AppError::bad_request(err),
        _ if err.is_rejected_upload() => AppError::unprocessable(err),
        _ => AppError::bad_request(err),
    }
}

pub fn parse_kind(kind: &str) -> Result<ImportKind, AppError> {
    kind.parse::<ImportKind>().map_err(map_import_error)
}

/// An uploaded workbook with its form fields.
#[derive(Debug)]
pub struct Upload {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
    pub academic_year: Option<String>,
}

#[derive(sqlx::FromRow)]
struct SectionRow {
    id: Uuid,
    name: String,
    class_name: Option<String>,
    department: Option<String>,
    year: Option<i16>,
    semester: Option<i16>,
}

pub struct ImportService;

impl ImportService {
    pub async fn template(
        db: &PgPool,
        institution_id: Uuid,
        kind: ImportKind,
    ) -> Result<ImportTemplateResponse, AppError> {
        let institution_kind = InstitutionService::kind(db, institution_id).await?;
        Ok(ImportTemplateResponse {
            kind,
            columns: template(kind, institution_kind),
        })
    }

    /// Identifiers the batch would collide with, read through `conn` so the
    /// commit can see them inside its transaction.
    async fn load_existing(
        conn: &mut PgConnection,
        institution_id: Uuid,
        batch: &ImportBatch,
        academic_year: Option<&str>,
    ) -> Result<ExistingRecords, AppError> {
        let emails: Vec<String> = batch
            .rows
            .iter()
            .filter_map(|row| row.fields.get(Field::Email))
            .map(str::to_lowercase)
            .collect();

        let emails = sqlx::query_scalar::<_, String>("SELECT email FROM users WHERE email = ANY($1)")
            .bind(&emails)
            .fetch_all(&mut *conn)
            .await?
            .into_iter()
            .collect::<HashSet<_>>();

        let phones = sqlx::query_scalar::<_, String>(
            "SELECT phone FROM users WHERE institution_id = $1 AND phone IS NOT NULL",
        )
        .bind(institution_id)
        .fetch_all(&mut *conn)
        .await?
        .iter()
        .filter_map(|phone| normalize_phone(phone))
        .collect::<HashSet<_>>();

        let mut existing = ExistingRecords {
            emails,
            phones,
            ..Default::default()
        };

        match batch.kind {
            ImportKind::Faculty => {
                existing.employee_ids = sqlx::query_scalar::<_, String>(
                    "SELECT LOWER(employee_id) FROM faculty_profiles WHERE institution_id = $1",
                )
                .bind(institution_id)
                .fetch_all(&mut *conn)
                .await?
                .into_iter()
                .collect();
            }
            ImportKind::Students => {
                let sections = sqlx::query_as::<_, SectionRow>(
                    r#"SELECT id, name, class_name, department, year, semester
                       FROM sections WHERE institution_id = $1 AND academic_year = $2"#,
                )
                .bind(institution_id)
                .bind(academic_year)
                .fetch_all(&mut *conn)
                .await?;

                existing.sections = sections
                    .into_iter()
                    .map(|s| KnownSection {
                        id: s.id,
                        name: s.name,
                        class_name: s.class_name,
                        department: s.department,
                        year: s.year,
                        semester: s.semester,
                    })
                    .collect();

                existing.roll_numbers = sqlx::query_as::<_, (Uuid, String)>(
                    r#"SELECT e.section_id, LOWER(e.roll_number)
                       FROM enrollments e
                       JOIN sections s ON s.id = e.section_id
                       WHERE s.institution_id = $1 AND s.academic_year = $2"#,
                )
                .bind(institution_id)
                .bind(academic_year)
                .fetch_all(&mut *conn)
                .await?
                .into_iter()
                .collect();
            }
        }

        Ok(existing)
    }

    async fn revalidate(
        conn: &mut PgConnection,
        draft: &ImportDraft,
        batch: &mut ImportBatch,
    ) -> Result<(), AppError> {
        let existing = Self::load_existing(
            conn,
            draft.institution_id,
            batch,
            draft.academic_year.as_deref(),
        )
        .await?;
        batch.revalidate(&existing, Utc::now().date_naive());
        Ok(())
    }

    async fn load_draft(
        conn: &mut PgConnection,
        institution_id: Uuid,
        draft_id: Uuid,
        for_update: bool,
    ) -> Result<ImportDraft, AppError> {
        let sql = format!(
            "SELECT {} FROM import_drafts WHERE id = $1 AND institution_id = $2{}",
            DRAFT_COLUMNS,
            if for_update { " FOR UPDATE" } else { "" }
        );
        sqlx::query_as::<_, ImportDraft>(&sql)
            .bind(draft_id)
            .bind(institution_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Import draft not found")))
    }

    fn batch_of(
        draft: &ImportDraft,
        institution_kind: InstitutionKind,
    ) -> Result<ImportBatch, AppError> {
        let kind = parse_kind(&draft.kind)?;
        Ok(ImportBatch::new(kind, institution_kind, draft.rows.0.clone()))
    }

    fn ensure_open(draft: &ImportDraft) -> Result<(), AppError> {
        if draft.committed_at.is_some() {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Import has already been committed"
            )));
        }
        Ok(())
    }

    async fn save_rows(
        conn: &mut PgConnection,
        draft_id: Uuid,
        batch: &ImportBatch,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE import_drafts SET rows = $2, updated_at = NOW() WHERE id = $1")
            .bind(draft_id)
            .bind(Json(&batch.rows))
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    #[instrument(skip(db, upload), fields(import.kind = %kind, upload.bytes = upload.bytes.len()))]
    pub async fn upload(
        db: &PgPool,
        institution_id: Uuid,
        created_by: Uuid,
        kind: ImportKind,
        upload: Upload,
        max_rows: usize,
    ) -> Result<ImportDraftView, AppError> {
        let academic_year = upload
            .academic_year
            .as_deref()
            .map(str::trim)
            .filter(|y| !y.is_empty())
            .map(str::to_string);

        if kind == ImportKind::Students && academic_year.is_none() {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "academic_year is required for student imports"
            )));
        }

        let institution_kind = InstitutionService::kind(db, institution_id).await?;

        let sheet = tokio::task::spawn_blocking(move || read_workbook(upload.bytes))
            .await
            .map_err(|e| AppError::internal_error(format!("Workbook reader failed: {}", e)))?
            .map_err(map_import_error)?;

        let (batch, report) = ImportBatch::from_sheet(kind, institution_kind, &sheet, max_rows)
            .map_err(map_import_error)?;

        debug!(
            rows = batch.rows.len(),
            unmapped = report.unmapped.len(),
            "Workbook parsed"
        );

        let draft = sqlx::query_as::<_, ImportDraft>(&format!(
            "INSERT INTO import_drafts (institution_id, kind, file_name, academic_year, columns, rows, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {}",
            DRAFT_COLUMNS
        ))
        .bind(institution_id)
        .bind(kind.as_str())
        .bind(upload.file_name.as_deref())
        .bind(academic_year.as_deref())
        .bind(Json(&report))
        .bind(Json(&batch.rows))
        .bind(created_by)
        .fetch_one(db)
        .await?;

        let mut batch = batch;
        let mut conn = db.acquire().await?;
        Self::revalidate(&mut conn, &draft, &mut batch).await?;
        Self::save_rows(&mut conn, draft.id, &batch).await?;

        track_import(kind.as_str(), "upload", batch.rows.len() as u64);
        info!(
            draft.id = %draft.id,
            rows = batch.rows.len(),
            rows_with_issues = batch.rows_with_issues(),
            "Import draft created"
        );

        Ok(ImportDraftView::new(&draft, batch))
    }

    #[instrument(skip(db))]
    pub async fn get_draft(
        db: &PgPool,
        institution_id: Uuid,
        draft_id: Uuid,
    ) -> Result<ImportDraftView, AppError> {
        let mut conn = db.acquire().await?;
        let draft = Self::load_draft(&mut conn, institution_id, draft_id, false).await?;
        let institution_kind = InstitutionService::kind(db, institution_id).await?;
        let mut batch = Self::batch_of(&draft, institution_kind)?;

        if draft.committed_at.is_none() {
            Self::revalidate(&mut conn, &draft, &mut batch).await?;
        }

        Ok(ImportDraftView::new(&draft, batch))
    }

    #[instrument(skip(db, fields))]
    pub async fn update_row(
        db: &PgPool,
        institution_id: Uuid,
        draft_id: Uuid,
        index: usize,
        fields: RowFields,
    ) -> Result<ImportDraftView, AppError> {
        let institution_kind = InstitutionService::kind(db, institution_id).await?;
        let mut tx = db.begin().await?;
        let draft = Self::load_draft(&mut tx, institution_id, draft_id, true).await?;
        Self::ensure_open(&draft)?;

        let mut batch = Self::batch_of(&draft, institution_kind)?;
        batch.update_row(index, fields).map_err(map_import_error)?;
        Self::revalidate(&mut tx, &draft, &mut batch).await?;
        Self::save_rows(&mut tx, draft.id, &batch).await?;
        tx.commit().await?;

        debug!(draft.id = %draft.id, index, "Import row updated");
        Ok(ImportDraftView::new(&draft, batch))
    }

    #[instrument(skip(db))]
    pub async fn remove_row(
        db: &PgPool,
        institution_id: Uuid,
        draft_id: Uuid,
        index: usize,
    ) -> Result<ImportDraftView, AppError> {
        let institution_kind = InstitutionService::kind(db, institution_id).await?;
        let mut tx = db.begin().await?;
        let draft = Self::load_draft(&mut tx, institution_id, draft_id, true).await?;
        Self::ensure_open(&draft)?;

        let mut batch = Self::batch_of(&draft, institution_kind)?;
        let removed = batch.remove_row(index).map_err(map_import_error)?;
        Self::revalidate(&mut tx, &draft, &mut batch).await?;
        Self::save_rows(&mut tx, draft.id, &batch).await?;
        tx.commit().await?;

        debug!(draft.id = %draft.id, row_number = removed.row_number, "Import row removed");
        Ok(ImportDraftView::new(&draft, batch))
    }

    /// Creates every account in the draft, or none of them.
    #[instrument(skip(db))]
    pub async fn commit(
        db: &PgPool,
        institution_id: Uuid,
        draft_id: Uuid,
    ) -> Result<ImportCommitResponse, AppError> {
        let institution_kind = InstitutionService::kind(db, institution_id).await?;
        // One shared hash: nobody knows the password, accounts activate via reset.
        let password_hash = hash_password(&unusable_password())?;

        let mut tx = db.begin().await?;
        let draft = Self::load_draft(&mut tx, institution_id, draft_id, true).await?;
        Self::ensure_open(&draft)?;

        let mut batch = Self::batch_of(&draft, institution_kind)?;
        Self::revalidate(&mut tx, &draft, &mut batch).await?;

        if batch.rows.is_empty() {
            return Err(AppError::unprocessable(anyhow::anyhow!(
                "Import has no rows to commit"
            )));
        }
        if !batch.is_ready() {
            warn!(
                draft.id = %draft.id,
                issues = batch.issue_count(),
                "Commit attempted with unresolved issues"
            );
            return Err(AppError::unprocessable(anyhow::anyhow!(
                "Import has {} issue(s) in {} row(s); fix them before committing",
                batch.issue_count(),
                batch.rows_with_issues()
            )));
        }

        let role = match batch.kind {
            ImportKind::Faculty => UserRole::Faculty,
            ImportKind::Students => UserRole::Student,
        };
        let mut enrolled = 0;

        for row in &batch.rows {
            let f = &row.fields;
            let row_error = |e: AppError| {
                AppError::new(e.status, anyhow::anyhow!("Row {}: {}", row.row_number, e.error))
            };

            let user = UserService::insert_user(
                &mut *tx,
                NewUser {
                    institution_id,
                    first_name: f.get(Field::FirstName).unwrap_or_default(),
                    last_name: f.get(Field::LastName).unwrap_or_default(),
                    email: f.get(Field::Email).unwrap_or_default(),
                    phone: f.get(Field::Phone),
                    password_hash: &password_hash,
                    role,
                    email_verified: false,
                },
            )
            .await
            .map_err(row_error)?;

            match batch.kind {
                ImportKind::Faculty => {
                    sqlx::query(
                        r#"INSERT INTO faculty_profiles
                            (user_id, institution_id, employee_id, department, designation)
                           VALUES ($1, $2, $3, $4, $5)"#,
                    )
                    .bind(user.id)
                    .bind(institution_id)
                    .bind(f.get(Field::EmployeeId).map(str::to_uppercase))
                    .bind(f.get(Field::Department))
                    .bind(f.get(Field::Designation))
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| {
                        row_error(AppError::from_unique_violation(e, "Employee ID already in use"))
                    })?;
                }
                ImportKind::Students => {
                    let value =
                        next_sequence_value(&mut *tx, institution_id, STUDENT_REGISTRATION).await?;

                    sqlx::query(
                        r#"INSERT INTO student_profiles
                            (user_id, institution_id, registration_number, date_of_birth, guardian_name, guardian_phone)
                           VALUES ($1, $2, $3, $4, $5, $6)"#,
                    )
                    .bind(user.id)
                    .bind(institution_id)
                    .bind(format_sequence_code("STU", value))
                    .bind(f.get(Field::DateOfBirth).and_then(parse_date))
                    .bind(f.get(Field::GuardianName))
                    .bind(f.get(Field::GuardianPhone).and_then(normalize_phone))
                    .execute(&mut *tx)
                    .await?;

                    let section_id = row.section_id.ok_or_else(|| {
                        row_error(AppError::unprocessable(anyhow::anyhow!(
                            "Section could not be resolved"
                        )))
                    })?;

                    sqlx::query(
                        "INSERT INTO enrollments (section_id, student_id, roll_number) VALUES ($1, $2, $3)",
                    )
                    .bind(section_id)
                    .bind(user.id)
                    .bind(f.get(Field::RollNumber))
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| {
                        row_error(AppError::from_unique_violation(
                            e,
                            "Roll number is already taken in this section",
                        ))
                    })?;
                    enrolled += 1;
                }
            }
        }

        sqlx::query(
            "UPDATE import_drafts SET committed_at = NOW(), rows = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(draft.id)
        .bind(Json(&batch.rows))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let created = batch.rows.len();
        track_import(batch.kind.as_str(), "commit", created as u64);
        info!(draft.id = %draft.id, created, enrolled, "Import committed");

        Ok(ImportCommitResponse {
            draft_id: draft.id,
            kind: batch.kind,
            created,
            enrolled,
        })
    }

    #[instrument(skip(db))]
    pub async fn delete_draft(
        db: &PgPool,
        institution_id: Uuid,
        draft_id: Uuid,
    ) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM import_drafts WHERE id = $1 AND institution_id = $2")
            .bind(draft_id)
            .bind(institution_id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!("Import draft not found")));
        }

        info!(draft.id = %draft_id, "Import draft discarded");
        Ok(())
    }
}
