use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use tracing::{debug, instrument};
use uuid::Uuid;

use rollcall_core::AppError;
use rollcall_import::RowFields;
use rollcall_models::MessageResponse;
use rollcall_models::imports::{ImportCommitResponse, ImportDraftView, ImportTemplateResponse};

use super::service::{ImportService, Upload, parse_kind};
use crate::docs::ErrorResponse;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

async fn read_upload(mut multipart: Multipart) -> Result<Upload, AppError> {
    let mut upload = Upload {
        file_name: None,
        bytes: Vec::new(),
        academic_year: None,
    };
    let mut has_file = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(anyhow::anyhow!("Invalid multipart body: {}", e)))?
    {
        match field.name() {
            Some("file") => {
                upload.file_name = field.file_name().map(str::to_string);
                upload.bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::bad_request(anyhow::anyhow!("Invalid file: {}", e)))?
                    .to_vec();
                has_file = true;
            }
            Some("academic_year") => {
                upload.academic_year = Some(field.text().await.map_err(|e| {
                    AppError::bad_request(anyhow::anyhow!("Invalid academic_year: {}", e))
                })?);
            }
            other => debug!(field = ?other, "Ignoring multipart field"),
        }
    }

    if !has_file || upload.bytes.is_empty() {
        return Err(AppError::bad_request(anyhow::anyhow!(
            "A non-empty 'file' field is required"
        )));
    }

    Ok(upload)
}

/// Expected columns for an import kind
#[utoipa::path(
    get,
    path = "/api/imports/templates/{kind}",
    params(("kind" = String, Path, description = "`faculty` or `students`")),
    responses(
        (status = 200, description = "Template columns", body = ImportTemplateResponse),
        (status = 400, description = "Unknown import kind", body = ErrorResponse)
    ),
    tag = "Imports",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_template(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(kind): Path<String>,
) -> Result<Json<ImportTemplateResponse>, AppError> {
    let kind = parse_kind(&kind)?;
    let template = ImportService::template(&state.db, auth_user.institution_id(), kind).await?;
    Ok(Json(template))
}

/// Upload a roster workbook and create a draft
#[utoipa::path(
    post,
    path = "/api/imports/{kind}",
    params(("kind" = String, Path, description = "`faculty` or `students`")),
    request_body(content_type = "multipart/form-data", description = "`file` (xlsx, xls or ods) and `academic_year` for student imports"),
    responses(
        (status = 201, description = "Draft created", body = ImportDraftView),
        (status = 400, description = "Bad upload", body = ErrorResponse),
        (status = 413, description = "File too large"),
        (status = 422, description = "Unreadable workbook or missing columns", body = ErrorResponse)
    ),
    tag = "Imports",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, multipart))]
pub async fn upload(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(kind): Path<String>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ImportDraftView>), AppError> {
    let kind = parse_kind(&kind)?;
    let upload = read_upload(multipart).await?;
    let view = ImportService::upload(
        &state.db,
        auth_user.institution_id(),
        auth_user.user_id()?,
        kind,
        upload,
        state.import_config.max_rows,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Get a draft, revalidated against current records
#[utoipa::path(
    get,
    path = "/api/imports/{id}",
    params(("id" = Uuid, Path, description = "Draft ID")),
    responses(
        (status = 200, description = "Draft", body = ImportDraftView),
        (status = 404, description = "Draft not found", body = ErrorResponse)
    ),
    tag = "Imports",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_draft(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ImportDraftView>, AppError> {
    let view = ImportService::get_draft(&state.db, auth_user.institution_id(), id).await?;
    Ok(Json(view))
}

/// Replace the fields of one draft row
#[utoipa::path(
    put,
    path = "/api/imports/{id}/rows/{index}",
    params(
        ("id" = Uuid, Path, description = "Draft ID"),
        ("index" = usize, Path, description = "Zero-based row index")
    ),
    request_body = RowFields,
    responses(
        (status = 200, description = "Revalidated draft", body = ImportDraftView),
        (status = 400, description = "Draft already committed", body = ErrorResponse),
        (status = 404, description = "Draft or row not found", body = ErrorResponse)
    ),
    tag = "Imports",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, fields))]
pub async fn update_row(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((id, index)): Path<(Uuid, usize)>,
    Json(fields): Json<RowFields>,
) -> Result<Json<ImportDraftView>, AppError> {
    let view =
        ImportService::update_row(&state.db, auth_user.institution_id(), id, index, fields).await?;
    Ok(Json(view))
}

/// Drop one row from a draft
#[utoipa::path(
    delete,
    path = "/api/imports/{id}/rows/{index}",
    params(
        ("id" = Uuid, Path, description = "Draft ID"),
        ("index" = usize, Path, description = "Zero-based row index")
    ),
    responses(
        (status = 200, description = "Revalidated draft", body = ImportDraftView),
        (status = 400, description = "Draft already committed", body = ErrorResponse),
        (status = 404, description = "Draft or row not found", body = ErrorResponse)
    ),
    tag = "Imports",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn remove_row(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Json<ImportDraftView>, AppError> {
    let view = ImportService::remove_row(&state.db, auth_user.institution_id(), id, index).await?;
    Ok(Json(view))
}

/// Create every account in a clean draft
#[utoipa::path(
    post,
    path = "/api/imports/{id}/commit",
    params(("id" = Uuid, Path, description = "Draft ID")),
    responses(
        (status = 200, description = "Import committed", body = ImportCommitResponse),
        (status = 400, description = "Draft already committed", body = ErrorResponse),
        (status = 404, description = "Draft not found", body = ErrorResponse),
        (status = 422, description = "Draft still has issues", body = ErrorResponse)
    ),
    tag = "Imports",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn commit(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ImportCommitResponse>, AppError> {
    let response = ImportService::commit(&state.db, auth_user.institution_id(), id).await?;
    Ok(Json(response))
}

/// Discard a draft
#[utoipa::path(
    delete,
    path = "/api/imports/{id}",
    params(("id" = Uuid, Path, description = "Draft ID")),
    responses(
        (status = 200, description = "Draft discarded", body = MessageResponse),
        (status = 404, description = "Draft not found", body = ErrorResponse)
    ),
    tag = "Imports",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_draft(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    ImportService::delete_draft(&state.db, auth_user.institution_id(), id).await?;
    Ok(Json(MessageResponse::new("Import draft discarded")))
}
