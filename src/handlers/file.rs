//! Document upload and retrieval handlers

use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::auth::AuthenticatedUser;
use crate::error::{ApiError, ApiResult};
use crate::files::{self, FileRecord};

/// Upload a document (POST /api/files, multipart field `file`)
pub async fn upload_file(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    mut multipart: Multipart,
) -> ApiResult<Json<FileRecord>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .ok_or_else(|| ApiError::Validation("file name is required".to_string()))?
            .to_string();
        let content_type = files::validate_upload(&filename)?;

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(format!("failed to read upload: {}", e)))?
            .to_vec();
        if bytes.is_empty() {
            return Err(ApiError::Validation("uploaded file is empty".to_string()));
        }

        let record = state.files.create(&filename, content_type, bytes).await?;
        return Ok(Json(record));
    }

    Err(ApiError::Validation(
        "multipart field 'file' is required".to_string(),
    ))
}

/// Fetch a stored document (GET /api/files/:id)
pub async fn get_file(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(file_id): Path<Uuid>,
) -> ApiResult<Response> {
    let (record, bytes) = state.files.open(file_id).await?;

    Ok((
        [
            (header::CONTENT_TYPE, record.content_type),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", record.label),
            ),
        ],
        bytes,
    )
        .into_response())
}
