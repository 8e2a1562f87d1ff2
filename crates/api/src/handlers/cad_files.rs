//! Handlers for CAD file upload and the `/cad-files` resource.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use sheetflow_core::error::CoreError;
use sheetflow_core::types::EntityId;
use sheetflow_db::models::cad_file::CadFile;
use sheetflow_pipeline::projects;
use sheetflow_pipeline::upload::{upload_cad_files, UploadPart, UploadRequest};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::{DataResponse, MessageResponse};
use crate::state::AppState;

/// Request body ceiling for an upload batch. Per-file size is enforced by
/// the pipeline.
pub const UPLOAD_BODY_LIMIT: usize = 64 * 1024 * 1024;

/// POST /api/v1/projects/{id}/cad-files
///
/// Multipart body: any number of `file` parts plus one `material` field.
/// Responds with the paired CAD file records.
pub async fn upload(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<EntityId>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<MessageResponse<Vec<CadFile>>>)> {
    let mut parts = Vec::new();
    let mut material = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::BadRequest("File part without a file name".into()))?;
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                parts.push(UploadPart { file_name, bytes });
            }
            "material" => {
                material = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?,
                );
            }
            other => tracing::debug!(field = %other, "Ignoring unknown multipart field"),
        }
    }

    let material = material
        .ok_or_else(|| CoreError::Validation("The material field is required".into()))?;

    let records = upload_cad_files(
        &state.ctx,
        UploadRequest {
            owner_id: user.user_id,
            project_id,
            material,
            parts,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Upload complete",
            data: records,
        }),
    ))
}

/// GET /api/v1/cad-files/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<EntityId>,
) -> AppResult<Json<DataResponse<CadFile>>> {
    let cad_file = projects::owned_cad_file(&state.ctx, id, user.user_id).await?;
    Ok(Json(DataResponse { data: cad_file }))
}

/// DELETE /api/v1/cad-files/{id}
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<EntityId>,
) -> AppResult<StatusCode> {
    projects::delete_cad_file(&state.ctx, id, user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
