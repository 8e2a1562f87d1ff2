//! Handlers for the `/projects` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sheetflow_core::types::EntityId;
use sheetflow_db::models::cad_file::CadFile;
use sheetflow_db::models::project::{CreateProject, Project};
use sheetflow_pipeline::projects;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/projects
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateProject>,
) -> AppResult<(StatusCode, Json<DataResponse<Project>>)> {
    let project = projects::create_project(&state.ctx, user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: project })))
}

/// GET /api/v1/projects
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<Project>>>> {
    let projects = state.ctx.store.list_projects(user.user_id).await?;
    Ok(Json(DataResponse { data: projects }))
}

/// GET /api/v1/projects/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<EntityId>,
) -> AppResult<Json<DataResponse<Project>>> {
    let project = projects::owned_project(&state.ctx, id, user.user_id).await?;
    Ok(Json(DataResponse { data: project }))
}

/// DELETE /api/v1/projects/{id}
///
/// Removes the project with its CAD files, their plans and stored geometry.
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<EntityId>,
) -> AppResult<StatusCode> {
    projects::delete_project(&state.ctx, id, user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/projects/{id}/cad-files
pub async fn list_cad_files(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<EntityId>,
) -> AppResult<Json<DataResponse<Vec<CadFile>>>> {
    projects::owned_project(&state.ctx, id, user.user_id).await?;
    let cad_files = state.ctx.store.list_cad_files(id).await?;
    Ok(Json(DataResponse { data: cad_files }))
}
