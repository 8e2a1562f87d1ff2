//! Handlers that start engine work and serve its results.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use sheetflow_core::error::CoreError;
use sheetflow_core::types::EntityId;
use sheetflow_db::models::processing_plan::ProcessingPlan;
use sheetflow_db::models::task::Task;
use sheetflow_pipeline::dispatch::{dispatch_cad_file, dispatch_project, BatchDispatch, DispatchOutcome};
use sheetflow_pipeline::projects;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::{DataResponse, MessageResponse};
use crate::state::AppState;

/// Payload of a single dispatch: the new task, or the stored plan.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum DispatchData {
    Task(Task),
    Plan(ProcessingPlan),
}

/// POST /api/v1/cad-files/{id}/process
pub async fn process_cad_file(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<EntityId>,
) -> AppResult<Json<MessageResponse<DispatchData>>> {
    let cad_file = projects::owned_cad_file(&state.ctx, id, user.user_id).await?;
    let outcome = dispatch_cad_file(&state.ctx, user.user_id, &cad_file).await?;

    let message = outcome.message();
    let data = match outcome {
        DispatchOutcome::Started { task, .. } => DispatchData::Task(task),
        DispatchOutcome::AlreadyProcessed { plan } => DispatchData::Plan(plan),
    };
    Ok(Json(MessageResponse { message, data }))
}

/// POST /api/v1/projects/{id}/process
pub async fn process_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<EntityId>,
) -> AppResult<Json<MessageResponse<BatchDispatch>>> {
    let batch = dispatch_project(&state.ctx, user.user_id, id).await?;
    let message = if batch.task.is_some() {
        "Batch processing started"
    } else {
        "Nothing to process"
    };
    Ok(Json(MessageResponse {
        message,
        data: batch,
    }))
}

/// GET /api/v1/cad-files/{id}/processing-plan
pub async fn processing_plan(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<EntityId>,
) -> AppResult<Json<DataResponse<ProcessingPlan>>> {
    let cad_file = projects::owned_cad_file(&state.ctx, id, user.user_id).await?;
    let plan = state
        .ctx
        .store
        .find_processing_plan(cad_file.id)
        .await?
        .ok_or_else(|| CoreError::not_found("ProcessingPlan", cad_file.id))?;
    Ok(Json(DataResponse { data: plan }))
}
