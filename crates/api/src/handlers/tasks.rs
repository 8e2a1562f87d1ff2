//! Handlers for the `/tasks` resource.
//!
//! The full task list is cached under the task-list key and filtered per
//! caller. Dispatch and completion evict that key.

use axum::extract::{Path, State};
use axum::Json;
use sheetflow_core::error::CoreError;
use sheetflow_core::types::EntityId;
use sheetflow_db::models::task::Task;
use sheetflow_pipeline::cache::read_through;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/tasks
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<Task>>>> {
    let tasks = all_tasks(&state).await?;
    let own = tasks
        .into_iter()
        .filter(|task| task.user_id == user.user_id)
        .collect();
    Ok(Json(DataResponse { data: own }))
}

/// GET /api/v1/tasks/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<EntityId>,
) -> AppResult<Json<DataResponse<Task>>> {
    let task = state
        .ctx
        .store
        .find_task(id)
        .await?
        .ok_or_else(|| CoreError::not_found("Task", id))?;

    if task.user_id != user.user_id {
        return Err(CoreError::Forbidden("You do not own this task".into()).into());
    }
    Ok(Json(DataResponse { data: task }))
}

/// Read the full task list through the cache.
async fn all_tasks(state: &AppState) -> AppResult<Vec<Task>> {
    let ctx = &state.ctx;
    let tasks = read_through(
        ctx.cache.as_ref(),
        &ctx.invalidator,
        &ctx.config.task_cache_key,
        ctx.store.list_tasks(),
    )
    .await?;
    Ok(tasks)
}
