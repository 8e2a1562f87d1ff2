//! Project and ownership operations shared by the HTTP handlers and the
//! upload and dispatch paths.

use std::path::PathBuf;

use sheetflow_core::error::CoreError;
use sheetflow_core::types::EntityId;
use sheetflow_db::models::cad_file::CadFile;
use sheetflow_db::models::project::{CreateProject, Project};

use crate::context::ServiceContext;
use crate::error::PipelineError;

/// Storage directory holding every geometry file of a project.
pub(crate) fn project_dir(owner_id: EntityId, project_id: EntityId) -> PathBuf {
    PathBuf::from(owner_id.to_string()).join(project_id.to_string())
}

/// Create a project. Titles are unique per owner.
pub async fn create_project(
    ctx: &ServiceContext,
    owner_id: EntityId,
    input: CreateProject,
) -> Result<Project, PipelineError> {
    let project = input.into_project(owner_id)?;

    if ctx
        .store
        .project_title_exists(owner_id, &project.title)
        .await?
    {
        return Err(CoreError::Conflict(format!(
            "A project titled '{}' already exists",
            project.title
        ))
        .into());
    }

    let created = ctx.store.create_project(&project).await?;
    tracing::info!(project_id = %created.id, owner_id = %owner_id, "Project created");
    Ok(created)
}

/// Load a project and check that `user_id` owns it.
pub async fn owned_project(
    ctx: &ServiceContext,
    project_id: EntityId,
    user_id: EntityId,
) -> Result<Project, PipelineError> {
    let project = ctx
        .store
        .find_project(project_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Project", project_id))?;

    if project.owner_id != user_id {
        return Err(CoreError::Forbidden("You do not own this project".into()).into());
    }
    Ok(project)
}

/// Load a CAD file and check that `user_id` owns its project.
pub async fn owned_cad_file(
    ctx: &ServiceContext,
    cad_file_id: EntityId,
    user_id: EntityId,
) -> Result<CadFile, PipelineError> {
    let cad_file = ctx
        .store
        .find_cad_file(cad_file_id)
        .await?
        .ok_or_else(|| CoreError::not_found("CADFile", cad_file_id))?;

    owned_project(ctx, cad_file.project_id, user_id).await?;
    Ok(cad_file)
}

/// Delete a CAD file with its processing plans and stored geometry.
///
/// Stored files are removed last and best-effort: a leftover file is logged,
/// never surfaced.
pub async fn delete_cad_file(
    ctx: &ServiceContext,
    cad_file_id: EntityId,
    user_id: EntityId,
) -> Result<(), PipelineError> {
    let cad_file = owned_cad_file(ctx, cad_file_id, user_id).await?;

    let plans = ctx.store.delete_processing_plans(cad_file.id).await?;
    if !ctx.store.delete_cad_file(cad_file.id).await? {
        return Err(CoreError::not_found("CADFile", cad_file.id).into());
    }

    for location in [&cad_file.step_url, &cad_file.obj_url].into_iter().flatten() {
        if let Err(e) = ctx.storage.remove(location).await {
            tracing::warn!(location = %location, error = %e, "Failed to remove stored geometry");
        }
    }

    tracing::info!(cad_file_id = %cad_file.id, plans, "CAD file deleted");
    Ok(())
}

/// Delete a project with its CAD files, their processing plans, and the
/// project's storage directory.
///
/// Records go first, the directory last and best-effort.
pub async fn delete_project(
    ctx: &ServiceContext,
    project_id: EntityId,
    user_id: EntityId,
) -> Result<(), PipelineError> {
    let project = owned_project(ctx, project_id, user_id).await?;

    let cad_files = ctx.store.list_cad_files(project.id).await?;
    let mut plans = 0;
    for cad_file in &cad_files {
        plans += ctx.store.delete_processing_plans(cad_file.id).await?;
        ctx.store.delete_cad_file(cad_file.id).await?;
    }
    if !ctx.store.delete_project(project.id).await? {
        return Err(CoreError::not_found("Project", project.id).into());
    }

    let dir = project_dir(project.owner_id, project.id);
    if let Err(e) = ctx.storage.remove_dir(&dir).await {
        tracing::warn!(project_id = %project.id, error = %e, "Failed to remove project storage");
    }

    tracing::info!(
        project_id = %project.id,
        cad_files = cad_files.len(),
        plans,
        "Project deleted",
    );
    Ok(())
}
