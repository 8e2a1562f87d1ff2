//! [`EntityStore`] over Postgres, delegating to the repositories.
//!
//! A completion is applied inside one transaction; dropping it on an early
//! return rolls every write back.

use async_trait::async_trait;
use sheetflow_core::types::EntityId;

use crate::models::cad_file::CadFile;
use crate::models::processing_plan::ProcessingPlan;
use crate::models::project::Project;
use crate::models::task::{CompletionKey, Task};
use crate::models::tool::Tool;
use crate::repositories::{
    CadFileRepo, CompletionRepo, ProcessingPlanRepo, ProjectRepo, TaskRepo, ToolRepo,
};
use crate::store::{EntityStore, StoreError, StoreResult};
use crate::DbPool;

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntityStore for PgStore {
    async fn create_project(&self, project: &Project) -> StoreResult<Project> {
        Ok(ProjectRepo::create(&self.pool, project).await?)
    }

    async fn find_project(&self, id: EntityId) -> StoreResult<Option<Project>> {
        Ok(ProjectRepo::find_by_id(&self.pool, id).await?)
    }

    async fn list_projects(&self, owner_id: EntityId) -> StoreResult<Vec<Project>> {
        Ok(ProjectRepo::list_by_owner(&self.pool, owner_id).await?)
    }

    async fn project_title_exists(&self, owner_id: EntityId, title: &str) -> StoreResult<bool> {
        Ok(ProjectRepo::title_exists(&self.pool, owner_id, title).await?)
    }

    async fn delete_project(&self, id: EntityId) -> StoreResult<bool> {
        Ok(ProjectRepo::delete(&self.pool, id).await? > 0)
    }

    async fn create_cad_file(&self, cad_file: &CadFile) -> StoreResult<CadFile> {
        Ok(CadFileRepo::create(&self.pool, cad_file).await?)
    }

    async fn find_cad_file(&self, id: EntityId) -> StoreResult<Option<CadFile>> {
        Ok(CadFileRepo::find_by_id(&self.pool, id).await?)
    }

    async fn list_cad_files(&self, project_id: EntityId) -> StoreResult<Vec<CadFile>> {
        Ok(CadFileRepo::list_by_project(&self.pool, project_id).await?)
    }

    async fn update_cad_file(&self, cad_file: &CadFile) -> StoreResult<CadFile> {
        CadFileRepo::update(&self.pool, cad_file)
            .await?
            .ok_or(StoreError::Missing {
                entity: "CADFile",
                id: cad_file.id,
            })
    }

    async fn delete_cad_file(&self, id: EntityId) -> StoreResult<bool> {
        Ok(CadFileRepo::delete(&self.pool, id).await? > 0)
    }

    async fn create_task(&self, task: &Task) -> StoreResult<Task> {
        Ok(TaskRepo::create(&self.pool, task).await?)
    }

    async fn find_task(&self, id: EntityId) -> StoreResult<Option<Task>> {
        Ok(TaskRepo::find_by_id(&self.pool, id).await?)
    }

    async fn list_tasks(&self) -> StoreResult<Vec<Task>> {
        Ok(TaskRepo::list_all(&self.pool).await?)
    }

    async fn update_task(&self, task: &Task) -> StoreResult<Task> {
        TaskRepo::update(&self.pool, task)
            .await?
            .ok_or(StoreError::Missing {
                entity: "Task",
                id: task.id,
            })
    }

    async fn create_processing_plan(&self, plan: &ProcessingPlan) -> StoreResult<ProcessingPlan> {
        Ok(ProcessingPlanRepo::create(&self.pool, plan).await?)
    }

    async fn find_processing_plan(
        &self,
        cad_file_id: EntityId,
    ) -> StoreResult<Option<ProcessingPlan>> {
        Ok(ProcessingPlanRepo::find_by_cad_file(&self.pool, cad_file_id).await?)
    }

    async fn delete_processing_plans(&self, cad_file_id: EntityId) -> StoreResult<u64> {
        Ok(ProcessingPlanRepo::delete_by_cad_file(&self.pool, cad_file_id).await?)
    }

    async fn find_tool_by_angle(&self, angle: i64) -> StoreResult<Option<Tool>> {
        Ok(ToolRepo::find_by_angle(&self.pool, angle).await?)
    }

    async fn completion_recorded(&self, key: &CompletionKey) -> StoreResult<bool> {
        Ok(CompletionRepo::exists(&self.pool, key).await?)
    }

    async fn apply_completion(
        &self,
        key: &CompletionKey,
        cad_file: &CadFile,
        plan: Option<&ProcessingPlan>,
        task: &Task,
    ) -> StoreResult<Option<Task>> {
        let mut tx = self.pool.begin().await?;

        if !CompletionRepo::record(&mut *tx, key).await? {
            tx.rollback().await?;
            return Ok(None);
        }

        if let Some(plan) = plan {
            ProcessingPlanRepo::create(&mut *tx, plan).await?;
        }
        CadFileRepo::update(&mut *tx, cad_file)
            .await?
            .ok_or(StoreError::Missing {
                entity: "CADFile",
                id: cad_file.id,
            })?;
        let task = TaskRepo::update(&mut *tx, task)
            .await?
            .ok_or(StoreError::Missing {
                entity: "Task",
                id: task.id,
            })?;

        tx.commit().await?;
        Ok(Some(task))
    }
}
