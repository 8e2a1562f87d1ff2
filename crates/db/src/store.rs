//! The entity-store seam the pipeline depends on.
//!
//! One trait covers every record kind so a service context carries a single
//! `Arc<dyn EntityStore>`. Lookups return `Option`; deciding whether a miss is
//! a 404 or a halting error is the caller's business.

use async_trait::async_trait;
use sheetflow_core::types::EntityId;

use crate::models::cad_file::CadFile;
use crate::models::processing_plan::ProcessingPlan;
use crate::models::project::Project;
use crate::models::task::{CompletionKey, Task};
use crate::models::tool::Tool;

/// Persistence failure of a store call.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// An update or delete targeted a row that no longer exists.
    #[error("{entity} {id} no longer exists")]
    Missing { entity: &'static str, id: EntityId },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait EntityStore: Send + Sync {
    // -- projects --

    async fn create_project(&self, project: &Project) -> StoreResult<Project>;
    async fn find_project(&self, id: EntityId) -> StoreResult<Option<Project>>;
    async fn list_projects(&self, owner_id: EntityId) -> StoreResult<Vec<Project>>;
    async fn project_title_exists(&self, owner_id: EntityId, title: &str) -> StoreResult<bool>;
    /// Returns `false` if there was nothing to delete.
    async fn delete_project(&self, id: EntityId) -> StoreResult<bool>;

    // -- CAD files --

    async fn create_cad_file(&self, cad_file: &CadFile) -> StoreResult<CadFile>;
    async fn find_cad_file(&self, id: EntityId) -> StoreResult<Option<CadFile>>;
    /// CAD files of a project in upload order.
    async fn list_cad_files(&self, project_id: EntityId) -> StoreResult<Vec<CadFile>>;
    async fn update_cad_file(&self, cad_file: &CadFile) -> StoreResult<CadFile>;
    /// Returns `false` if there was nothing to delete.
    async fn delete_cad_file(&self, id: EntityId) -> StoreResult<bool>;

    // -- tasks --

    async fn create_task(&self, task: &Task) -> StoreResult<Task>;
    async fn find_task(&self, id: EntityId) -> StoreResult<Option<Task>>;
    /// Every task, newest first. Backs the cached task list.
    async fn list_tasks(&self) -> StoreResult<Vec<Task>>;
    async fn update_task(&self, task: &Task) -> StoreResult<Task>;

    // -- processing plans --

    async fn create_processing_plan(&self, plan: &ProcessingPlan) -> StoreResult<ProcessingPlan>;
    /// The newest plan of a CAD file.
    async fn find_processing_plan(&self, cad_file_id: EntityId)
        -> StoreResult<Option<ProcessingPlan>>;
    async fn delete_processing_plans(&self, cad_file_id: EntityId) -> StoreResult<u64>;

    // -- tools --

    async fn find_tool_by_angle(&self, angle: i64) -> StoreResult<Option<Tool>>;

    // -- completion ledger --

    async fn completion_recorded(&self, key: &CompletionKey) -> StoreResult<bool>;

    /// Fold one completion into storage as a single unit: record `key` in the
    /// ledger, insert `plan` if given, and overwrite `cad_file` and `task`.
    ///
    /// Either every write lands or none does. Returns `None`, with nothing
    /// written, if `key` was already recorded.
    async fn apply_completion(
        &self,
        key: &CompletionKey,
        cad_file: &CadFile,
        plan: Option<&ProcessingPlan>,
        task: &Task,
    ) -> StoreResult<Option<Task>>;
}
