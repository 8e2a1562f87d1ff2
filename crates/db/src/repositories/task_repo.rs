//! Repository for the `tasks` table.
//!
//! Statuses are written through `TaskStatus::id()`; no literal status ids.

use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};
use sheetflow_core::types::EntityId;

use crate::models::task::Task;

/// Column list for `tasks` queries.
const COLUMNS: &str = "\
    id, user_id, status_id, process_types, cad_files, quantity, completed, \
    processing_time_ns, created_at";

/// Provides CRUD operations for tasks.
pub struct TaskRepo;

impl TaskRepo {
    pub async fn create(pool: &PgPool, task: &Task) -> Result<Task, sqlx::Error> {
        let query = format!(
            "INSERT INTO tasks \
                 (id, user_id, status_id, process_types, cad_files, quantity, completed, \
                  processing_time_ns, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(task.id)
            .bind(task.user_id)
            .bind(task.status.id())
            .bind(Json(&task.process_types))
            .bind(&task.cad_files)
            .bind(task.quantity)
            .bind(task.completed)
            .bind(task.processing_time_ns)
            .bind(task.created_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: EntityId) -> Result<Option<Task>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1");
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List every task, newest first.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Task>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks ORDER BY created_at DESC");
        sqlx::query_as::<_, Task>(&query).fetch_all(pool).await
    }

    /// Persist status, progress and timing. Returns `None` if the row is gone.
    pub async fn update<'e, E>(executor: E, task: &Task) -> Result<Option<Task>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "UPDATE tasks SET \
                 status_id = $2, process_types = $3, cad_files = $4, quantity = $5, \
                 completed = $6, processing_time_ns = $7 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(task.id)
            .bind(task.status.id())
            .bind(Json(&task.process_types))
            .bind(&task.cad_files)
            .bind(task.quantity)
            .bind(task.completed)
            .bind(task.processing_time_ns)
            .fetch_optional(executor)
            .await
    }
}
