//! Repository for the `projects` table.

use sqlx::PgPool;
use sheetflow_core::types::EntityId;

use crate::models::project::Project;

/// Column list for `projects` queries.
const COLUMNS: &str = "id, owner_id, title, description, created_at";

/// Provides CRUD operations for projects.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Insert a new project, returning the stored row.
    pub async fn create(pool: &PgPool, project: &Project) -> Result<Project, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects (id, owner_id, title, description, created_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(project.id)
            .bind(project.owner_id)
            .bind(&project.title)
            .bind(&project.description)
            .bind(project.created_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: EntityId) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List an owner's projects, newest first.
    pub async fn list_by_owner(
        pool: &PgPool,
        owner_id: EntityId,
    ) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM projects WHERE owner_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(owner_id)
            .fetch_all(pool)
            .await
    }

    /// Delete a project. Returns the number of rows removed.
    pub async fn delete(pool: &PgPool, id: EntityId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Whether the owner already has a project with this title.
    pub async fn title_exists(
        pool: &PgPool,
        owner_id: EntityId,
        title: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM projects WHERE owner_id = $1 AND title = $2)",
        )
        .bind(owner_id)
        .bind(title)
        .fetch_one(pool)
        .await
    }
}
