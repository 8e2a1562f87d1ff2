//! Repository for the `tools` lookup table.

use sqlx::PgPool;

use crate::models::tool::Tool;

const COLUMNS: &str = "id, tool_id, name, angle, created_at";

pub struct ToolRepo;

impl ToolRepo {
    /// First tool registered for an exact bend angle.
    pub async fn find_by_angle(pool: &PgPool, angle: i64) -> Result<Option<Tool>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM tools WHERE angle = $1 ORDER BY created_at ASC LIMIT 1"
        );
        sqlx::query_as::<_, Tool>(&query)
            .bind(angle)
            .fetch_optional(pool)
            .await
    }

    /// Register a tool. Used by seeding and tests; the service never writes tools.
    pub async fn create(pool: &PgPool, tool: &Tool) -> Result<Tool, sqlx::Error> {
        let query = format!(
            "INSERT INTO tools (id, tool_id, name, angle, created_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Tool>(&query)
            .bind(tool.id)
            .bind(&tool.tool_id)
            .bind(&tool.name)
            .bind(tool.angle)
            .bind(tool.created_at)
            .fetch_one(pool)
            .await
    }
}
