//! Repository for the `processing_plans` table.
//!
//! Plans are insert-only; a CAD file's current plan is its newest row.

use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};
use sheetflow_core::types::EntityId;

use crate::models::processing_plan::ProcessingPlan;

/// Column list for `processing_plans` queries.
const COLUMNS: &str = "\
    id, cad_file_id, rotations, flips, tools, modules, bending_sequences, \
    processing_time_ns, estimated_manufacturing_time_ns, total_tool_distance, \
    quantity, created_at";

pub struct ProcessingPlanRepo;

impl ProcessingPlanRepo {
    pub async fn create<'e, E>(
        executor: E,
        plan: &ProcessingPlan,
    ) -> Result<ProcessingPlan, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO processing_plans \
                 (id, cad_file_id, rotations, flips, tools, modules, bending_sequences, \
                  processing_time_ns, estimated_manufacturing_time_ns, total_tool_distance, \
                  quantity, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProcessingPlan>(&query)
            .bind(plan.id)
            .bind(plan.cad_file_id)
            .bind(Json(&plan.rotations))
            .bind(Json(&plan.flips))
            .bind(Json(&plan.tools))
            .bind(Json(&plan.modules))
            .bind(Json(&plan.bending_sequences))
            .bind(plan.processing_time_ns)
            .bind(plan.estimated_manufacturing_time_ns)
            .bind(plan.total_tool_distance)
            .bind(plan.quantity)
            .bind(plan.created_at)
            .fetch_one(executor)
            .await
    }

    /// Newest plan stored for a CAD file.
    pub async fn find_by_cad_file(
        pool: &PgPool,
        cad_file_id: EntityId,
    ) -> Result<Option<ProcessingPlan>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM processing_plans \
             WHERE cad_file_id = $1 \
             ORDER BY created_at DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, ProcessingPlan>(&query)
            .bind(cad_file_id)
            .fetch_optional(pool)
            .await
    }

    /// Delete every plan of a CAD file. Returns the number of rows removed.
    pub async fn delete_by_cad_file(
        pool: &PgPool,
        cad_file_id: EntityId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM processing_plans WHERE cad_file_id = $1")
            .bind(cad_file_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
