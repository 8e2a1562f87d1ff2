//! Repository for the `cad_files` table.

use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};
use sheetflow_core::types::EntityId;

use crate::models::cad_file::CadFile;

/// Column list for `cad_files` queries.
const COLUMNS: &str = "\
    id, project_id, file_name, step_url, obj_url, material, file_size, \
    process_level, bend_count, fre_time_ns, serial_data, bend_features, \
    created_at";

/// Provides CRUD operations for CAD files.
pub struct CadFileRepo;

impl CadFileRepo {
    /// Insert a new CAD file, returning the stored row.
    pub async fn create(pool: &PgPool, cad_file: &CadFile) -> Result<CadFile, sqlx::Error> {
        let query = format!(
            "INSERT INTO cad_files \
                 (id, project_id, file_name, step_url, obj_url, material, file_size, \
                  process_level, bend_count, fre_time_ns, serial_data, bend_features, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CadFile>(&query)
            .bind(cad_file.id)
            .bind(cad_file.project_id)
            .bind(&cad_file.file_name)
            .bind(&cad_file.step_url)
            .bind(&cad_file.obj_url)
            .bind(&cad_file.material)
            .bind(cad_file.file_size)
            .bind(cad_file.feature_props.process_level)
            .bind(cad_file.feature_props.bend_count)
            .bind(cad_file.feature_props.fre_time_ns)
            .bind(&cad_file.feature_props.serial_data)
            .bind(Json(&cad_file.bend_features))
            .bind(cad_file.created_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: EntityId) -> Result<Option<CadFile>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM cad_files WHERE id = $1");
        sqlx::query_as::<_, CadFile>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a project's CAD files in upload order.
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: EntityId,
    ) -> Result<Vec<CadFile>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM cad_files WHERE project_id = $1 ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, CadFile>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Overwrite every mutable column. Returns `None` if the row is gone.
    pub async fn update<'e, E>(executor: E, cad_file: &CadFile) -> Result<Option<CadFile>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "UPDATE cad_files SET \
                 file_name = $2, step_url = $3, obj_url = $4, material = $5, file_size = $6, \
                 process_level = $7, bend_count = $8, fre_time_ns = $9, serial_data = $10, \
                 bend_features = $11 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CadFile>(&query)
            .bind(cad_file.id)
            .bind(&cad_file.file_name)
            .bind(&cad_file.step_url)
            .bind(&cad_file.obj_url)
            .bind(&cad_file.material)
            .bind(cad_file.file_size)
            .bind(cad_file.feature_props.process_level)
            .bind(cad_file.feature_props.bend_count)
            .bind(cad_file.feature_props.fre_time_ns)
            .bind(&cad_file.feature_props.serial_data)
            .bind(Json(&cad_file.bend_features))
            .fetch_optional(executor)
            .await
    }

    /// Delete a CAD file. Returns the number of rows removed.
    pub async fn delete(pool: &PgPool, id: EntityId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cad_files WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
