//! Repository for the `task_completions` ledger.
//!
//! One row per applied completion event; the primary key is the dedup key.

use sqlx::{PgExecutor, PgPool};

use crate::models::task::CompletionKey;

pub struct CompletionRepo;

impl CompletionRepo {
    pub async fn exists(pool: &PgPool, key: &CompletionKey) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS ( \
                 SELECT 1 FROM task_completions \
                 WHERE task_id = $1 AND cad_file_id = $2 AND process_type = $3 \
             )",
        )
        .bind(key.task_id)
        .bind(key.cad_file_id)
        .bind(key.process_type.as_str())
        .fetch_one(pool)
        .await
    }

    /// Record a completion. Returns `false` if it was already recorded.
    pub async fn record<'e, E>(executor: E, key: &CompletionKey) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "INSERT INTO task_completions (task_id, cad_file_id, process_type) \
             VALUES ($1, $2, $3) \
             ON CONFLICT DO NOTHING",
        )
        .bind(key.task_id)
        .bind(key.cad_file_id)
        .bind(key.process_type.as_str())
        .execute(executor)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
