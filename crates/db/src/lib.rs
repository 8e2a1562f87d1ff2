//! Persistence for sheetflow records.
//!
//! - [`models`] -- row types and DTOs.
//! - [`repositories`] -- zero-sized repositories over a [`DbPool`].
//! - [`store`] -- the [`EntityStore`] seam the pipeline depends on.
//! - [`PgStore`] / [`MemoryStore`] -- its Postgres and in-memory implementations.

use sqlx::postgres::PgPoolOptions;

pub mod memory;
pub mod models;
pub mod pg_store;
pub mod repositories;
pub mod store;

pub use memory::{MemoryStore, MemoryStoreStats};
pub use pg_store::PgStore;
pub use store::{EntityStore, StoreError, StoreResult};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to prove the pool can reach the database.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}

/// Apply all pending migrations from `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
