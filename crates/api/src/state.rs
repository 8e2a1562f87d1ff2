use std::sync::Arc;

use sheetflow_pipeline::ServiceContext;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: the pipeline context and config are reference counted.
#[derive(Clone)]
pub struct AppState {
    /// Store, bus, storage and cache collaborators of the pipeline.
    pub ctx: ServiceContext,
    /// Database pool, when the store is Postgres-backed. Used by the health check.
    pub pool: Option<sheetflow_db::DbPool>,
    pub config: Arc<ServerConfig>,
}
