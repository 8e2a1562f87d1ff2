use serde::{Deserialize, Serialize};
use sheetflow_core::types::{EntityId, Timestamp};
use sqlx::FromRow;

/// A row from the `tools` table. Read-only to this service.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Tool {
    pub id: EntityId,
    /// Physical tool identity attached to resolved bend features.
    pub tool_id: String,
    pub name: String,
    /// Bend angle in whole degrees.
    pub angle: i64,
    pub created_at: Timestamp,
}
