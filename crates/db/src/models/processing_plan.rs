//! Processing plan entity model: the output of plan generation.

use serde::{Deserialize, Serialize};
use sheetflow_core::types::{EntityId, Timestamp};
use sqlx::FromRow;

/// A row from the `processing_plans` table.
///
/// The list columns are carried opaquely; only the engine interprets them.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ProcessingPlan {
    pub id: EntityId,
    pub cad_file_id: EntityId,
    #[sqlx(json)]
    pub rotations: Vec<serde_json::Value>,
    #[sqlx(json)]
    pub flips: Vec<serde_json::Value>,
    #[sqlx(json)]
    pub tools: Vec<serde_json::Value>,
    #[sqlx(json)]
    pub modules: Vec<serde_json::Value>,
    #[sqlx(json)]
    pub bending_sequences: Vec<serde_json::Value>,
    pub processing_time_ns: i64,
    pub estimated_manufacturing_time_ns: i64,
    pub total_tool_distance: f64,
    pub quantity: i64,
    pub created_at: Timestamp,
}
