//! Rows of the `bus_events` queue table.

use serde::Serialize;
use sheetflow_core::types::{EntityId, Timestamp};
use sqlx::FromRow;

/// A queued event envelope.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BusEvent {
    pub id: EntityId,
    pub kind: String,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
    /// Lease end of the current delivery; `None` until first claimed.
    pub claimed_until: Option<Timestamp>,
    pub attempts: i32,
    pub acked_at: Option<Timestamp>,
}
