//! Payloads exchanged with the external geometry engine.
//!
//! Field names are snake_case on the wire, ids are UUID strings, durations are
//! integer nanoseconds and byte payloads are base64 strings. The two
//! `*Started` events carry the dispatching task's id so the engine can echo it
//! back in the matching `*Complete` event.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sheetflow_core::codec::{base64_bytes, duration_nanos};
use sheetflow_core::processing::ProcessLevel;
use sheetflow_core::types::EntityId;

/// A payload with a fixed kind name on the bus.
pub trait Event: Serialize {
    const KIND: &'static str;
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Ask the engine to extract bend features from a step-format body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecognitionStarted {
    pub user_id: EntityId,
    pub cad_file_id: EntityId,
    pub task_id: EntityId,
    /// Storage location of the step-format geometry.
    pub url: String,
}

impl Event for FeatureRecognitionStarted {
    const KIND: &'static str = "FeatureRecognitionStarted";
}

/// Ask the engine to plan the bending process from extracted features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessPlanningStarted {
    pub cad_file_id: EntityId,
    pub user_id: EntityId,
    pub task_id: EntityId,
    pub bend_count: i64,
    #[serde(with = "base64_bytes", default)]
    pub serialized_data: Vec<u8>,
}

impl Event for ProcessPlanningStarted {
    const KIND: &'static str = "ProcessPlanningStarted";
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturePropsReport {
    pub process_level: ProcessLevel,
    pub bend_count: i32,
    #[serde(with = "duration_nanos")]
    pub fre_time: Duration,
    #[serde(with = "base64_bytes", default)]
    pub serial_data: Vec<u8>,
}

/// One bend as reported by the engine. Everything besides the angle is
/// carried through untouched, including whatever the engine put in `tool_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BendFeatureReport {
    pub angle: i64,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecognitionComplete {
    pub user_id: EntityId,
    pub cad_file_id: EntityId,
    pub task_id: EntityId,
    pub feature_props: FeaturePropsReport,
    #[serde(default)]
    pub bend_features: Vec<BendFeatureReport>,
}

impl Event for FeatureRecognitionComplete {
    const KIND: &'static str = "FeatureRecognitionComplete";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingPlanReport {
    #[serde(default)]
    pub rotations: Vec<serde_json::Value>,
    #[serde(default)]
    pub flips: Vec<serde_json::Value>,
    #[serde(default)]
    pub tools: Vec<serde_json::Value>,
    #[serde(default)]
    pub modules: Vec<serde_json::Value>,
    #[serde(with = "duration_nanos")]
    pub processing_time: Duration,
    #[serde(with = "duration_nanos")]
    pub estimated_manufacturing_time: Duration,
    pub total_tool_distance: f64,
    #[serde(default)]
    pub bending_sequences: Vec<serde_json::Value>,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessPlanningComplete {
    pub user_id: EntityId,
    pub cad_file_id: EntityId,
    pub task_id: EntityId,
    pub process_level: ProcessLevel,
    pub processing_plan: ProcessingPlanReport,
}

impl Event for ProcessPlanningComplete {
    const KIND: &'static str = "ProcessPlanningComplete";
}

/// The kinds the completion consumer binds to.
pub const COMPLETION_KINDS: [&str; 2] = [
    FeatureRecognitionComplete::KIND,
    ProcessPlanningComplete::KIND,
];
