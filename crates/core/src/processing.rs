//! Processing stages, task statuses and the dispatch decision.
//!
//! A CAD file moves through three processing levels. The level stored on the
//! file alone decides which job the dispatcher starts next.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Integer stage marker stored in a CAD file's feature properties.
pub type ProcessLevel = i32;

/// Freshly uploaded, nothing extracted yet.
pub const LEVEL_UNPROCESSED: ProcessLevel = 0;

/// Bend features have been extracted.
pub const LEVEL_FEATURES_EXTRACTED: ProcessLevel = 1;

/// A processing plan has been generated.
pub const LEVEL_PLAN_GENERATED: ProcessLevel = 2;

// ---------------------------------------------------------------------------
// Task status
// ---------------------------------------------------------------------------

/// Status id type matching SMALLINT in the database.
pub type StatusId = i16;

/// Lifecycle of a tracked unit of work. There is no failed state.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Processing = 1,
    Complete = 2,
}

impl TaskStatus {
    /// Return the database status id.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Complete => "complete",
        }
    }
}

impl TryFrom<StatusId> for TaskStatus {
    type Error = CoreError;

    fn try_from(value: StatusId) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Processing),
            2 => Ok(Self::Complete),
            other => Err(CoreError::Internal(format!("Unknown task status id {other}"))),
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Process type
// ---------------------------------------------------------------------------

/// The kind of external job a task requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessType {
    FeatureRecognition,
    ProcessPlanning,
}

impl ProcessType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FeatureRecognition => "feature_recognition",
            Self::ProcessPlanning => "process_planning",
        }
    }

    /// Parse from the stored name.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "feature_recognition" => Ok(Self::FeatureRecognition),
            "process_planning" => Ok(Self::ProcessPlanning),
            other => Err(CoreError::Validation(format!(
                "Unknown process type '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for ProcessType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Dispatch decision
// ---------------------------------------------------------------------------

/// What the dispatcher should do with a CAD file at a given level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchAction {
    /// Start an external job of the given kind.
    Start(ProcessType),
    /// Nothing left to run; serve the stored processing plan.
    AlreadyPlanned,
}

impl DispatchAction {
    pub fn for_level(level: ProcessLevel) -> Self {
        match level {
            LEVEL_UNPROCESSED => Self::Start(ProcessType::FeatureRecognition),
            LEVEL_FEATURES_EXTRACTED => Self::Start(ProcessType::ProcessPlanning),
            _ => Self::AlreadyPlanned,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
