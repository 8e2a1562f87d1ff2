//! The envelope every payload travels in, and decoding of inbound kinds.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sheetflow_core::types::{new_id, EntityId, Timestamp};

use crate::contracts::{Event, FeatureRecognitionComplete, ProcessPlanningComplete};
use crate::error::EventBusError;

/// A kind-tagged JSON payload.
///
/// `id` identifies one envelope on the bus; listeners acknowledge by it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: EntityId,
    pub kind: String,
    pub payload: serde_json::Value,
    pub timestamp: Timestamp,
}

impl EventEnvelope {
    /// Wrap a typed payload under its kind name.
    pub fn wrap<E: Event>(event: &E) -> Result<Self, EventBusError> {
        let payload = serde_json::to_value(event).map_err(EventBusError::Encode)?;
        Ok(Self {
            id: new_id(),
            kind: E::KIND.to_string(),
            payload,
            timestamp: Utc::now(),
        })
    }

    /// Decode the payload as `E`, regardless of the kind tag.
    pub fn decode<E: DeserializeOwned>(&self) -> Result<E, EventBusError> {
        serde_json::from_value(self.payload.clone()).map_err(|source| EventBusError::Decode {
            kind: self.kind.clone(),
            source,
        })
    }
}

/// Closed set of inbound kinds the completion consumer understands.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    FeatureRecognitionComplete(FeatureRecognitionComplete),
    ProcessPlanningComplete(ProcessPlanningComplete),
    /// Anything else; carries the kind name for logging.
    Unknown(String),
}

impl InboundEvent {
    pub fn decode(envelope: &EventEnvelope) -> Result<Self, EventBusError> {
        match envelope.kind.as_str() {
            FeatureRecognitionComplete::KIND => {
                Ok(Self::FeatureRecognitionComplete(envelope.decode()?))
            }
            ProcessPlanningComplete::KIND => Ok(Self::ProcessPlanningComplete(envelope.decode()?)),
            other => Ok(Self::Unknown(other.to_string())),
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            Self::FeatureRecognitionComplete(_) => FeatureRecognitionComplete::KIND,
            Self::ProcessPlanningComplete(_) => ProcessPlanningComplete::KIND,
            Self::Unknown(kind) => kind,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
