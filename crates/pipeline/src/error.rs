//! Error types of the request paths and of completion handling.
//!
//! A [`PipelineError`] becomes an HTTP response; a [`CompletionError`] stops
//! the completion consumer.

use sheetflow_core::error::CoreError;
use sheetflow_db::StoreError;
use sheetflow_events::EventBusError;

/// Failure of an upload, dispatch or project operation.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Bus(#[from] EventBusError),

    #[error("File storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure while folding a completion event into storage.
///
/// Every variant is unrecoverable for the event at hand and halts the
/// consumer; the event is left unacknowledged.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("{entity} {id} does not exist")]
    NotFound { entity: &'static str, id: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to subscribe to completion events: {0}")]
    Subscribe(#[from] EventBusError),
}

impl CompletionError {
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
