/// Failure on either side of the event bus.
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Failed to encode event payload: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to decode {kind} payload: {source}")]
    Decode {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    /// The in-process subscriber fell behind and `n` envelopes were dropped.
    #[error("Subscriber lagged, {0} events skipped")]
    Lagged(u64),

    #[error("Event bus closed")]
    Closed,

    #[error("Event bus database error: {0}")]
    Database(#[from] sqlx::Error),
}
