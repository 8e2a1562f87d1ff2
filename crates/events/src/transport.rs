//! Producer and consumer seams of the event bus.

use async_trait::async_trait;
use sheetflow_core::types::EntityId;
use tokio::sync::mpsc;

use crate::contracts::Event;
use crate::envelope::EventEnvelope;
use crate::error::EventBusError;

/// Publishes envelopes onto the bus.
#[async_trait]
pub trait EventEmitter: Send + Sync {
    async fn emit(&self, envelope: EventEnvelope) -> Result<(), EventBusError>;
}

/// Wrap and publish a typed payload. Returns the envelope id.
pub async fn emit_event<E: Event + Sync>(
    emitter: &dyn EventEmitter,
    event: &E,
) -> Result<EntityId, EventBusError> {
    let envelope = EventEnvelope::wrap(event)?;
    let id = envelope.id;
    emitter.emit(envelope).await?;
    Ok(id)
}

/// The channel pair a listener hands back: deliveries and delivery errors.
///
/// Both channels close when the listener's forwarding task stops.
pub struct Subscription {
    pub events: mpsc::Receiver<EventEnvelope>,
    pub errors: mpsc::Receiver<EventBusError>,
}

/// Delivers envelopes of the requested kinds at least once.
#[async_trait]
pub trait EventListener: Send + Sync {
    /// Start delivering envelopes whose kind is in `kinds`.
    async fn listen(&self, kinds: &[&str]) -> Result<Subscription, EventBusError>;

    /// Confirm an envelope was handled so it is not delivered again.
    async fn ack(&self, id: EntityId) -> Result<(), EventBusError>;
}
