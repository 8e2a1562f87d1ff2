//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] implements both [`EventEmitter`] and [`EventListener`] so a
//! single process can dispatch work and consume completions without an
//! external broker. Share it via `Arc<EventBus>`. Delivery is fire-and-forget
//! and acknowledgements are no-ops.

use async_trait::async_trait;
use sheetflow_core::types::EntityId;
use tokio::sync::{broadcast, mpsc};

use crate::envelope::EventEnvelope;
use crate::error::EventBusError;
use crate::transport::{EventEmitter, EventListener, Subscription};

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// Buffer of the per-listener forwarding channels.
const SUBSCRIPTION_BUFFER: usize = 64;

pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest unconsumed envelopes are dropped and
    /// slow listeners receive [`EventBusError::Lagged`].
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an envelope to all current subscribers.
    ///
    /// With no subscriber the envelope is dropped.
    pub fn publish(&self, envelope: EventEnvelope) {
        // A send error only means there are zero receivers.
        let _ = self.sender.send(envelope);
    }

    /// Raw subscription to every envelope published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl EventEmitter for EventBus {
    async fn emit(&self, envelope: EventEnvelope) -> Result<(), EventBusError> {
        tracing::debug!(kind = %envelope.kind, event_id = %envelope.id, "Publishing event");
        self.publish(envelope);
        Ok(())
    }
}

#[async_trait]
impl EventListener for EventBus {
    async fn listen(&self, kinds: &[&str]) -> Result<Subscription, EventBusError> {
        let kinds: Vec<String> = kinds.iter().map(|k| k.to_string()).collect();
        let mut receiver = self.sender.subscribe();
        let (events_tx, events) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let (errors_tx, errors) = mpsc::channel(SUBSCRIPTION_BUFFER);

        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(envelope) => {
                        if !kinds.is_empty() && !kinds.contains(&envelope.kind) {
                            continue;
                        }
                        if events_tx.send(envelope).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if errors_tx.send(EventBusError::Lagged(n)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            tracing::debug!("In-process listener stopped");
        });

        Ok(Subscription { events, errors })
    }

    async fn ack(&self, _id: EntityId) -> Result<(), EventBusError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sheetflow_core::types::new_id;

    fn envelope(kind: &str) -> EventEnvelope {
        EventEnvelope {
            id: new_id(),
            kind: kind.to_string(),
            payload: serde_json::json!({"key": "value"}),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn emitted_envelope_reaches_raw_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.emit(envelope("FeatureRecognitionStarted")).await.unwrap();

        let received = rx.recv().await.expect("should receive the envelope");
        assert_eq!(received.kind, "FeatureRecognitionStarted");
        assert_eq!(received.payload["key"], "value");
    }

    #[tokio::test]
    async fn listener_only_forwards_requested_kinds() {
        let bus = EventBus::default();
        let mut sub = bus.listen(&["ProcessPlanningComplete"]).await.unwrap();

        bus.publish(envelope("FeatureRecognitionStarted"));
        bus.publish(envelope("ProcessPlanningComplete"));

        let received = sub.events.recv().await.expect("should forward the match");
        assert_eq!(received.kind, "ProcessPlanningComplete");
        assert!(sub.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn slow_listener_reports_lag_on_error_channel() {
        let bus = EventBus::new(2);
        let mut sub = bus.listen(&[]).await.unwrap();

        // Fill past the broadcast capacity before the forwarder can drain it.
        for _ in 0..8 {
            bus.publish(envelope("ProcessPlanningComplete"));
        }

        let err = sub.errors.recv().await.expect("lag should be reported");
        assert!(matches!(err, EventBusError::Lagged(_)));
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(envelope("orphan"));
    }
}
