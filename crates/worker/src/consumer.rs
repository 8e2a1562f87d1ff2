//! The completion consumer loop.
//!
//! Subscribes to the two completion kinds and hands each delivery to the
//! [`CompletionHandler`], one at a time. A delivery is acknowledged once it
//! was applied, recognised as a replay, or found to be undecodable. A handler
//! error stops the loop with the delivery left unacknowledged so the bus
//! hands it out again after a restart.

use std::sync::Arc;

use sheetflow_core::types::EntityId;
use sheetflow_events::contracts::COMPLETION_KINDS;
use sheetflow_events::{EventEnvelope, EventListener, InboundEvent, Subscription};
use sheetflow_pipeline::{CompletionError, CompletionHandler, CompletionOutcome};
use tokio_util::sync::CancellationToken;

pub struct CompletionConsumer {
    listener: Arc<dyn EventListener>,
    handler: CompletionHandler,
}

impl CompletionConsumer {
    pub fn new(listener: Arc<dyn EventListener>, handler: CompletionHandler) -> Self {
        Self { listener, handler }
    }

    /// Consume until `cancel` fires or the bus closes.
    ///
    /// Returns the first halting [`CompletionError`]. Bus errors are logged
    /// and do not stop the loop.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), CompletionError> {
        let Subscription {
            mut events,
            mut errors,
        } = self.listener.listen(&COMPLETION_KINDS).await?;
        let mut errors_open = true;

        tracing::info!(kinds = ?COMPLETION_KINDS, "Completion consumer started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("Completion consumer stopping");
                    return Ok(());
                }
                error = errors.recv(), if errors_open => match error {
                    Some(e) => tracing::error!(error = %e, "Event bus error"),
                    None => errors_open = false,
                },
                delivery = events.recv() => match delivery {
                    Some(envelope) => self.process(envelope).await?,
                    None => {
                        tracing::info!("Event stream closed, completion consumer stopping");
                        return Ok(());
                    }
                },
            }
        }
    }

    async fn process(&self, envelope: EventEnvelope) -> Result<(), CompletionError> {
        let event = match InboundEvent::decode(&envelope) {
            Ok(event) => event,
            Err(e) => {
                tracing::error!(
                    envelope_id = %envelope.id,
                    kind = %envelope.kind,
                    error = %e,
                    "Undecodable completion payload, dropping",
                );
                self.ack(envelope.id).await;
                return Ok(());
            }
        };

        match self.handler.handle(event).await {
            Ok(outcome) => {
                if let CompletionOutcome::Applied(task) = &outcome {
                    tracing::debug!(
                        envelope_id = %envelope.id,
                        task_id = %task.id,
                        "Completion applied",
                    );
                }
                self.ack(envelope.id).await;
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    envelope_id = %envelope.id,
                    kind = %envelope.kind,
                    error = %e,
                    "Completion handling failed, halting consumer",
                );
                Err(e)
            }
        }
    }

    async fn ack(&self, id: EntityId) {
        if let Err(e) = self.listener.ack(id).await {
            tracing::error!(envelope_id = %id, error = %e, "Failed to acknowledge delivery");
        }
    }
}
