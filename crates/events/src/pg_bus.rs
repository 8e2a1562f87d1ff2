//! Durable event bus over the `bus_events` table.
//!
//! `emit` inserts a row. `listen` spawns a poller that leases pending rows of
//! the requested kinds and forwards them oldest first. A row leaves the queue
//! only when acknowledged; a lease that expires without an ack makes the row
//! eligible for delivery again, which gives at-least-once semantics across
//! consumer crashes.

use std::time::Duration;

use async_trait::async_trait;
use sheetflow_core::env::var_or;
use sheetflow_core::error::CoreError;
use sheetflow_core::types::EntityId;
use sheetflow_db::repositories::BusEventRepo;
use sheetflow_db::DbPool;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::envelope::EventEnvelope;
use crate::error::EventBusError;
use crate::transport::{EventEmitter, EventListener, Subscription};

/// Polling and leasing parameters of [`PgEventBus`].
#[derive(Debug, Clone)]
pub struct BusConfig {
    pub poll_interval: Duration,
    pub lease: Duration,
    pub batch_size: i64,
}

impl BusConfig {
    /// Load from the environment.
    ///
    /// | Env Var                | Default |
    /// |------------------------|---------|
    /// | `BUS_POLL_INTERVAL_MS` | `500`   |
    /// | `BUS_LEASE_SECS`       | `300`   |
    /// | `BUS_BATCH_SIZE`       | `32`    |
    pub fn from_env() -> Result<Self, CoreError> {
        Ok(Self {
            poll_interval: Duration::from_millis(var_or("BUS_POLL_INTERVAL_MS", 500)?),
            lease: Duration::from_secs(var_or("BUS_LEASE_SECS", 300)?),
            batch_size: var_or("BUS_BATCH_SIZE", 32)?,
        })
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            lease: Duration::from_secs(300),
            batch_size: 32,
        }
    }
}

#[derive(Clone)]
pub struct PgEventBus {
    pool: DbPool,
    config: BusConfig,
}

impl PgEventBus {
    pub fn new(pool: DbPool, config: BusConfig) -> Self {
        Self { pool, config }
    }
}

#[async_trait]
impl EventEmitter for PgEventBus {
    async fn emit(&self, envelope: EventEnvelope) -> Result<(), EventBusError> {
        BusEventRepo::insert(&self.pool, envelope.id, &envelope.kind, &envelope.payload).await?;
        tracing::debug!(kind = %envelope.kind, event_id = %envelope.id, "Event enqueued");
        Ok(())
    }
}

#[async_trait]
impl EventListener for PgEventBus {
    async fn listen(&self, kinds: &[&str]) -> Result<Subscription, EventBusError> {
        let kinds: Vec<String> = kinds.iter().map(|k| k.to_string()).collect();
        let buffer = usize::try_from(self.config.batch_size.max(1)).unwrap_or(1);
        let (events_tx, events) = mpsc::channel(buffer);
        let (errors_tx, errors) = mpsc::channel(16);
        let pool = self.pool.clone();
        let config = self.config.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let lease_secs = config.lease.as_secs_f64();

            'poll: loop {
                tokio::select! {
                    _ = events_tx.closed() => break 'poll,
                    _ = interval.tick() => {}
                }

                let rows =
                    match BusEventRepo::claim_batch(&pool, &kinds, lease_secs, config.batch_size)
                        .await
                    {
                        Ok(rows) => rows,
                        Err(e) => {
                            if errors_tx.send(EventBusError::Database(e)).await.is_err() {
                                break 'poll;
                            }
                            continue;
                        }
                    };

                for row in rows {
                    if row.attempts > 1 {
                        tracing::warn!(
                            event_id = %row.id,
                            kind = %row.kind,
                            attempts = row.attempts,
                            "Redelivering event after expired lease",
                        );
                    }
                    let envelope = EventEnvelope {
                        id: row.id,
                        kind: row.kind,
                        payload: row.payload,
                        timestamp: row.created_at,
                    };
                    if events_tx.send(envelope).await.is_err() {
                        break 'poll;
                    }
                }
            }
            tracing::debug!("Bus poller stopped");
        });

        Ok(Subscription { events, errors })
    }

    async fn ack(&self, id: EntityId) -> Result<(), EventBusError> {
        if !BusEventRepo::ack(&self.pool, id).await? {
            tracing::debug!(event_id = %id, "Event was already acknowledged");
        }
        Ok(())
    }
}
