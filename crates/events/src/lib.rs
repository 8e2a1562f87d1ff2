//! Sheetflow event bus: the wire contract with the geometry engine and the
//! transports that carry it.
//!
//! - [`contracts`] -- the four payloads and their kind names.
//! - [`EventEnvelope`] / [`InboundEvent`] -- kind-tagged envelope and the
//!   closed set of kinds the completion consumer decodes.
//! - [`EventEmitter`] / [`EventListener`] -- producer and consumer seams.
//! - [`EventBus`] -- in-process transport backed by `tokio::sync::broadcast`.
//! - [`PgEventBus`] -- durable at-least-once transport over Postgres.

pub mod bus;
pub mod contracts;
pub mod envelope;
pub mod error;
pub mod pg_bus;
pub mod transport;

pub use bus::EventBus;
pub use envelope::{EventEnvelope, InboundEvent};
pub use error::EventBusError;
pub use pg_bus::{BusConfig, PgEventBus};
pub use transport::{emit_event, EventEmitter, EventListener, Subscription};
