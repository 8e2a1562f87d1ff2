//! Sheetflow completion worker.
//!
//! Hosts the [`CompletionConsumer`] loop that feeds engine completion events
//! into the pipeline's completion handler. The `sheetflow-worker` binary runs
//! it standalone against the Postgres bus; the API server can embed it too.

pub mod consumer;

pub use consumer::CompletionConsumer;
