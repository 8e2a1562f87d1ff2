//! Domain vocabulary shared by every sheetflow crate.
//!
//! Nothing in here performs I/O: the types, constants and validation rules
//! are consumed by the store, the event contracts, the pipeline and the HTTP
//! surface alike.

pub mod cache_keys;
pub mod codec;
pub mod env;
pub mod error;
pub mod processing;
pub mod types;
pub mod upload;
