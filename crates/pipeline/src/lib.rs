//! The sheetflow job orchestration pipeline.
//!
//! - [`upload`] -- pairs uploaded geometry into CAD file records.
//! - [`dispatch`] -- starts the next external job for a CAD file or project.
//! - [`completion`] -- folds the engine's completion events into storage.
//! - [`cache`] -- read cache and the background invalidator.
//! - [`ServiceContext`] -- the collaborators all of the above share.

pub mod cache;
pub mod completion;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod projects;
pub mod storage;
pub mod upload;

pub use cache::{Cache, CacheError, CacheInvalidator, MemoryCache};
pub use completion::{CompletionHandler, CompletionOutcome};
pub use config::PipelineConfig;
pub use context::ServiceContext;
pub use error::{CompletionError, PipelineError};
pub use storage::{FileStorage, LocalFileStorage};
