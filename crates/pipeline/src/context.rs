use std::sync::Arc;

use sheetflow_db::EntityStore;
use sheetflow_events::EventEmitter;
use tokio::task::JoinHandle;

use crate::cache::{Cache, CacheError, CacheInvalidator};
use crate::config::PipelineConfig;
use crate::storage::FileStorage;

/// Everything the upload, dispatch and completion paths share.
///
/// Built once at process start and cloned into every component; cloning
/// only bumps reference counts.
#[derive(Clone)]
pub struct ServiceContext {
    pub store: Arc<dyn EntityStore>,
    pub emitter: Arc<dyn EventEmitter>,
    pub storage: Arc<dyn FileStorage>,
    pub cache: Arc<dyn Cache>,
    pub invalidator: CacheInvalidator,
    pub config: Arc<PipelineConfig>,
}

impl ServiceContext {
    /// Wire the collaborators together and start the cache invalidator.
    ///
    /// The returned handle is the invalidator worker; it resolves with the
    /// eviction error that stopped it, if any.
    pub fn new(
        store: Arc<dyn EntityStore>,
        emitter: Arc<dyn EventEmitter>,
        storage: Arc<dyn FileStorage>,
        cache: Arc<dyn Cache>,
        config: PipelineConfig,
    ) -> (Self, JoinHandle<Result<(), CacheError>>) {
        let (invalidator, worker) = CacheInvalidator::spawn(cache.clone());
        let ctx = Self {
            store,
            emitter,
            storage,
            cache,
            invalidator,
            config: Arc::new(config),
        };
        (ctx, worker)
    }

    /// Evict the cached task list in the background.
    pub fn invalidate_task_list(&self) {
        self.invalidator.invalidate(self.config.task_cache_key.as_str());
    }
}
