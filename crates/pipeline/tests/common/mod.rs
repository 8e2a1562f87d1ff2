//! Shared harness for pipeline integration tests.
//!
//! Wires a [`ServiceContext`] over the in-memory store, the in-process event
//! bus, a memory cache and a temporary upload directory.

#![allow(dead_code)]

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use sheetflow_core::types::{new_id, EntityId};
use sheetflow_db::models::cad_file::CadFile;
use sheetflow_db::models::project::Project;
use sheetflow_db::{EntityStore, MemoryStore};
use sheetflow_events::{EventBus, EventBusError, EventEmitter, EventEnvelope};
use sheetflow_pipeline::upload::UploadPart;
use sheetflow_pipeline::{
    FileStorage, LocalFileStorage, MemoryCache, PipelineConfig, ServiceContext,
};
use tempfile::TempDir;
use tokio::sync::broadcast;

pub struct Harness {
    pub ctx: ServiceContext,
    pub store: Arc<MemoryStore>,
    pub bus: Arc<EventBus>,
    pub cache: Arc<MemoryCache>,
    pub storage: Arc<LocalFileStorage>,
    pub upload_dir: TempDir,
}

/// Forwards to the bus until its budget of emits is spent, then reports the
/// bus as closed.
pub struct RationedEmitter {
    bus: Arc<EventBus>,
    remaining: AtomicUsize,
}

#[async_trait]
impl EventEmitter for RationedEmitter {
    async fn emit(&self, envelope: EventEnvelope) -> Result<(), EventBusError> {
        let granted = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !granted {
            return Err(EventBusError::Closed);
        }
        self.bus.emit(envelope).await
    }
}

/// Local storage that accepts a fixed number of writes, then fails every
/// further write as if the disk were full.
pub struct RationedStorage {
    inner: Arc<LocalFileStorage>,
    remaining: AtomicUsize,
}

#[async_trait]
impl FileStorage for RationedStorage {
    async fn write_new(&self, relative: &Path, bytes: &[u8]) -> io::Result<String> {
        let granted = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !granted {
            return Err(io::Error::other("disk full"));
        }
        self.inner.write_new(relative, bytes).await
    }

    async fn read(&self, location: &str) -> io::Result<Vec<u8>> {
        self.inner.read(location).await
    }

    async fn remove(&self, location: &str) -> io::Result<()> {
        self.inner.remove(location).await
    }

    async fn remove_dir(&self, relative: &Path) -> io::Result<()> {
        self.inner.remove_dir(relative).await
    }
}

impl Harness {
    pub fn new() -> Self {
        Self::build(None, None)
    }

    /// A harness whose pipeline may emit `allowed` events; later emits fail.
    pub fn with_emit_budget(allowed: usize) -> Self {
        Self::build(Some(allowed), None)
    }

    /// A harness whose pipeline may write `allowed` files; later writes fail.
    pub fn with_write_budget(allowed: usize) -> Self {
        Self::build(None, Some(allowed))
    }

    fn build(emit_budget: Option<usize>, write_budget: Option<usize>) -> Self {
        let upload_dir = tempfile::tempdir().expect("temp dir");
        let store = Arc::new(MemoryStore::new());
        let bus = Arc::new(EventBus::default());
        let cache = Arc::new(MemoryCache::new());
        let storage = Arc::new(LocalFileStorage::new(upload_dir.path()));
        let config = PipelineConfig {
            upload_dir: upload_dir.path().to_path_buf(),
            ..PipelineConfig::default()
        };

        let emitter: Arc<dyn EventEmitter> = match emit_budget {
            Some(allowed) => Arc::new(RationedEmitter {
                bus: bus.clone(),
                remaining: AtomicUsize::new(allowed),
            }),
            None => bus.clone(),
        };

        let file_storage: Arc<dyn FileStorage> = match write_budget {
            Some(allowed) => Arc::new(RationedStorage {
                inner: storage.clone(),
                remaining: AtomicUsize::new(allowed),
            }),
            None => storage.clone(),
        };

        let (ctx, _worker) = ServiceContext::new(
            store.clone(),
            emitter,
            file_storage,
            cache.clone(),
            config,
        );

        Self {
            ctx,
            store,
            bus,
            cache,
            storage,
            upload_dir,
        }
    }

    /// Raw subscription to everything the pipeline emits from now on.
    pub fn outbound(&self) -> broadcast::Receiver<EventEnvelope> {
        self.bus.subscribe()
    }

    pub async fn project(&self, owner_id: EntityId) -> Project {
        let project = Project {
            id: new_id(),
            owner_id,
            title: format!("Project {}", new_id()),
            description: "Test project".into(),
            created_at: chrono::Utc::now(),
        };
        self.store.create_project(&project).await.unwrap()
    }

    /// A fully paired CAD file at `level`.
    pub async fn cad_file(&self, project_id: EntityId, name: &str, level: i32) -> CadFile {
        let mut cad = CadFile::new(new_id(), project_id, name.into(), "steel".into());
        cad.step_url = Some(format!("/stored/{name}"));
        cad.obj_url = Some(format!("/stored/{name}.obj"));
        cad.feature_props.process_level = level;
        self.store.create_cad_file(&cad).await.unwrap()
    }

    pub async fn storage_read(&self, location: &str) -> Vec<u8> {
        self.storage.read(location).await.expect("stored file")
    }

    /// Number of regular files below the upload directory.
    pub fn stored_file_count(&self) -> usize {
        fn walk(dir: &std::path::Path) -> usize {
            std::fs::read_dir(dir)
                .map(|entries| {
                    entries
                        .flatten()
                        .map(|entry| {
                            let path = entry.path();
                            if path.is_dir() {
                                walk(&path)
                            } else {
                                1
                            }
                        })
                        .sum()
                })
                .unwrap_or(0)
        }
        walk(self.upload_dir.path())
    }
}

pub fn part(file_name: &str, bytes: &'static [u8]) -> UploadPart {
    UploadPart {
        file_name: file_name.to_string(),
        bytes: Bytes::from_static(bytes),
    }
}

/// Drain whatever is buffered on a raw bus subscription.
pub fn drain(rx: &mut broadcast::Receiver<EventEnvelope>) -> Vec<EventEnvelope> {
    let mut out = Vec::new();
    while let Ok(envelope) = rx.try_recv() {
        out.push(envelope);
    }
    out
}

/// Poll until `key` is gone from the cache.
pub async fn wait_for_eviction(cache: &MemoryCache, key: &str) {
    for _ in 0..200 {
        if !cache.contains(key).await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("cache key '{key}' was never evicted");
}
