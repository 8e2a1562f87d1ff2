//! Read cache and its background invalidator.
//!
//! The cache is best-effort: readers fall back to the store on a miss and
//! writers never wait for an eviction. [`CacheInvalidator`] funnels keys
//! through a capacity-1 channel into a single worker task that deletes them.
//!
//! Every `invalidate` call bumps a generation counter before the eviction is
//! queued. A reader that fills the cache from the store compares the
//! generation from before its load with the current one and skips the fill
//! when they differ, so it never caches a list older than a queued eviction.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

#[derive(Debug, thiserror::Error)]
#[error("Cache error: {0}")]
pub struct CacheError(pub String);

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError>;
    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Process-local cache.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, serde_json::Value>>,
    fail_deletes: AtomicBool,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `delete` fail.
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), CacheError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(CacheError(format!("delete of '{key}' refused")));
        }
        self.entries.write().await.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Invalidator
// ---------------------------------------------------------------------------

/// Producer handle of the single eviction worker. Cheap to clone.
#[derive(Clone)]
pub struct CacheInvalidator {
    sender: mpsc::Sender<String>,
    generation: Arc<AtomicU64>,
}

impl CacheInvalidator {
    /// Start the eviction worker.
    ///
    /// The worker runs until every handle is dropped. The first failed
    /// eviction stops it, and the join handle yields that error.
    pub fn spawn(cache: Arc<dyn Cache>) -> (Self, JoinHandle<Result<(), CacheError>>) {
        let (sender, mut receiver) = mpsc::channel::<String>(1);

        let worker = tokio::spawn(async move {
            while let Some(key) = receiver.recv().await {
                if let Err(e) = cache.delete(&key).await {
                    tracing::error!(key = %key, error = %e, "Cache eviction failed, invalidator stopping");
                    return Err(e);
                }
                tracing::debug!(key = %key, "Cache key evicted");
            }
            Ok(())
        });

        let invalidator = Self {
            sender,
            generation: Arc::new(AtomicU64::new(0)),
        };
        (invalidator, worker)
    }

    /// Number of invalidations requested so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Queue `key` for eviction from a detached task; never blocks the caller.
    pub fn invalidate(&self, key: impl Into<String>) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let sender = self.sender.clone();
        let key = key.into();
        tokio::spawn(async move {
            if sender.send(key).await.is_err() {
                tracing::warn!("Cache invalidator is not running, eviction dropped");
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Read-through
// ---------------------------------------------------------------------------

/// Serve `key` from the cache, or run `load` and cache its result.
///
/// Cache failures and unreadable entries are logged and fall back to `load`.
/// A result loaded while an invalidation was requested is returned but not
/// cached.
pub async fn read_through<T, E, F>(
    cache: &dyn Cache,
    invalidator: &CacheInvalidator,
    key: &str,
    load: F,
) -> Result<T, E>
where
    T: Serialize + DeserializeOwned,
    F: Future<Output = Result<T, E>>,
{
    match cache.get(key).await {
        Ok(Some(cached)) => match serde_json::from_value(cached) {
            Ok(value) => return Ok(value),
            Err(e) => tracing::warn!(key, error = %e, "Discarding unreadable cache entry"),
        },
        Ok(None) => {}
        Err(e) => tracing::warn!(key, error = %e, "Cache read failed"),
    }

    let generation = invalidator.generation();
    let value = load.await?;
    if invalidator.generation() != generation {
        tracing::debug!(key, "Invalidated while loading, not caching");
        return Ok(value);
    }

    match serde_json::to_value(&value) {
        Ok(json) => {
            if let Err(e) = cache.set(key, json).await {
                tracing::warn!(key, error = %e, "Cache write failed");
            }
        }
        Err(e) => tracing::warn!(key, error = %e, "Failed to serialize value for caching"),
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn wait_until_evicted(cache: &MemoryCache, key: &str) {
        for _ in 0..100 {
            if !cache.contains(key).await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("key '{key}' was never evicted");
    }

    #[tokio::test]
    async fn queued_key_is_evicted() {
        let cache = Arc::new(MemoryCache::new());
        cache.set("tasks", serde_json::json!([1, 2])).await.unwrap();
        let (invalidator, _worker) = CacheInvalidator::spawn(cache.clone());

        invalidator.invalidate("tasks");

        wait_until_evicted(&cache, "tasks").await;
    }

    #[tokio::test]
    async fn generation_moves_on_every_invalidation() {
        let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new());
        let (invalidator, _worker) = CacheInvalidator::spawn(cache);
        let copy = invalidator.clone();
        assert_eq!(invalidator.generation(), 0);

        invalidator.invalidate("tasks");
        copy.invalidate("tasks");

        assert_eq!(invalidator.generation(), 2);
        assert_eq!(copy.generation(), 2);
    }

    #[tokio::test]
    async fn read_through_fills_cache_on_miss() {
        let cache = Arc::new(MemoryCache::new());
        let (invalidator, _worker) = CacheInvalidator::spawn(cache.clone());

        let loaded: Result<Vec<i32>, CacheError> =
            read_through(cache.as_ref(), &invalidator, "tasks", async { Ok(vec![1, 2]) }).await;

        assert_eq!(loaded.unwrap(), vec![1, 2]);
        assert_eq!(
            cache.get("tasks").await.unwrap(),
            Some(serde_json::json!([1, 2]))
        );
    }

    #[tokio::test]
    async fn read_through_prefers_cached_value() {
        let cache = Arc::new(MemoryCache::new());
        cache.set("tasks", serde_json::json!([7])).await.unwrap();
        let (invalidator, _worker) = CacheInvalidator::spawn(cache.clone());

        let loaded: Result<Vec<i32>, CacheError> =
            read_through(cache.as_ref(), &invalidator, "tasks", async { Ok(vec![99]) }).await;

        assert_eq!(loaded.unwrap(), vec![7]);
    }

    #[tokio::test]
    async fn list_loaded_across_an_invalidation_is_not_cached() {
        let cache = Arc::new(MemoryCache::new());
        let (invalidator, _worker) = CacheInvalidator::spawn(cache.clone());

        let loaded: Result<Vec<i32>, CacheError> =
            read_through(cache.as_ref(), &invalidator, "tasks", async {
                invalidator.invalidate("tasks");
                Ok(vec![1])
            })
            .await;

        assert_eq!(loaded.unwrap(), vec![1]);
        assert!(!cache.contains("tasks").await);
    }

    #[tokio::test]
    async fn failed_eviction_stops_worker_with_error() {
        let cache = Arc::new(MemoryCache::new());
        cache.set_fail_deletes(true);
        let (invalidator, worker) = CacheInvalidator::spawn(cache.clone());

        invalidator.invalidate("tasks");

        let result = tokio::time::timeout(Duration::from_secs(1), worker)
            .await
            .expect("worker should stop")
            .expect("worker should not panic");
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn worker_exits_cleanly_when_handles_drop() {
        let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new());
        let (invalidator, worker) = CacheInvalidator::spawn(cache);
        drop(invalidator);

        assert!(worker.await.unwrap().is_ok());
    }
}
