pub mod keys;
mod macros;
pub mod memory;
pub mod redis;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::AppResult;

pub use keys::{CacheKey, OptionToken};
pub use memory::MemoryBackend;
pub use redis::{create_redis_client, RedisBackend};

/// Storage operations the cache layer needs from a backend.
///
/// The production backend is Redis; an in-process fallback keeps the service
/// functional when no Redis URL is configured. Backends report failures as
/// errors and leave the miss/no-op downgrade to the [`Cache`] wrapper.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Fetches the raw entry stored under `key`.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Stores `value` under `key` for `ttl` seconds.
    async fn set(&self, key: &str, value: String, ttl: u64) -> AppResult<()>;

    /// Removes `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Adds `member` to the set stored under `set_key` and refreshes the
    /// set's TTL to `ttl` seconds.
    async fn index_add(&self, set_key: &str, member: &str, ttl: u64) -> AppResult<()>;

    /// Lists the members of the set stored under `set_key`.
    async fn index_members(&self, set_key: &str) -> AppResult<Vec<String>>;
}

/// Message sent to the cache writer task.
struct CacheWriteMessage {
    key: String,
    value: String,
    ttl: u64,
    /// Index set (and its TTL) that should record the key, when the
    /// namespace keeps one.
    index: Option<(String, u64)>,
}

/// Handle for gracefully shutting down the cache writer task.
///
/// Dropping the handle leaves the task running; only [`shutdown`] drains
/// the queue and stops it.
///
/// [`shutdown`]: CacheWriterHandle::shutdown
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CacheWriterHandle {
    /// Signals the writer task to drain its queue and stop.
    pub async fn shutdown(self) {
        if self.shutdown_tx.send(()).await.is_err() {
            tracing::warn!("Cache writer task already stopped");
        }
    }
}

/// Cache façade used by the services.
///
/// Reads are awaited inline; writes are fire-and-forget through an unbounded
/// channel to a dedicated writer task, so a slow backend never sits on the
/// request path. Every backend failure is logged and downgraded: reads
/// become misses, writes and invalidations become no-ops.
#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
    write_tx: mpsc::UnboundedSender<CacheWriteMessage>,
}

impl Cache {
    /// Creates the cache façade and spawns its writer task.
    pub async fn new(backend: Arc<dyn CacheBackend>) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        tokio::spawn(Self::cache_writer_task(backend.clone(), write_rx, shutdown_rx));

        (Self { backend, write_tx }, CacheWriterHandle { shutdown_tx })
    }

    /// Background task that applies queued cache writes in order.
    async fn cache_writer_task(
        backend: Arc<dyn CacheBackend>,
        mut write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::debug!("Cache writer task started");

        loop {
            tokio::select! {
                message = write_rx.recv() => match message {
                    Some(message) => Self::write_entry(&backend, message).await,
                    // Every cache handle is gone; nothing can be queued anymore.
                    None => {
                        tracing::debug!("Cache writer task stopped");
                        break;
                    }
                },
                // `None` here only means the shutdown handle was dropped;
                // keep serving writes until an explicit signal arrives.
                Some(()) = shutdown_rx.recv() => {
                    // Drain whatever is still queued before stopping.
                    let mut flushed = 0usize;
                    while let Ok(message) = write_rx.try_recv() {
                        Self::write_entry(&backend, message).await;
                        flushed += 1;
                    }
                    tracing::info!(flushed, "Cache writer task stopped");
                    break;
                }
            }
        }
    }

    async fn write_entry(backend: &Arc<dyn CacheBackend>, message: CacheWriteMessage) {
        let CacheWriteMessage {
            key,
            value,
            ttl,
            index,
        } = message;

        // Register the key in its index before storing the entry, so
        // invalidation can never miss a key that made it into the cache.
        if let Some((index_key, index_ttl)) = index {
            if let Err(e) = backend.index_add(&index_key, &key, index_ttl).await {
                tracing::warn!(key = %key, error = %e, "Cache index update failed");
            }
        }

        match backend.set(&key, value, ttl).await {
            Ok(()) => tracing::debug!(key = %key, ttl, "Cache entry written"),
            Err(e) => tracing::warn!(key = %key, error = %e, "Background cache write failed"),
        }
    }

    /// Fetches and deserializes a cached value.
    ///
    /// Backend failures and undecodable entries are logged and reported as
    /// misses; the caller falls through to the store either way.
    pub async fn get_from_cache<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let raw = match self.backend.get(&key.to_string()).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache entry failed to decode, treating as miss");
                None
            }
        }
    }

    /// Queues a cache write without blocking the caller.
    ///
    /// The TTL comes from the key's namespace. Serialization failures and a
    /// stopped writer task are logged and dropped.
    pub fn set_in_background<T: Serialize>(&self, key: &CacheKey, value: &T) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to serialize value for caching");
                return;
            }
        };

        let message = CacheWriteMessage {
            key: key.to_string(),
            value: payload,
            ttl: key.ttl(),
            index: key
                .index_key()
                .map(|index| (index.to_string(), index.ttl())),
        };

        if self.write_tx.send(message).is_err() {
            tracing::warn!(key = %key, "Cache writer task unavailable, dropping write");
        }
    }

    /// Drops every cached recommendation entry for a user.
    ///
    /// Walks the per-user key index to reach all option-specific variants,
    /// then removes the umbrella key and the index itself. Best-effort: each
    /// failure is logged and the remaining deletes still run.
    pub async fn invalidate_recommendations(&self, user_id: Uuid) {
        let index_key = CacheKey::RecommendationIndex(user_id).to_string();

        match self.backend.index_members(&index_key).await {
            Ok(members) => {
                for member in &members {
                    if let Err(e) = self.backend.delete(member).await {
                        tracing::warn!(key = %member, error = %e, "Cache invalidation failed for entry");
                    }
                }
                if !members.is_empty() {
                    tracing::debug!(
                        user_id = %user_id,
                        entries = members.len(),
                        "Invalidated cached recommendations"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Could not read recommendation key index");
            }
        }

        let umbrella = CacheKey::UserRecommendations(user_id).to_string();
        for key in [umbrella, index_key] {
            if let Err(e) = self.backend.delete(&key).await {
                tracing::warn!(key = %key, error = %e, "Cache invalidation failed");
            }
        }
    }
}
