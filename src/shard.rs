//! A single bounded, store-backed shard of the weighted queue.
//!
//! Each shard owns one list in the shared store plus a size-broadcast
//! channel. After every successful store operation the shard publishes the
//! length it observed; a background listener folds broadcasts from *all*
//! processes sharing the shard into a local cached size. The cache is
//! advisory: it biases the weighted draw away from empty shards but is
//! never load-bearing for correctness.

use crate::error::{Error, Result};
use crate::events::QueueEvent;
use crate::store::Store;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Sentinel for a cache that has never received a size observation.
const UNSYNCED: i64 = -1;

/// Process-local, eventually-consistent view of one shard's length.
///
/// Distinct from the authoritative store-backed length on purpose: values
/// read from here may be stale by any number of operations performed by
/// other processes, and are `None` until the first successful sync.
#[derive(Debug)]
pub(crate) struct SizeCache {
    size: AtomicI64,
}

impl SizeCache {
    pub(crate) fn new() -> Self {
        Self {
            size: AtomicI64::new(UNSYNCED),
        }
    }

    /// Current cached size, or `None` before the first sync.
    pub(crate) fn get(&self) -> Option<u64> {
        match self.size.load(Ordering::Acquire) {
            UNSYNCED => None,
            size => Some(size as u64),
        }
    }

    /// Store a new observation, returning the previous one.
    pub(crate) fn replace(&self, size: u64) -> Option<u64> {
        match self.size.swap(size as i64, Ordering::AcqRel) {
            UNSYNCED => None,
            previous => Some(previous as u64),
        }
    }
}

/// Sum of all cached sizes; unsynced shards count as zero.
pub(crate) fn aggregate(caches: &[SizeCache]) -> u64 {
    caches.iter().map(|c| c.get().unwrap_or(0)).sum()
}

/// Identity and capacity of one shard, derived from the queue config.
#[derive(Debug, Clone)]
pub(crate) struct ShardSettings {
    /// Index of this shard in the queue's shard list.
    pub index: usize,
    /// Store key of the backing list.
    pub list_key: String,
    /// Pub/sub channel carrying size broadcasts.
    pub size_channel: String,
    /// Maximum number of items the list may hold.
    pub max_len: u64,
}

/// One bounded queue shard.
///
/// `put` and `get` each execute as a single atomic sequence against the
/// store; the shard itself holds no locks across operations. Overflow is
/// resolved by silently dropping the oldest unconsumed items, never by
/// rejecting a write.
pub struct ShardQueue {
    settings: ShardSettings,
    store: Arc<dyn Store>,
    caches: Arc<Vec<SizeCache>>,
    events: broadcast::Sender<QueueEvent>,
    listener: JoinHandle<()>,
}

impl ShardQueue {
    /// Create the shard: subscribe to its size channel, start the
    /// broadcast listener, then prime the cache with one authoritative
    /// size query.
    pub(crate) async fn new(
        settings: ShardSettings,
        store: Arc<dyn Store>,
        caches: Arc<Vec<SizeCache>>,
        events: broadcast::Sender<QueueEvent>,
    ) -> Result<Self> {
        let subscription = store.subscribe(&settings.size_channel).await?;
        let listener = Self::spawn_listener(
            settings.index,
            subscription,
            caches.clone(),
            events.clone(),
        );

        let shard = Self {
            settings,
            store,
            caches,
            events,
            listener,
        };
        shard.fetch_size().await?;
        Ok(shard)
    }

    /// Background task folding size broadcasts into the local cache.
    ///
    /// Every received value that differs from the cached one updates the
    /// cache and re-emits the aggregate size. Broadcasts include this
    /// process's own announcements looped back through the store, so the
    /// cache converges the same way regardless of who performed the
    /// operation.
    fn spawn_listener(
        index: usize,
        mut subscription: tokio::sync::mpsc::Receiver<u64>,
        caches: Arc<Vec<SizeCache>>,
        events: broadcast::Sender<QueueEvent>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(size) = subscription.recv().await {
                let previous = caches[index].replace(size);
                if previous != Some(size) {
                    debug!(shard = index, size, "cached shard size updated");
                    let _ = events.send(QueueEvent::SizeChange {
                        size: aggregate(&caches),
                    });
                }
            }
            debug!(shard = index, "size listener stopped");
        })
    }

    /// Index of this shard.
    pub fn index(&self) -> usize {
        self.settings.index
    }

    /// Store key of the backing list.
    pub fn list_key(&self) -> &str {
        &self.settings.list_key
    }

    /// Serialize `item` and append it as the newest element, trimming the
    /// list to capacity (oldest first) in the same atomic sequence.
    ///
    /// Returns the serialized payload as stored. Serialization failure
    /// leaves the store untouched.
    pub async fn put<T: Serialize + ?Sized>(&self, item: &T) -> Result<Vec<u8>> {
        let payload = serde_json::to_vec(item).map_err(Error::Serialization)?;
        let size = self
            .store
            .push_and_trim(&self.settings.list_key, &payload, self.settings.max_len)
            .await?;
        self.announce(size).await;
        Ok(payload)
    }

    /// Remove and return the oldest element, or `None` if the shard is
    /// empty.
    pub async fn get<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        let (payload, size) = self.store.pop_oldest(&self.settings.list_key).await?;
        let item = match payload {
            Some(bytes) => Some(serde_json::from_slice(&bytes).map_err(Error::Deserialization)?),
            None => None,
        };
        self.announce(size).await;
        Ok(item)
    }

    /// Query the store for the authoritative length, bypassing the cache.
    pub async fn fetch_size(&self) -> Result<u64> {
        let size = self.store.len(&self.settings.list_key).await?;
        self.announce(size).await;
        Ok(size)
    }

    /// Cached size with no I/O; `None` before the first successful sync.
    pub fn last_size(&self) -> Option<u64> {
        self.caches[self.settings.index].get()
    }

    /// Size synchronization step: broadcast the observed length on this
    /// shard's channel and emit the local per-shard event.
    ///
    /// A failed broadcast never rolls back the operation that produced the
    /// observation; the store mutation is already final and the caches
    /// re-converge on the next successful sync.
    async fn announce(&self, size: u64) {
        if let Err(e) = self
            .store
            .publish(&self.settings.size_channel, size)
            .await
        {
            warn!(
                shard = self.settings.index,
                size,
                error = %e,
                "size broadcast failed, caches will catch up on next sync"
            );
        }
        let _ = self.events.send(QueueEvent::ShardSize {
            shard: self.settings.index,
            size,
        });
    }
}

impl Drop for ShardQueue {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
