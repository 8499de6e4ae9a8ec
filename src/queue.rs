//! The weighted queue facade.
//!
//! Owns one [`ShardQueue`] per configured weight plus the slot table, and
//! implements the weighted random `get`, explicit-shard `put`, and the
//! aggregate size view.

use crate::config::QueueConfig;
use crate::error::{Error, Result};
use crate::events::{QueueEvent, EVENT_CHANNEL_CAPACITY};
use crate::shard::{aggregate, ShardQueue, ShardSettings, SizeCache};
use crate::slots::SlotTable;
use crate::store::{RedisStore, Store};
use crate::weights::NormalizedWeights;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Bound on consecutive redraws when drawn shards look empty in the cache.
///
/// The redraw is a routing heuristic over possibly-stale caches, not fault
/// tolerance. When many shards simultaneously show stale non-empty caches
/// an unbounded redraw could livelock, so past this budget `get` falls
/// through to an authoritative size query of every shard.
const MAX_REDRAWS: usize = 8;

/// A logical weighted queue over several capacity-bounded shards in a
/// shared store.
///
/// Many processes may run the same configuration concurrently against the
/// same shard set with no central coordinator. Consumers draw from shards
/// with probability proportional to the configured weights; producers
/// target a shard explicitly. Item atomicity is delegated to the store:
/// two concurrent consumers never retrieve the same item, but there is no
/// global ordering across shards and no delivery guarantee beyond what the
/// store provides.
pub struct WeightedQueue {
    config: QueueConfig,
    weights: NormalizedWeights,
    slots: SlotTable,
    shards: Vec<ShardQueue>,
    caches: Arc<Vec<SizeCache>>,
    events: broadcast::Sender<QueueEvent>,
}

impl WeightedQueue {
    /// Connect to the Redis instance named in the config and build the
    /// queue over it.
    pub async fn connect(config: QueueConfig) -> Result<Self> {
        let store = RedisStore::connect(&config.redis.url).await?;
        Self::with_store(config, Arc::new(store)).await
    }

    /// Build the queue over an explicit store implementation.
    ///
    /// This normalizes the weights, builds the slot table, creates one
    /// shard per weight with deterministic keys and channels, and starts
    /// each shard's size-broadcast listener.
    pub async fn with_store(config: QueueConfig, store: Arc<dyn Store>) -> Result<Self> {
        config.validate()?;
        let weights = NormalizedWeights::normalize(&config.weights)?;
        let slots = SlotTable::build(&weights)?;

        let caches: Arc<Vec<SizeCache>> =
            Arc::new((0..weights.len()).map(|_| SizeCache::new()).collect());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let mut shards = Vec::with_capacity(weights.len());
        for index in 0..weights.len() {
            let settings = ShardSettings {
                index,
                list_key: config.list_key(index),
                size_channel: config.size_channel(index),
                max_len: config.max_shard_size(),
            };
            shards.push(
                ShardQueue::new(settings, store.clone(), caches.clone(), events.clone()).await?,
            );
        }

        info!(
            shards = shards.len(),
            total_weight = weights.total(),
            max_shard_size = config.max_shard_size(),
            base_key = %config.base_key,
            "weighted queue ready"
        );

        Ok(Self {
            config,
            weights,
            slots,
            shards,
            caches,
            events,
        })
    }

    /// Put an item into an explicitly chosen shard, bypassing weighting.
    ///
    /// The item always lands in the targeted shard, even one whose weight
    /// normalized to zero. Returns the serialized payload as stored.
    pub async fn put<T: Serialize + ?Sized>(&self, shard: usize, item: &T) -> Result<Vec<u8>> {
        let queue = self.shard(shard).ok_or(Error::ShardOutOfRange {
            shard,
            shards: self.shards.len(),
        })?;
        queue.put(item).await
    }

    /// Remove and return an item from a shard drawn with probability
    /// proportional to its weight, or `None` when the queue is empty.
    ///
    /// Shards whose cached size is zero are skipped by redrawing while the
    /// aggregate cache is nonzero; a shard drained by another consumer
    /// between the cache check and the fetch has its size refreshed before
    /// redrawing. Storage and deserialization errors propagate immediately
    /// with no retry.
    pub async fn get<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        for _ in 0..MAX_REDRAWS {
            let shard = &self.shards[self.slots.resolve(self.draw_slot())];

            if shard.last_size() == Some(0) {
                if self.size() == 0 {
                    // Queue empirically empty; a best-effort answer from
                    // possibly-stale caches, same as the aggregate view.
                    return Ok(None);
                }
                continue;
            }

            match shard.get::<T>().await? {
                Some(item) => return Ok(Some(item)),
                None => {
                    if self.size() == 0 {
                        return Ok(None);
                    }
                    // Raced with another consumer; resync this shard's
                    // size before drawing again.
                    shard.fetch_size().await?;
                }
            }
        }

        debug!("redraw budget exhausted, falling back to authoritative sizes");
        self.get_authoritative().await
    }

    /// Fallback when cached sizes keep pointing at empty shards: query
    /// every shard's authoritative size and fetch from the fullest one.
    async fn get_authoritative<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        let mut fullest: Option<(usize, u64)> = None;
        for (index, shard) in self.shards.iter().enumerate() {
            let size = shard.fetch_size().await?;
            if size > 0 && fullest.map_or(true, |(_, s)| size > s) {
                fullest = Some((index, size));
            }
        }
        match fullest {
            Some((index, _)) => self.shards[index].get().await,
            None => Ok(None),
        }
    }

    /// Aggregate size across all shards from the local caches, with no
    /// I/O. Approximate across the distributed set of producers and
    /// consumers; shards that never synced count as zero.
    pub fn size(&self) -> u64 {
        aggregate(&self.caches)
    }

    /// Subscribe to process-local queue events.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    /// Access one shard directly, e.g. to drain a zero-weight shard.
    pub fn shard(&self, shard: usize) -> Option<&ShardQueue> {
        self.shards.get(shard)
    }

    /// Number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Sum of the normalized weights; the number of slots in the table.
    pub fn total_weight(&self) -> u32 {
        self.weights.total()
    }

    /// The normalized per-shard weights.
    pub fn normalized_weights(&self) -> &[u32] {
        self.weights.as_slice()
    }

    /// The configuration this queue was built from.
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    fn draw_slot(&self) -> usize {
        rand::thread_rng().gen_range(0..self.slots.len())
    }
}
