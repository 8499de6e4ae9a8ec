//! Distributed weighted queueing over Redis-backed bounded lists.
//!
//! This crate turns several independently capacity-bounded queues, held in
//! a shared Redis instance, into one logical weighted queue usable by many
//! concurrent producer/consumer processes with no central coordinator:
//! - **Weighted draws**: consumers pick a shard with probability
//!   proportional to its configured weight via an O(1) slot table
//! - **Explicit routing**: producers always target a shard directly
//! - **Drop-oldest capacity**: a full shard silently discards its oldest
//!   unconsumed items instead of blocking or rejecting writes
//! - **Broadcast size cache**: processes track shard occupancy through
//!   pub/sub size announcements, eventually consistent and advisory only
//!
//! # Example
//!
//! ```rust,no_run
//! use weightq::{QueueConfig, WeightedQueue};
//!
//! #[tokio::main]
//! async fn main() -> weightq::Result<()> {
//!     // Four shards; the first is drawn ten times as often as the last.
//!     let config = QueueConfig::new(vec![10.0, 3.0, 2.0, 1.0])
//!         .with_redis_url("redis://127.0.0.1:6379")
//!         .with_max_size(1_000_000);
//!
//!     let queue = WeightedQueue::connect(config).await?;
//!
//!     // Producers target a shard explicitly.
//!     queue.put(0, &"job-1").await?;
//!
//!     // Consumers draw by weight.
//!     if let Some(job) = queue.get::<String>().await? {
//!         println!("got {job}");
//!     }
//!
//!     // Cache-only aggregate size, no store round-trip.
//!     println!("approx size {}", queue.size());
//!     Ok(())
//! }
//! ```
//!
//! # Consistency model
//!
//! - **Item handoff**: atomic per shard; the store's `MULTI`/`EXEC`
//!   sequences are the sole mutual-exclusion mechanism, so two consumers
//!   never retrieve the same item
//! - **Ordering**: insertion order within a shard, no order across shards
//! - **Sizes**: eventually consistent; `size()` reads local caches fed by
//!   broadcasts and may lag the store by any number of operations

pub mod config;
pub mod error;
pub mod events;
pub mod queue;
pub mod shard;
pub mod slots;
pub mod store;
pub mod testing;
pub mod weights;

// Re-export main types for convenience
pub use config::{QueueConfig, RedisConfig, DEFAULT_BASE_KEY, DEFAULT_MAX_SIZE};
pub use error::{ConfigError, Error, Result, StoreError};
pub use events::QueueEvent;
pub use queue::WeightedQueue;
pub use shard::ShardQueue;
pub use slots::SlotTable;
pub use store::{MemoryStore, RedisStore, Store};
pub use weights::NormalizedWeights;
