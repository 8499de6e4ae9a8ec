//! Storage collaborator boundary.
//!
//! The queue core needs exactly two atomic list sequences and a cross-
//! process pub/sub channel from its store; everything else (connection
//! management, retries, durability) belongs to the implementation behind
//! this trait. [`RedisStore`] is the production implementation;
//! [`MemoryStore`] is a cloneable shared-state double used by tests and
//! examples.

mod memory;
mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

use crate::error::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Required capabilities of the shared store.
///
/// Both list sequences must execute atomically: that atomicity is the sole
/// mechanism preventing two concurrent consumers from retrieving the same
/// item. The queue core adds no locking of its own.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Atomically push `payload` as the newest element of the list at
    /// `key`, trim the list so only the `keep` most recent elements
    /// survive (dropping the oldest beyond that), and return the resulting
    /// length.
    async fn push_and_trim(&self, key: &str, payload: &[u8], keep: u64) -> Result<u64>;

    /// Atomically remove the oldest element of the list at `key` and
    /// return it (or `None` if the list was empty) together with the
    /// resulting length.
    async fn pop_oldest(&self, key: &str) -> Result<(Option<Vec<u8>>, u64)>;

    /// Authoritative length of the list at `key`.
    async fn len(&self, key: &str) -> Result<u64>;

    /// Publish a size observation on `channel`, visible to every
    /// subscribed process.
    async fn publish(&self, channel: &str, size: u64) -> Result<()>;

    /// Subscribe to size observations on `channel`. Delivery starts with
    /// values published after the subscription is established; earlier
    /// values are not replayed.
    async fn subscribe(&self, channel: &str) -> Result<mpsc::Receiver<u64>>;
}
