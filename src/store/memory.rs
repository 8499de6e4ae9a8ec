//! In-memory store implementation for tests and examples.

use crate::error::Result;
use crate::store::Store;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

/// Capacity of each in-memory pub/sub channel.
const CHANNEL_CAPACITY: usize = 64;

/// Buffer size of the per-subscription fan-in channel.
const SUBSCRIPTION_BUFFER: usize = 32;

/// Shared in-memory [`Store`].
///
/// Cloneable: clones share the same lists and channels, which models
/// several independent queue instances (or processes) working against one
/// store. Lists keep the newest element at the front, mirroring the Redis
/// layout where `push` is an `LPUSH` and the oldest element sits at the
/// tail.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreCore>,
}

#[derive(Default)]
struct MemoryStoreCore {
    lists: Mutex<HashMap<String, VecDeque<Vec<u8>>>>,
    channels: Mutex<HashMap<String, broadcast::Sender<u64>>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn channel(&self, name: &str) -> broadcast::Sender<u64> {
        self.inner
            .channels
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn push_and_trim(&self, key: &str, payload: &[u8], keep: u64) -> Result<u64> {
        let mut lists = self.inner.lists.lock();
        let list = lists.entry(key.to_string()).or_default();
        list.push_front(payload.to_vec());
        // Front of the deque is newest; truncate drops the oldest.
        list.truncate(keep as usize);
        Ok(list.len() as u64)
    }

    async fn pop_oldest(&self, key: &str) -> Result<(Option<Vec<u8>>, u64)> {
        let mut lists = self.inner.lists.lock();
        let list = lists.entry(key.to_string()).or_default();
        let payload = list.pop_back();
        Ok((payload, list.len() as u64))
    }

    async fn len(&self, key: &str) -> Result<u64> {
        let lists = self.inner.lists.lock();
        Ok(lists.get(key).map_or(0, |list| list.len() as u64))
    }

    async fn publish(&self, channel: &str, size: u64) -> Result<()> {
        // A send error just means nobody is subscribed yet; pub/sub has no
        // replay, so the value is dropped as Redis would drop it.
        let _ = self.channel(channel).send(size);
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<mpsc::Receiver<u64>> {
        let mut source = self.channel(channel).subscribe();
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        tokio::spawn(async move {
            loop {
                match source.recv().await {
                    Ok(size) => {
                        if tx.send(size).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_push_pop_order() {
        let store = MemoryStore::new();
        store.push_and_trim("k", b"a", 10).await.unwrap();
        store.push_and_trim("k", b"b", 10).await.unwrap();
        let len = store.push_and_trim("k", b"c", 10).await.unwrap();
        assert_eq!(len, 3);

        // Oldest out first.
        assert_eq!(store.pop_oldest("k").await.unwrap(), (Some(b"a".to_vec()), 2));
        assert_eq!(store.pop_oldest("k").await.unwrap(), (Some(b"b".to_vec()), 1));
        assert_eq!(store.pop_oldest("k").await.unwrap(), (Some(b"c".to_vec()), 0));
        assert_eq!(store.pop_oldest("k").await.unwrap(), (None, 0));
    }

    #[tokio::test]
    async fn test_trim_drops_oldest() {
        let store = MemoryStore::new();
        for i in 0..5u8 {
            store.push_and_trim("k", &[i], 3).await.unwrap();
        }
        assert_eq!(store.len("k").await.unwrap(), 3);

        // The two oldest (0 and 1) were dropped.
        assert_eq!(store.pop_oldest("k").await.unwrap().0, Some(vec![2]));
        assert_eq!(store.pop_oldest("k").await.unwrap().0, Some(vec![3]));
        assert_eq!(store.pop_oldest("k").await.unwrap().0, Some(vec![4]));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.push_and_trim("k", b"x", 10).await.unwrap();
        assert_eq!(other.len("k").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers() {
        let store = MemoryStore::new();
        let mut rx_a = store.subscribe("c").await.unwrap();
        let mut rx_b = store.clone().subscribe("c").await.unwrap();

        store.publish("c", 7).await.unwrap();
        assert_eq!(rx_a.recv().await, Some(7));
        assert_eq!(rx_b.recv().await, Some(7));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_dropped() {
        let store = MemoryStore::new();
        store.publish("c", 1).await.unwrap();

        let mut rx = store.subscribe("c").await.unwrap();
        store.publish("c", 2).await.unwrap();
        assert_eq!(rx.recv().await, Some(2));
    }
}
