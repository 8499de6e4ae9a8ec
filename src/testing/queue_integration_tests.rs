//! Integration tests for the weighted queue over a shared in-memory store.
//!
//! These tests exercise the full put/get/size path including the
//! broadcast-driven size caches. Separate queue instances built over
//! clones of one `MemoryStore` stand in for independent processes sharing
//! one Redis.

#[cfg(test)]
mod tests {
    use crate::config::QueueConfig;
    use crate::error::Error;
    use crate::events::QueueEvent;
    use crate::queue::WeightedQueue;
    use crate::store::{MemoryStore, Store};
    use crate::testing::{wait_for, FaultyStore};
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::broadcast;

    const SYNC_TIMEOUT: Duration = Duration::from_secs(2);

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Job {
        id: u32,
        body: String,
    }

    async fn queue_over(store: &MemoryStore, config: QueueConfig) -> WeightedQueue {
        WeightedQueue::with_store(config, Arc::new(store.clone()))
            .await
            .unwrap()
    }

    /// Drain the queue until it reports empty, collecting items in order.
    async fn drain(queue: &WeightedQueue) -> Vec<String> {
        let mut items = Vec::new();
        while let Some(item) = queue.get::<String>().await.unwrap() {
            items.push(item);
        }
        items
    }

    /// Wait for a `SizeChange` event carrying `want`, skipping others.
    async fn expect_size_change(
        rx: &mut broadcast::Receiver<QueueEvent>,
        want: u64,
        timeout: Duration,
    ) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            match tokio::time::timeout(remaining, rx.recv()).await {
                Ok(Ok(QueueEvent::SizeChange { size })) if size == want => return true,
                Ok(Ok(_)) => continue,
                Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
                Ok(Err(broadcast::error::RecvError::Closed)) | Err(_) => return false,
            }
        }
    }

    #[tokio::test]
    async fn test_round_trip() {
        let store = MemoryStore::new();
        let queue = queue_over(&store, QueueConfig::new(vec![1.0])).await;

        let payload = queue.put(0, "hello").await.unwrap();
        assert_eq!(payload, b"\"hello\"");

        assert!(wait_for(|| queue.size() == 1, SYNC_TIMEOUT).await);
        assert_eq!(queue.get::<String>().await.unwrap(), Some("hello".into()));
    }

    #[tokio::test]
    async fn test_struct_round_trip() {
        let store = MemoryStore::new();
        let queue = queue_over(&store, QueueConfig::new(vec![1.0])).await;

        let job = Job {
            id: 7,
            body: "resize avatars".into(),
        };
        queue.put(0, &job).await.unwrap();

        assert!(wait_for(|| queue.size() == 1, SYNC_TIMEOUT).await);
        assert_eq!(queue.get::<Job>().await.unwrap(), Some(job));
    }

    #[tokio::test]
    async fn test_put_commits_even_when_size_broadcast_fails() {
        let store = MemoryStore::new();
        let faulty = Arc::new(FaultyStore::new(Arc::new(store.clone())));
        let queue = WeightedQueue::with_store(QueueConfig::new(vec![1.0]), faulty.clone())
            .await
            .unwrap();

        faulty.fail_publish(true);
        let payload = queue.put(0, "kept").await.unwrap();
        assert_eq!(payload, b"\"kept\"");

        // The mutation is final even though its size announcement failed.
        let list_key = queue.config().list_key(0);
        assert_eq!(store.len(&list_key).await.unwrap(), 1);

        // Caches re-converge once broadcasts flow again.
        faulty.fail_publish(false);
        assert_eq!(queue.shard(0).unwrap().fetch_size().await.unwrap(), 1);
        assert!(wait_for(|| queue.size() == 1, SYNC_TIMEOUT).await);
        assert_eq!(queue.get::<String>().await.unwrap(), Some("kept".into()));
    }

    #[tokio::test]
    async fn test_storage_error_from_put_is_not_retried() {
        let store = MemoryStore::new();
        let faulty = Arc::new(FaultyStore::new(Arc::new(store)));
        let queue = WeightedQueue::with_store(QueueConfig::new(vec![1.0]), faulty.clone())
            .await
            .unwrap();

        faulty.fail_push(true);
        let err = queue.put(0, "x").await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert_eq!(faulty.push_attempts(), 1);

        // Nothing was stored.
        faulty.fail_push(false);
        assert_eq!(queue.shard(0).unwrap().fetch_size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_storage_error_from_get_is_not_retried() {
        let store = MemoryStore::new();
        let faulty = Arc::new(FaultyStore::new(Arc::new(store)));
        let queue = WeightedQueue::with_store(QueueConfig::new(vec![1.0]), faulty.clone())
            .await
            .unwrap();

        // Seed one item so the draw proceeds past the cache check.
        queue.put(0, &"x").await.unwrap();
        assert!(wait_for(|| queue.size() == 1, SYNC_TIMEOUT).await);

        faulty.fail_pop(true);
        let err = queue.get::<String>().await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert_eq!(faulty.pop_attempts(), 1);
    }

    #[tokio::test]
    async fn test_empty_queue_returns_none() {
        let store = MemoryStore::new();
        let queue = queue_over(&store, QueueConfig::new(vec![2.0, 1.0])).await;

        assert_eq!(queue.get::<String>().await.unwrap(), None);
        assert_eq!(queue.size(), 0);
    }

    #[tokio::test]
    async fn test_overflow_drops_oldest() {
        let store = MemoryStore::new();
        // One shard holding at most 3 items.
        let config = QueueConfig::new(vec![1.0]).with_max_size(3);
        let queue = queue_over(&store, config).await;

        for i in 0..5 {
            queue.put(0, &format!("item-{i}")).await.unwrap();
        }
        assert!(wait_for(|| queue.size() == 3, SYNC_TIMEOUT).await);

        // The three most recent survive, drained oldest first.
        assert_eq!(drain(&queue).await, vec!["item-2", "item-3", "item-4"]);
    }

    #[tokio::test]
    async fn test_explicit_put_lands_in_zero_weight_shard() {
        let store = MemoryStore::new();
        // 200:1 floors the second shard's weight to zero.
        let queue = queue_over(&store, QueueConfig::new(vec![200.0, 1.0])).await;
        assert_eq!(queue.normalized_weights(), &[100, 0]);

        queue.put(1, &42u32).await.unwrap();
        let shard = queue.shard(1).unwrap();
        assert_eq!(shard.fetch_size().await.unwrap(), 1);
        assert_eq!(shard.get::<u32>().await.unwrap(), Some(42));
    }

    #[tokio::test]
    async fn test_weighted_draw_never_picks_zero_weight_shard() {
        let store = MemoryStore::new();
        let queue = queue_over(&store, QueueConfig::new(vec![200.0, 1.0])).await;

        queue.put(1, &"pinned".to_string()).await.unwrap();
        for i in 0..10 {
            queue.put(0, &format!("job-{i}")).await.unwrap();
        }
        assert!(wait_for(|| queue.size() == 11, SYNC_TIMEOUT).await);

        // Ten draws serve the ten weighted items; the zero-weight shard
        // keeps its item because it owns no slots.
        for _ in 0..10 {
            assert!(queue.get::<String>().await.unwrap().is_some());
        }
        assert_eq!(queue.shard(1).unwrap().fetch_size().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_redraw_cap_falls_back_to_authoritative_sizes() {
        let store = MemoryStore::new();
        let queue = queue_over(&store, QueueConfig::new(vec![200.0, 1.0])).await;

        // The only item sits in the shard the weighted draw can never
        // reach; the bounded redraw must fall through to authoritative
        // sizes instead of spinning on stale caches.
        queue.put(1, &"stranded".to_string()).await.unwrap();
        assert!(wait_for(|| queue.size() == 1, SYNC_TIMEOUT).await);

        assert_eq!(
            queue.get::<String>().await.unwrap(),
            Some("stranded".into())
        );
    }

    #[tokio::test]
    async fn test_cross_process_visibility() {
        let store = MemoryStore::new();
        let config = QueueConfig::new(vec![1.0, 1.0, 1.0]).with_base_key("xproc");
        let producer = queue_over(&store, config.clone()).await;
        // Passive observer sharing the store; performs no operations.
        let observer = queue_over(&store, config).await;

        for i in 0..5 {
            producer.put(2, &i).await.unwrap();
        }

        let shard_synced = wait_for(
            || observer.shard(2).unwrap().last_size() == Some(5),
            SYNC_TIMEOUT,
        )
        .await;
        assert!(shard_synced);
        assert_eq!(observer.size(), 5);
    }

    #[tokio::test]
    async fn test_size_change_event_from_remote_put() {
        let store = MemoryStore::new();
        let config = QueueConfig::new(vec![1.0]).with_base_key("events");
        let producer = queue_over(&store, config.clone()).await;
        let observer = queue_over(&store, config).await;

        let mut events = observer.subscribe();
        producer.put(0, &"x").await.unwrap();

        assert!(expect_size_change(&mut events, 1, SYNC_TIMEOUT).await);
    }

    #[tokio::test]
    async fn test_concurrent_consumers_share_items_exactly_once() {
        let store = MemoryStore::new();
        let config = QueueConfig::new(vec![1.0, 1.0]).with_base_key("race");
        let producer = Arc::new(queue_over(&store, config.clone()).await);
        let other = Arc::new(queue_over(&store, config).await);

        for i in 0..10 {
            producer.put(i % 2, &format!("job-{i}")).await.unwrap();
        }
        assert!(wait_for(|| producer.size() == 10, SYNC_TIMEOUT).await);

        let a = tokio::spawn({
            let queue = producer.clone();
            async move { drain(queue.as_ref()).await }
        });
        let b = tokio::spawn({
            let queue = other.clone();
            async move { drain(queue.as_ref()).await }
        });

        let mut items = a.await.unwrap();
        items.extend(b.await.unwrap());
        items.sort();

        let mut expected: Vec<String> = (0..10).map(|i| format!("job-{i}")).collect();
        expected.sort();
        assert_eq!(items, expected);
    }

    #[tokio::test]
    async fn test_serialization_error_leaves_store_untouched() {
        let store = MemoryStore::new();
        let queue = queue_over(&store, QueueConfig::new(vec![1.0])).await;

        // serde_json cannot encode NaN.
        let err = queue.put(0, &f64::NAN).await.unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
        assert_eq!(queue.shard(0).unwrap().fetch_size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_deserialization_error_surfaces() {
        let store = MemoryStore::new();
        let queue = queue_over(&store, QueueConfig::new(vec![1.0])).await;

        queue.put(0, &"not a number").await.unwrap();
        let err = queue.shard(0).unwrap().get::<u64>().await.unwrap_err();
        assert!(matches!(err, Error::Deserialization(_)));
    }

    #[tokio::test]
    async fn test_put_rejects_unknown_shard() {
        let store = MemoryStore::new();
        let queue = queue_over(&store, QueueConfig::new(vec![1.0, 1.0])).await;

        let err = queue.put(2, &"x").await.unwrap_err();
        assert!(matches!(
            err,
            Error::ShardOutOfRange { shard: 2, shards: 2 }
        ));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_any_shard_exists() {
        let store = MemoryStore::new();
        let result =
            WeightedQueue::with_store(QueueConfig::new(vec![]), Arc::new(store.clone())).await;
        assert!(matches!(result, Err(Error::Config(_))));

        let result = WeightedQueue::with_store(
            QueueConfig::new(vec![1.0]).with_max_size(0),
            Arc::new(store),
        )
        .await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
