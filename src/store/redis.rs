//! Redis-backed store implementation.
//!
//! Holds separate connections per role: one multiplexed connection for the
//! atomic list sequences, one for publishing size observations, and a
//! dedicated pub/sub connection per subscription (Redis cannot multiplex a
//! subscriber connection with other commands).

use crate::error::{Result, StoreError};
use crate::store::Store;
use async_trait::async_trait;
use futures_util::StreamExt;
use redis::aio::MultiplexedConnection;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Buffer size of the per-subscription fan-in channel.
const SUBSCRIPTION_BUFFER: usize = 32;

/// Production [`Store`] backed by Redis lists and pub/sub.
///
/// Atomicity of the push-trim-length and pop-length sequences comes from
/// `MULTI`/`EXEC` pipelines. Cloning is cheap; clones share the underlying
/// connections.
#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
    primary: MultiplexedConnection,
    publisher: MultiplexedConnection,
}

impl RedisStore {
    /// Connect to Redis at `url`, establishing the primary and publisher
    /// connections eagerly so configuration problems surface here rather
    /// than on the first operation.
    pub async fn connect(url: &str) -> Result<Self> {
        debug!(url, "connecting to redis");
        let client = redis::Client::open(url).map_err(StoreError::Redis)?;
        let primary = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(StoreError::Redis)?;
        let publisher = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(StoreError::Redis)?;
        Ok(Self {
            client,
            primary,
            publisher,
        })
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn push_and_trim(&self, key: &str, payload: &[u8], keep: u64) -> Result<u64> {
        // LTRIM bounds are inclusive; (1, 0) is the canonical empty range
        // for a zero-capacity list.
        let (start, stop) = if keep == 0 { (1, 0) } else { (0, keep as i64 - 1) };

        let mut conn = self.primary.clone();
        let (len,): (u64,) = redis::pipe()
            .atomic()
            .cmd("LPUSH")
            .arg(key)
            .arg(payload)
            .ignore()
            .cmd("LTRIM")
            .arg(key)
            .arg(start)
            .arg(stop)
            .ignore()
            .cmd("LLEN")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(StoreError::Redis)?;
        Ok(len)
    }

    async fn pop_oldest(&self, key: &str) -> Result<(Option<Vec<u8>>, u64)> {
        let mut conn = self.primary.clone();
        let (payload, len): (Option<Vec<u8>>, u64) = redis::pipe()
            .atomic()
            .cmd("RPOP")
            .arg(key)
            .cmd("LLEN")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(StoreError::Redis)?;
        Ok((payload, len))
    }

    async fn len(&self, key: &str) -> Result<u64> {
        let mut conn = self.primary.clone();
        let len: u64 = redis::cmd("LLEN")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(StoreError::Redis)?;
        Ok(len)
    }

    async fn publish(&self, channel: &str, size: u64) -> Result<()> {
        let mut conn = self.publisher.clone();
        let _receivers: i64 = redis::cmd("PUBLISH")
            .arg(channel)
            .arg(size)
            .query_async(&mut conn)
            .await
            .map_err(StoreError::Redis)?;
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<mpsc::Receiver<u64>> {
        let conn = self
            .client
            .get_async_connection()
            .await
            .map_err(|e| StoreError::Subscribe {
                channel: channel.to_string(),
                reason: e.to_string(),
            })?;
        let mut pubsub = conn.into_pubsub();
        pubsub
            .subscribe(channel)
            .await
            .map_err(|e| StoreError::Subscribe {
                channel: channel.to_string(),
                reason: e.to_string(),
            })?;

        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let channel = channel.to_string();
        tokio::spawn(async move {
            let mut messages = pubsub.into_on_message();
            while let Some(msg) = messages.next().await {
                let size: u64 = match msg.get_payload() {
                    Ok(size) => size,
                    Err(e) => {
                        warn!(%channel, error = %e, "ignoring unparseable size broadcast");
                        continue;
                    }
                };
                if tx.send(size).await.is_err() {
                    // Receiver dropped; the subscription dies with it.
                    break;
                }
            }
            debug!(%channel, "size subscription closed");
        });
        Ok(rx)
    }
}
