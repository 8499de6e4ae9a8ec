//! Configuration types for the weighted queue.

use crate::error::ConfigError;

/// Default base key prefix for per-shard list keys and size channels.
pub const DEFAULT_BASE_KEY: &str = "weightLists";

/// Default maximum total queue size across all shards.
pub const DEFAULT_MAX_SIZE: u64 = 1000;

/// Redis connection configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Connection URL, e.g. `redis://127.0.0.1:6379`.
    pub url: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

impl RedisConfig {
    /// Create a config from a connection URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Main configuration for a weighted queue.
///
/// `weights` defines one shard per entry; each shard is selected by `get`
/// with probability proportional to its weight. Weights are normalized to
/// integers in `[0, 100]` relative to the largest weight, so ratios steeper
/// than 1:100 floor to zero and make a shard unreachable by weighted draw
/// (it stays reachable through explicit-shard routing).
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Connection info for the shared store.
    pub redis: RedisConfig,

    /// Key prefix shared by every per-shard list and channel name.
    pub base_key: String,

    /// Maximum total number of items across all shards. Each shard holds at
    /// most `max_size / weights.len()` items; the oldest are dropped on
    /// overflow.
    pub max_size: u64,

    /// Raw per-shard weights. Must be non-empty, all positive and finite.
    pub weights: Vec<f64>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis: RedisConfig::default(),
            base_key: DEFAULT_BASE_KEY.to_string(),
            max_size: DEFAULT_MAX_SIZE,
            weights: vec![1.0],
        }
    }
}

impl QueueConfig {
    /// Create a new configuration with the given shard weights.
    pub fn new(weights: Vec<f64>) -> Self {
        Self {
            weights,
            ..Default::default()
        }
    }

    /// Set the Redis connection configuration.
    pub fn with_redis(mut self, redis: RedisConfig) -> Self {
        self.redis = redis;
        self
    }

    /// Set the Redis connection URL.
    pub fn with_redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis.url = url.into();
        self
    }

    /// Set the base key prefix.
    pub fn with_base_key(mut self, base_key: impl Into<String>) -> Self {
        self.base_key = base_key.into();
        self
    }

    /// Set the maximum total queue size.
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    /// Number of shards, one per configured weight.
    pub fn shard_count(&self) -> usize {
        self.weights.len()
    }

    /// Maximum number of items one shard may hold.
    pub fn max_shard_size(&self) -> u64 {
        self.max_size / self.weights.len() as u64
    }

    /// Store key of the bounded list backing shard `shard`.
    pub fn list_key(&self, shard: usize) -> String {
        format!("{}:l:listName::{}", self.base_key, shard)
    }

    /// Pub/sub channel carrying size broadcasts for shard `shard`.
    pub fn size_channel(&self, shard: usize) -> String {
        format!("{}:channelSize:{}", self.base_key, shard)
    }

    /// Validate the configuration.
    ///
    /// Checks only what can be decided without the store: weight count and
    /// range, and a positive `max_size`. The zero-total-weight case is
    /// rejected during normalization.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.weights.is_empty() {
            return Err(ConfigError::EmptyWeights);
        }
        for (index, &weight) in self.weights.iter().enumerate() {
            if !(weight.is_finite() && weight > 0.0) {
                return Err(ConfigError::NonPositiveWeight {
                    index,
                    value: weight.to_string(),
                });
            }
        }
        if self.max_size == 0 {
            return Err(ConfigError::NonPositiveMaxSize);
        }
        Ok(())
    }
}
