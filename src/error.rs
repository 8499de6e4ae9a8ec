//! Error types for the weighted queue.

use thiserror::Error;

/// Result type alias for weighted queue operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the weighted queue.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration, rejected at construction time.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// An item could not be encoded before being written to the store.
    /// The store is never touched when this is returned.
    #[error("serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// A stored payload could not be decoded after being removed.
    /// The element has already been popped from the store.
    #[error("deserialization error: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// The storage collaborator failed. Propagated verbatim, never retried.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// An explicit-routing call named a shard that does not exist.
    #[error("shard index {shard} out of range for {shards} shards")]
    ShardOutOfRange { shard: usize, shards: usize },
}

/// Configuration errors, surfaced before any shard is created.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The weight list is empty; there is nothing to shard over.
    #[error("weight list is empty")]
    EmptyWeights,

    /// A raw weight was zero, negative, or not finite.
    #[error("weight at index {index} is not a positive finite number: {value}")]
    NonPositiveWeight { index: usize, value: String },

    /// `max_size` must be positive for shard capacities to be meaningful.
    #[error("max_size must be positive")]
    NonPositiveMaxSize,

    /// All weights floored to zero; no slot table can be built.
    #[error("total normalized weight is zero, no shard is selectable")]
    ZeroTotalWeight,
}

/// Storage collaborator errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Redis connectivity or protocol failure.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Subscribing to a size channel failed.
    #[error("subscribe failed on channel {channel}: {reason}")]
    Subscribe { channel: String, reason: String },

    /// Internal store failure (used by non-Redis implementations).
    #[error("store internal error: {0}")]
    Internal(String),
}
