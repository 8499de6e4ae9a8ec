//! Process-local queue events.
//!
//! Size observations travel between processes over the store's pub/sub
//! channels; within a process they surface as `QueueEvent`s on a broadcast
//! channel obtained from [`WeightedQueue::subscribe`].
//!
//! [`WeightedQueue::subscribe`]: crate::queue::WeightedQueue::subscribe

/// Capacity of the process-local event channel. Slow subscribers that fall
/// further behind than this lose the oldest events.
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Events emitted by a weighted queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueEvent {
    /// One shard observed its own authoritative length after a local
    /// put/get/size query.
    ShardSize {
        /// The shard's index.
        shard: usize,
        /// The length the store reported.
        size: u64,
    },

    /// The aggregate cached size changed. Emitted whenever any shard's
    /// cache takes a new value, including changes driven purely by
    /// broadcasts from other processes.
    SizeChange {
        /// Sum of all shards' cached sizes.
        size: u64,
    },
}

impl QueueEvent {
    /// The size carried by this event.
    pub fn size(&self) -> u64 {
        match self {
            QueueEvent::ShardSize { size, .. } => *size,
            QueueEvent::SizeChange { size } => *size,
        }
    }

    /// Whether this is an aggregate size-change event.
    pub fn is_size_change(&self) -> bool {
        matches!(self, QueueEvent::SizeChange { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_accessors() {
        let shard = QueueEvent::ShardSize { shard: 2, size: 5 };
        assert_eq!(shard.size(), 5);
        assert!(!shard.is_size_change());

        let aggregate = QueueEvent::SizeChange { size: 12 };
        assert_eq!(aggregate.size(), 12);
        assert!(aggregate.is_size_change());
    }
}
