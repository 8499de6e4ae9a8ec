//! Slot table for O(1) weighted shard selection.
//!
//! Each shard owns a contiguous half-open range of integer slots sized by
//! its normalized weight; the ranges tile `[0, total_weight)` exactly.
//! Drawing a uniform slot and resolving it therefore picks a shard with
//! probability proportional to its weight. Shards whose weight floored to
//! zero own no slots and are never returned by `resolve`.

use crate::error::ConfigError;
use crate::weights::NormalizedWeights;

/// Fixed lookup table mapping every slot to the shard that owns it.
///
/// Built once at construction and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotTable {
    slots: Vec<usize>,
}

impl SlotTable {
    /// Build the table by walking shards in order and assigning shard `i`
    /// the range `[location, location + weight[i])`.
    ///
    /// # Errors
    /// `ConfigError::ZeroTotalWeight` if there are no slots to assign.
    pub fn build(weights: &NormalizedWeights) -> Result<Self, ConfigError> {
        if weights.total() == 0 {
            return Err(ConfigError::ZeroTotalWeight);
        }

        let mut slots = Vec::with_capacity(weights.total() as usize);
        for (shard, &weight) in weights.as_slice().iter().enumerate() {
            slots.extend(std::iter::repeat(shard).take(weight as usize));
        }

        debug_assert_eq!(slots.len(), weights.total() as usize);
        Ok(Self { slots })
    }

    /// Resolve a slot to its owning shard index.
    ///
    /// `slot` must be in `[0, len())`; callers draw within range by
    /// contract.
    pub fn resolve(&self, slot: usize) -> usize {
        debug_assert!(slot < self.slots.len(), "slot {} out of range", slot);
        self.slots[slot]
    }

    /// Number of slots, equal to the total normalized weight.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the table is empty. Never true for a built table.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
