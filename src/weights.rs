//! Weight normalization.
//!
//! Raw per-shard weights are scaled against the largest weight to integers
//! in `[0, 100]`. The largest weight always normalizes to exactly 100;
//! weights smaller than 1% of the maximum floor to 0 and become unreachable
//! by weighted draw. That is a documented policy, not an accident: callers
//! needing every shard reachable must keep weight ratios within 1:100.

use crate::error::ConfigError;

/// Upper bound of a normalized weight; the maximum raw weight maps here.
pub const WEIGHT_SCALE: u32 = 100;

/// Normalized integer weights for a shard set, plus their sum.
///
/// Pure data computed once at construction and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedWeights {
    weights: Vec<u32>,
    total: u32,
}

impl NormalizedWeights {
    /// Normalize raw weights: `floor(raw[i] / max(raw) * 100)` per shard.
    ///
    /// # Errors
    /// - `ConfigError::EmptyWeights` - no weights given
    /// - `ConfigError::NonPositiveWeight` - a weight is zero, negative, or
    ///   not finite
    /// - `ConfigError::ZeroTotalWeight` - every weight floored to zero
    ///
    /// The largest weight always normalizes to exactly [`WEIGHT_SCALE`],
    /// so `ZeroTotalWeight` cannot occur for input that passes the other
    /// checks; [`SlotTable::build`] re-checks the total at its own
    /// boundary.
    ///
    /// [`SlotTable::build`]: crate::slots::SlotTable::build
    pub fn normalize(raw: &[f64]) -> Result<Self, ConfigError> {
        if raw.is_empty() {
            return Err(ConfigError::EmptyWeights);
        }

        let mut max = 0.0_f64;
        for (index, &weight) in raw.iter().enumerate() {
            if !(weight.is_finite() && weight > 0.0) {
                return Err(ConfigError::NonPositiveWeight {
                    index,
                    value: weight.to_string(),
                });
            }
            if weight > max {
                max = weight;
            }
        }

        let mut weights = Vec::with_capacity(raw.len());
        let mut total = 0u32;
        for &weight in raw {
            let normalized = (weight / max * WEIGHT_SCALE as f64).floor() as u32;
            total += normalized;
            weights.push(normalized);
        }

        if total == 0 {
            return Err(ConfigError::ZeroTotalWeight);
        }

        Ok(Self { weights, total })
    }

    /// Construct directly from already-normalized parts, bypassing
    /// `normalize`'s arithmetic. Lets tests reach states `normalize`
    /// itself cannot produce, such as a zero total.
    #[cfg(test)]
    pub(crate) fn from_parts(weights: Vec<u32>, total: u32) -> Self {
        Self { weights, total }
    }

    /// Sum of all normalized weights; the slot table has exactly this many
    /// slots.
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Number of shards.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Whether the shard set is empty. Never true for a normalized value.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Normalized weight of shard `shard`.
    pub fn get(&self, shard: usize) -> u32 {
        self.weights[shard]
    }

    /// All normalized weights, index-aligned with the shard list.
    pub fn as_slice(&self) -> &[u32] {
        &self.weights
    }
}
