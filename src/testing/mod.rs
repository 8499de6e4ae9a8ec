//! Testing utilities for the weighted queue.
//!
//! Sizes propagate between queue instances through broadcast, so most
//! interesting states are reached *eventually* rather than on return from
//! an operation. [`wait_for`] polls a condition with a timeout; the
//! integration tests lean on it together with [`MemoryStore`], whose
//! clones share state the way separate processes share one Redis, and
//! [`FaultyStore`], which injects per-operation store failures.
//!
//! [`MemoryStore`]: crate::store::MemoryStore

mod faults;
mod queue_integration_tests;
mod utils;

pub use faults::FaultyStore;
pub use utils::wait_for;
