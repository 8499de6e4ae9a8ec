//! Fault-injecting store wrapper.

use crate::error::{Result, StoreError};
use crate::store::Store;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// A [`Store`] wrapper with per-method failure toggles.
///
/// Wraps any inner store and, while a toggle is set, fails the matching
/// operation with `StoreError::Internal` before the inner store is
/// touched. Attempt counters record how often each operation was tried,
/// which lets tests assert that a failure surfaced after exactly one
/// attempt (the queue never retries store operations).
pub struct FaultyStore {
    inner: Arc<dyn Store>,
    fail_push: AtomicBool,
    fail_pop: AtomicBool,
    fail_len: AtomicBool,
    fail_publish: AtomicBool,
    push_attempts: AtomicUsize,
    pop_attempts: AtomicUsize,
}

impl FaultyStore {
    /// Wrap an inner store with all toggles off.
    pub fn new(inner: Arc<dyn Store>) -> Self {
        Self {
            inner,
            fail_push: AtomicBool::new(false),
            fail_pop: AtomicBool::new(false),
            fail_len: AtomicBool::new(false),
            fail_publish: AtomicBool::new(false),
            push_attempts: AtomicUsize::new(0),
            pop_attempts: AtomicUsize::new(0),
        }
    }

    /// Fail subsequent `push_and_trim` calls.
    pub fn fail_push(&self, fail: bool) {
        self.fail_push.store(fail, Ordering::SeqCst);
    }

    /// Fail subsequent `pop_oldest` calls.
    pub fn fail_pop(&self, fail: bool) {
        self.fail_pop.store(fail, Ordering::SeqCst);
    }

    /// Fail subsequent `len` calls.
    pub fn fail_len(&self, fail: bool) {
        self.fail_len.store(fail, Ordering::SeqCst);
    }

    /// Fail subsequent `publish` calls.
    pub fn fail_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Number of `push_and_trim` attempts, including failed ones.
    pub fn push_attempts(&self) -> usize {
        self.push_attempts.load(Ordering::SeqCst)
    }

    /// Number of `pop_oldest` attempts, including failed ones.
    pub fn pop_attempts(&self) -> usize {
        self.pop_attempts.load(Ordering::SeqCst)
    }

    fn injected(op: &str) -> StoreError {
        StoreError::Internal(format!("injected {op} failure"))
    }
}

#[async_trait]
impl Store for FaultyStore {
    async fn push_and_trim(&self, key: &str, payload: &[u8], keep: u64) -> Result<u64> {
        self.push_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_push.load(Ordering::SeqCst) {
            return Err(Self::injected("push").into());
        }
        self.inner.push_and_trim(key, payload, keep).await
    }

    async fn pop_oldest(&self, key: &str) -> Result<(Option<Vec<u8>>, u64)> {
        self.pop_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_pop.load(Ordering::SeqCst) {
            return Err(Self::injected("pop").into());
        }
        self.inner.pop_oldest(key).await
    }

    async fn len(&self, key: &str) -> Result<u64> {
        if self.fail_len.load(Ordering::SeqCst) {
            return Err(Self::injected("len").into());
        }
        self.inner.len(key).await
    }

    async fn publish(&self, channel: &str, size: u64) -> Result<()> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(Self::injected("publish").into());
        }
        self.inner.publish(channel, size).await
    }

    async fn subscribe(&self, channel: &str) -> Result<mpsc::Receiver<u64>> {
        self.inner.subscribe(channel).await
    }
}
