//! Shared shadow state behind the report lock.
//!
//! The mutex here is the engine's single serialization point: every
//! read-modify-report sequence against `desired`/`reported` acquires it
//! with a bounded wait, and holding the guard across the transport call
//! is what guarantees at most one report in flight.

use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};

use umbra_protocol::state::ShadowPair;

/// Owner of the `desired`/`reported` pair.
pub struct ShadowStore {
    inner: Mutex<ShadowPair>,
    lock_timeout: Duration,
}

impl ShadowStore {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(ShadowPair::default()),
            lock_timeout,
        }
    }

    /// Acquire the report lock with a bounded wait.
    ///
    /// `None` means the lock stayed contended past the timeout; the
    /// caller logs and gives up its cycle rather than blocking.
    pub async fn lock(&self) -> Option<MutexGuard<'_, ShadowPair>> {
        tokio::time::timeout(self.lock_timeout, self.inner.lock())
            .await
            .ok()
    }

    /// Copy of the current pair, for inspection.
    pub async fn snapshot(&self) -> Option<ShadowPair> {
        self.lock().await.map(|guard| *guard)
    }
}
