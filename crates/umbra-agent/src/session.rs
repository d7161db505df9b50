//! Per-cycle session state.
//!
//! A `Session` and its synchronization tokens are created fresh for
//! every reconnect cycle and dropped during cleanup; they never outlive
//! one connection attempt.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

use umbra_protocol::DeviceIdentity;
use umbra_transport::Connection;

use crate::store::ShadowStore;

/// One connection attempt's shared state: the handle, the store guarded
/// by the report lock, and the teardown signal.
pub struct Session {
    pub identity: DeviceIdentity,
    pub connection: Arc<dyn Connection>,
    pub store: ShadowStore,
    pub report_timeout: Duration,
    lost: AtomicBool,
    teardown: Notify,
}

impl Session {
    pub fn new(
        identity: DeviceIdentity,
        connection: Arc<dyn Connection>,
        lock_timeout: Duration,
        report_timeout: Duration,
    ) -> Self {
        Self {
            identity,
            connection,
            store: ShadowStore::new(lock_timeout),
            report_timeout,
            lost: AtomicBool::new(false),
            teardown: Notify::new(),
        }
    }

    /// Whether the connection has been marked dead.
    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst)
    }

    /// Mark the connection dead and request teardown. Idempotent; any
    /// component may call it.
    pub fn mark_lost(&self) {
        if !self.lost.swap(true, Ordering::SeqCst) {
            tracing::warn!(device = %self.identity, "session marked lost");
            self.teardown.notify_one();
        }
    }

    /// Request teardown without marking the connection dead.
    pub fn request_teardown(&self) {
        self.teardown.notify_one();
    }

    /// Resolves once teardown has been requested. The supervisor's single
    /// blocking point.
    pub async fn torn_down(&self) {
        self.teardown.notified().await;
    }
}
