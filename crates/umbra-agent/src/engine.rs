//! Engine surface exposed to surrounding application code.
//!
//! `Engine::start` spawns the connection supervisor on a background
//! task and returns a handle for the display/button/power-management
//! side: wait for readiness, publish events, request shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Notify, RwLock, watch};
use tokio::task::JoinHandle;

use umbra_protocol::DeviceIdentity;
use umbra_protocol::document::EventKind;
use umbra_transport::{Connection, Transport};

use crate::config::AgentConfig;
use crate::error::{PublishError, SetupError};
use crate::events;
use crate::supervisor;

/// Shared engine state: identity, configuration, transport, and the
/// session-spanning synchronization points (ready latch, shutdown
/// signal, current-connection slot).
pub struct Engine {
    pub(crate) identity: DeviceIdentity,
    pub(crate) config: AgentConfig,
    pub(crate) transport: Arc<dyn Transport>,
    ready: watch::Sender<bool>,
    shutdown: Notify,
    shutdown_requested: AtomicBool,
    connection: RwLock<Option<Arc<dyn Connection>>>,
}

impl Engine {
    pub fn new(
        identity: DeviceIdentity,
        config: AgentConfig,
        transport: Arc<dyn Transport>,
    ) -> Arc<Self> {
        let (ready, _) = watch::channel(false);
        Arc::new(Self {
            identity,
            config,
            transport,
            ready,
            shutdown: Notify::new(),
            shutdown_requested: AtomicBool::new(false),
            connection: RwLock::new(None),
        })
    }

    /// Begin the supervised session loop on a background task.
    pub fn start(
        identity: DeviceIdentity,
        config: AgentConfig,
        transport: Arc<dyn Transport>,
    ) -> EngineHandle {
        let engine = Self::new(identity, config, transport);
        let task = tokio::spawn(supervisor::run(engine.clone()));
        EngineHandle { engine, task }
    }

    /// Block until the connection-ready latch is open.
    ///
    /// The latch is level-triggered: waking one waiter leaves it open
    /// for the next.
    pub async fn wait_until_ready(&self) {
        let mut ready = self.ready.subscribe();
        // The engine owns the sender, so the channel cannot close.
        let _ = ready.wait_for(|open| *open).await;
    }

    /// Post the teardown request; the supervisor observes it at its
    /// blocking point and exits after cleanup.
    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
        self.shutdown.notify_one();
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    /// Publish a fire-and-forget application event. See
    /// [`events::publish_event`].
    pub async fn publish_event(&self, kind: EventKind) -> Result<(), PublishError> {
        events::publish_event(self, kind).await
    }

    // ── Supervisor-side hooks ─────────────────────────────────

    pub(crate) fn open_ready_latch(&self) {
        self.ready.send_replace(true);
    }

    pub(crate) fn close_ready_latch(&self) {
        self.ready.send_replace(false);
    }

    pub(crate) async fn shutdown_signal(&self) {
        self.shutdown.notified().await;
    }

    pub(crate) async fn set_connection(&self, connection: Option<Arc<dyn Connection>>) {
        *self.connection.write().await = connection;
    }

    pub(crate) async fn current_connection(&self) -> Option<Arc<dyn Connection>> {
        self.connection.read().await.clone()
    }

    pub(crate) fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.config.lock_timeout_secs)
    }

    pub(crate) fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.config.operation_timeout_secs)
    }

    pub(crate) fn convergence_period(&self) -> Duration {
        Duration::from_secs(self.config.convergence_interval_secs)
    }
}

/// Handle to a started engine.
pub struct EngineHandle {
    engine: Arc<Engine>,
    task: JoinHandle<Result<(), SetupError>>,
}

impl EngineHandle {
    pub async fn wait_until_ready(&self) {
        self.engine.wait_until_ready().await;
    }

    pub fn request_shutdown(&self) {
        self.engine.request_shutdown();
    }

    pub async fn publish_event(&self, kind: EventKind) -> Result<(), PublishError> {
        self.engine.publish_event(kind).await
    }

    /// Await supervisor exit. Fatal setup failures surface here.
    pub async fn join(&mut self) -> Result<(), SetupError> {
        match (&mut self.task).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "supervisor task aborted");
                Ok(())
            }
        }
    }
}
