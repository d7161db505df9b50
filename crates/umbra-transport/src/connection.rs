//! Transport abstraction the shadow engine talks through.
//!
//! A `Transport` opens sessions; a `Connection` is one live session's
//! handle. Inbound traffic arrives as an ordered `TransportEvent` channel
//! rather than raw callbacks, so the engine can process notifications in
//! arrival order without re-entrant handlers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::QoS;
use tokio::sync::mpsc;

use crate::error::TransportResult;
use crate::events::TransportEvent;

/// Last-will message registered at connect time; the broker publishes it
/// if the session drops without a clean disconnect.
#[derive(Debug, Clone)]
pub struct WillMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Options for opening one session.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Generated-or-supplied MQTT client identifier.
    pub client_id: String,
    pub keep_alive: Duration,
    pub clean_session: bool,
    pub will: Option<WillMessage>,
}

/// Retry parameters carried into `Connection::publish`; the delivery
/// retries are a transport-level guarantee, not the caller's.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub limit: u32,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            limit: 10,
            interval: Duration::from_secs(1),
        }
    }
}

/// One live session handle.
///
/// Owned by the connection supervisor for the lifetime of a session;
/// other components call through it but never disconnect it themselves.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Publish a shadow state report for `thing_name`.
    ///
    /// `keep_subscriptions` retains shadow response subscriptions across
    /// calls; passing `true` on every update is the supported pattern.
    async fn update_shadow(
        &self,
        thing_name: &str,
        document: &[u8],
        keep_subscriptions: bool,
        timeout: Duration,
    ) -> TransportResult<()>;

    /// Delete the cloud-held shadow document. Idempotent: an absent
    /// document counts as success.
    async fn delete_shadow(&self, thing_name: &str, timeout: Duration) -> TransportResult<()>;

    /// Register for desired-vs-reported divergence notifications.
    async fn subscribe_delta(&self, thing_name: &str) -> TransportResult<()>;

    /// Register for full-document change notifications.
    async fn subscribe_updated(&self, thing_name: &str) -> TransportResult<()>;

    /// Publish a raw payload to a topic with bounded delivery retries.
    async fn publish(
        &self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retry: RetryPolicy,
    ) -> TransportResult<()>;

    /// Close the session. Only the supervisor calls this.
    async fn disconnect(&self) -> TransportResult<()>;
}

/// A freshly opened session: the handle plus its inbound event channel.
pub struct SessionLink {
    pub connection: Arc<dyn Connection>,
    pub events: mpsc::Receiver<TransportEvent>,
}

/// Factory for sessions. One `connect` call per reconnect cycle.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, opts: &ConnectOptions) -> TransportResult<SessionLink>;
}
