//! Mock transport for testing without a real broker.
//!
//! Records connects, shadow updates, publishes, subscriptions, and
//! deletes; supports failure injection for connect/update/subscribe,
//! inbound event injection, and update-overlap instrumentation.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::QoS;
use tokio::sync::mpsc;

use crate::connection::{ConnectOptions, Connection, RetryPolicy, SessionLink, Transport};
use crate::error::{TransportError, TransportResult};
use crate::events::TransportEvent;

/// A recorded shadow update attempt (including failed ones).
#[derive(Debug, Clone)]
pub struct RecordedUpdate {
    pub thing_name: String,
    pub payload: Vec<u8>,
    pub keep_subscriptions: bool,
}

/// A recorded publish call.
#[derive(Debug, Clone)]
pub struct RecordedPublish {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
    pub retry: RetryPolicy,
}

/// Mock implementation of the `Transport` trait.
///
/// Each `connect` hands out a fresh `MockConnection`; the transport keeps
/// them all so tests can inspect any session of a reconnecting engine.
pub struct MockTransport {
    connect_attempts: AtomicUsize,
    connect_failures: Mutex<VecDeque<TransportError>>,
    seeded_subscribe_failures: Mutex<VecDeque<TransportError>>,
    connections: Mutex<Vec<Arc<MockConnection>>>,
    update_delay: Mutex<Duration>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            connect_attempts: AtomicUsize::new(0),
            connect_failures: Mutex::new(VecDeque::new()),
            seeded_subscribe_failures: Mutex::new(VecDeque::new()),
            connections: Mutex::new(Vec::new()),
            update_delay: Mutex::new(Duration::ZERO),
        }
    }

    /// Fail the next `connect` call with the given error.
    pub fn fail_next_connect(&self, err: TransportError) {
        self.connect_failures.lock().unwrap().push_back(err);
    }

    /// Seed the next handed-out connection so its first subscribe call
    /// fails with the given error.
    pub fn fail_first_subscribe(&self, err: TransportError) {
        self.seeded_subscribe_failures.lock().unwrap().push_back(err);
    }

    /// Total `connect` calls, including failed ones.
    pub fn connect_count(&self) -> usize {
        self.connect_attempts.load(Ordering::SeqCst)
    }

    /// All sessions handed out so far, in connect order.
    pub fn connections(&self) -> Vec<Arc<MockConnection>> {
        self.connections.lock().unwrap().clone()
    }

    pub fn last_connection(&self) -> Option<Arc<MockConnection>> {
        self.connections.lock().unwrap().last().cloned()
    }

    /// Delay applied inside every `update_shadow` of subsequently created
    /// connections; lets overlap tests widen the in-flight window.
    pub fn set_update_delay(&self, delay: Duration) {
        *self.update_delay.lock().unwrap() = delay;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, opts: &ConnectOptions) -> TransportResult<SessionLink> {
        self.connect_attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(err) = self.connect_failures.lock().unwrap().pop_front() {
            return Err(err);
        }

        let (event_tx, event_rx) = mpsc::channel(64);
        let connection = Arc::new(MockConnection::new(
            opts.clone(),
            event_tx,
            *self.update_delay.lock().unwrap(),
        ));
        if let Some(err) = self.seeded_subscribe_failures.lock().unwrap().pop_front() {
            connection.fail_next_subscribe(err);
        }
        self.connections.lock().unwrap().push(connection.clone());

        Ok(SessionLink {
            connection,
            events: event_rx,
        })
    }
}

/// Mock session handle.
///
/// Thread-safe via `Mutex` (fine for test contexts).
pub struct MockConnection {
    opts: ConnectOptions,
    events: mpsc::Sender<TransportEvent>,
    updates: Mutex<Vec<RecordedUpdate>>,
    publishes: Mutex<Vec<RecordedPublish>>,
    subscriptions: Mutex<Vec<String>>,
    deletes: Mutex<Vec<String>>,
    update_results: Mutex<VecDeque<TransportResult<()>>>,
    subscribe_failures: Mutex<VecDeque<TransportError>>,
    publish_failures: Mutex<VecDeque<TransportError>>,
    disconnected: AtomicBool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    update_delay: Duration,
}

impl MockConnection {
    fn new(
        opts: ConnectOptions,
        events: mpsc::Sender<TransportEvent>,
        update_delay: Duration,
    ) -> Self {
        Self {
            opts,
            events,
            updates: Mutex::new(Vec::new()),
            publishes: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
            update_results: Mutex::new(VecDeque::new()),
            subscribe_failures: Mutex::new(VecDeque::new()),
            publish_failures: Mutex::new(VecDeque::new()),
            disconnected: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            update_delay,
        }
    }

    /// The options this session was opened with.
    pub fn opts(&self) -> &ConnectOptions {
        &self.opts
    }

    // ── Event injection ───────────────────────────────────────

    /// Deliver a shadow delta to the engine's event pump.
    pub async fn send_delta(&self, document: serde_json::Value) {
        let payload = serde_json::to_vec(&document).unwrap();
        let _ = self.events.send(TransportEvent::Delta(payload)).await;
    }

    /// Deliver an updated-document notification.
    pub async fn send_updated(&self, document: serde_json::Value) {
        let payload = serde_json::to_vec(&document).unwrap();
        let _ = self.events.send(TransportEvent::Updated(payload)).await;
    }

    /// Simulate asynchronous connection loss.
    pub async fn drop_connection(&self, reason: &str) {
        let _ = self
            .events
            .send(TransportEvent::ConnectionLost(reason.to_string()))
            .await;
    }

    // ── Failure injection ─────────────────────────────────────

    /// Queue the outcome of an upcoming `update_shadow` call; unqueued
    /// calls succeed.
    pub fn queue_update_result(&self, result: TransportResult<()>) {
        self.update_results.lock().unwrap().push_back(result);
    }

    pub fn fail_next_update(&self, err: TransportError) {
        self.queue_update_result(Err(err));
    }

    pub fn fail_next_subscribe(&self, err: TransportError) {
        self.subscribe_failures.lock().unwrap().push_back(err);
    }

    pub fn fail_next_publish(&self, err: TransportError) {
        self.publish_failures.lock().unwrap().push_back(err);
    }

    // ── Inspection ────────────────────────────────────────────

    /// All update attempts, including ones that returned an injected
    /// failure.
    pub fn updates(&self) -> Vec<RecordedUpdate> {
        self.updates.lock().unwrap().clone()
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    pub fn publishes(&self) -> Vec<RecordedPublish> {
        self.publishes.lock().unwrap().clone()
    }

    pub fn published_to(&self, topic: &str) -> Vec<RecordedPublish> {
        self.publishes
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().unwrap().clone()
    }

    pub fn is_subscribed_to(&self, filter: &str) -> bool {
        self.subscriptions.lock().unwrap().iter().any(|f| f == filter)
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }

    /// Peak number of concurrently in-flight `update_shadow` calls.
    pub fn max_in_flight_updates(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn update_shadow(
        &self,
        thing_name: &str,
        document: &[u8],
        keep_subscriptions: bool,
        _timeout: Duration,
    ) -> TransportResult<()> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.update_delay.is_zero() {
            tokio::time::sleep(self.update_delay).await;
        }

        self.updates.lock().unwrap().push(RecordedUpdate {
            thing_name: thing_name.to_string(),
            payload: document.to_vec(),
            keep_subscriptions,
        });

        let result = self
            .update_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()));

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn delete_shadow(&self, thing_name: &str, _timeout: Duration) -> TransportResult<()> {
        self.deletes.lock().unwrap().push(thing_name.to_string());
        Ok(())
    }

    async fn subscribe_delta(&self, thing_name: &str) -> TransportResult<()> {
        if let Some(err) = self.subscribe_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.subscriptions
            .lock()
            .unwrap()
            .push(umbra_protocol::topics::shadow_delta(thing_name));
        Ok(())
    }

    async fn subscribe_updated(&self, thing_name: &str) -> TransportResult<()> {
        if let Some(err) = self.subscribe_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.subscriptions
            .lock()
            .unwrap()
            .push(umbra_protocol::topics::shadow_documents(thing_name));
        Ok(())
    }

    async fn publish(
        &self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retry: RetryPolicy,
    ) -> TransportResult<()> {
        if let Some(err) = self.publish_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.publishes.lock().unwrap().push(RecordedPublish {
            topic: topic.to_string(),
            payload: payload.to_vec(),
            qos,
            retry,
        });
        Ok(())
    }

    async fn disconnect(&self) -> TransportResult<()> {
        self.disconnected.store(true, Ordering::SeqCst);
        Ok(())
    }
}
