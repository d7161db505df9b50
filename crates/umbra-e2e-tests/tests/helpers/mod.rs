//! Shared test harness: a started engine on a mock transport.

use std::sync::Arc;
use std::time::Duration;

use umbra_agent::config::AgentConfig;
use umbra_agent::engine::{Engine, EngineHandle};
use umbra_agent::session::Session;
use umbra_protocol::DeviceIdentity;
use umbra_transport::{ConnectOptions, MockConnection, MockTransport, Transport};

pub const DEVICE_HEX: &str = "a4cf12057f30";

/// Build a config for tests. The convergence interval is parked at an
/// hour so the driver stays quiet unless a test drives ticks itself;
/// `extra` lines override any top-level field.
pub fn test_config(extra: &str) -> AgentConfig {
    toml::from_str(&format!(
        r#"
device_id = "{DEVICE_HEX}"
convergence_interval_secs = 3600
{extra}

[mqtt]
broker_host = "localhost"
use_tls = false
"#
    ))
    .expect("harness config must parse")
}

pub struct TestHarness {
    pub transport: Arc<MockTransport>,
    pub handle: EngineHandle,
}

impl TestHarness {
    /// Start an engine and wait for the first session to become ready.
    pub async fn start(extra: &str) -> Self {
        let transport = Arc::new(MockTransport::new());
        let handle = Engine::start(
            DeviceIdentity::from_hex(DEVICE_HEX).unwrap(),
            test_config(extra),
            transport.clone(),
        );
        handle.wait_until_ready().await;
        Self { transport, handle }
    }

    /// The current (most recent) session's mock connection.
    pub fn connection(&self) -> Arc<MockConnection> {
        self.transport
            .last_connection()
            .expect("a session should be connected")
    }
}

/// A standalone session over a fresh mock transport, for tests that
/// drive the reconciler/driver/synchronizer directly.
pub async fn mock_session() -> (Arc<Session>, Arc<MockConnection>) {
    let transport = MockTransport::new();
    let link = transport
        .connect(&ConnectOptions {
            client_id: format!("umbra-{DEVICE_HEX}"),
            keep_alive: Duration::from_secs(60),
            clean_session: true,
            will: None,
        })
        .await
        .unwrap();
    let mock = transport.last_connection().unwrap();
    let session = Arc::new(Session::new(
        DeviceIdentity::from_hex(DEVICE_HEX).unwrap(),
        link.connection,
        Duration::from_secs(5),
        Duration::from_secs(5),
    ));
    (session, mock)
}

/// Poll until `condition` holds; panics if it does not within 2 seconds.
pub async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for: {what}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Small deterministic pseudo-random source for randomized scenarios.
pub struct XorShift(u64);

impl XorShift {
    pub fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    pub fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
}
