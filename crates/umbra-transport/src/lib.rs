//! MQTT transport boundary for the Umbra shadow engine.
//!
//! Provides the external-collaborator surface the engine talks through:
//! - `Transport`/`Connection` traits (mockable in tests)
//! - `MqttTransport` backed by rumqttc, with mTLS for production
//! - `TransportEvent` classification for inbound messages
//! - `MockTransport` for testing without a broker

pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod mock;
pub mod mqtt;
pub mod tls;

// Re-exports for convenience.
pub use config::MqttConfig;
pub use connection::{Connection, ConnectOptions, RetryPolicy, SessionLink, Transport, WillMessage};
pub use error::{TransportError, TransportResult};
pub use events::{TransportEvent, classify};
pub use mock::{MockConnection, MockTransport};
pub use mqtt::MqttTransport;
