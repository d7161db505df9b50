//! Inbound event classification for the transport's pump task.
//!
//! Raw MQTT publishes are turned into typed `TransportEvent`s so the
//! engine can dispatch them without topic string matching.

use umbra_protocol::topics;

/// An inbound notification from the transport.
#[derive(Debug)]
pub enum TransportEvent {
    /// Shadow delta — desired state diverged from reported.
    Delta(Vec<u8>),
    /// Shadow document changed (previous/current sections).
    Updated(Vec<u8>),
    /// The connection died; equivalent to a teardown request.
    ConnectionLost(String),
}

/// Classify a raw publish into a transport event.
///
/// Returns `None` for topics the engine does not consume (the pump logs
/// and drops them).
pub fn classify(topic: &str, payload: &[u8]) -> Option<TransportEvent> {
    let parsed = topics::parse_topic(topic)?;
    if parsed.category != "shadow" {
        return None;
    }
    match parsed.action.as_deref() {
        Some("delta") => Some(TransportEvent::Delta(payload.to_vec())),
        Some("documents") => Some(TransportEvent::Updated(payload.to_vec())),
        _ => None,
    }
}
