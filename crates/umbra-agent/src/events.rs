//! Fire-and-forget application event publishing.
//!
//! Independent of shadow state: a failed event publish is surfaced to
//! the caller and logged, but never tears down the session.

use rumqttc::QoS;

use umbra_protocol::document::{EventDocument, EventKind};
use umbra_protocol::topics;
use umbra_transport::RetryPolicy;

use crate::engine::Engine;
use crate::error::PublishError;

/// Publish an application event (e.g. a physical button press) to the
/// per-device event topic.
///
/// Blocks on the connection-ready latch first, so callers issued before
/// a session exists are held rather than failed. Delivery is
/// at-least-once with the transport's bounded retries.
pub async fn publish_event(engine: &Engine, kind: EventKind) -> Result<(), PublishError> {
    engine.wait_until_ready().await;

    let connection = engine
        .current_connection()
        .await
        .ok_or(PublishError::NotConnected)?;

    let payload = EventDocument::new(&engine.identity, kind)
        .to_bytes()
        .map_err(|e| PublishError::Encode(e.to_string()))?;
    let topic = topics::event_notify(engine.identity.hex());

    match connection
        .publish(&topic, &payload, QoS::AtLeastOnce, RetryPolicy::default())
        .await
    {
        Ok(()) => {
            tracing::info!(kind = kind.as_str(), topic = %topic, "event published");
            Ok(())
        }
        Err(e) => {
            tracing::warn!(error = %e, kind = kind.as_str(), "event publish failed");
            Err(PublishError::Transport(e))
        }
    }
}
