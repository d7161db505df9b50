//! Delta reconciliation: applying cloud-desired state changes.
//!
//! Power toggles take effect immediately and are acknowledged with a
//! report in the same reconciliation step; temperature changes only move
//! the target, which the convergence driver chases over time.

use umbra_protocol::document::{DeltaFields, UpdatedDocument};
use umbra_protocol::state::ShadowPair;

use crate::session::Session;
use crate::synchronizer;

/// Handle one shadow delta notification.
///
/// Parse failures and lock timeouts are logged and swallowed; they are
/// never fatal to the session.
pub async fn on_delta(session: &Session, payload: &[u8]) {
    let delta = match DeltaFields::parse(payload) {
        Ok(delta) => delta,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring malformed shadow delta");
            return;
        }
    };

    let power_changed = {
        let Some(mut guard) = session.store.lock().await else {
            tracing::warn!("report lock contended, dropping shadow delta");
            return;
        };
        apply(&mut guard, delta, session.identity.hex())
    };

    if power_changed {
        // A power-state change must be acknowledged right away.
        if let Err(e) = synchronizer::report_state(session).await {
            tracing::warn!(error = %e, "failed to acknowledge power change");
        }
    }
}

/// Apply delta fields to the pair. Returns whether the power flag
/// changed (the only change that triggers an immediate report).
pub fn apply(pair: &mut ShadowPair, delta: DeltaFields, device: &str) -> bool {
    let mut power_changed = false;

    if let Some(power_on) = delta.power_on {
        if power_on != pair.reported.power_on {
            tracing::info!(
                device,
                from = pair.reported.power_on,
                to = power_on,
                "power state changed by delta"
            );
            pair.desired.power_on = power_on;
            pair.reported.power_on = power_on;
            power_changed = true;
        }
    }

    if let Some(temperature) = delta.temperature {
        if temperature != pair.desired.temperature {
            tracing::info!(
                device,
                from = pair.desired.temperature,
                to = temperature,
                "temperature target changed by delta"
            );
            pair.desired.temperature = temperature;
        }
    }

    power_changed
}

/// Log a shadow updated notification (previous/current document states).
pub fn on_updated(payload: &[u8]) {
    match UpdatedDocument::parse(payload) {
        Ok(updated) => {
            tracing::info!(
                previous = %updated.previous,
                current = %updated.current,
                "shadow document updated"
            );
        }
        Err(e) => {
            tracing::warn!(error = %e, "ignoring malformed shadow updated document");
        }
    }
}
