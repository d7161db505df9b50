//! Convergence driver: the simulated actuator.
//!
//! A periodic tick nudges `reported.temperature` one unit toward the
//! desired target while powered, or lets it drift toward the ambient
//! ceiling while off, reporting back whenever a tick changed state.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;

use umbra_protocol::state::{AMBIENT_CEILING, ShadowPair};

use crate::session::Session;
use crate::synchronizer;

/// Run the convergence loop at `period` until the task is aborted.
///
/// Spawned per session by the supervisor; a single periodic source, so
/// ticks never run concurrently with themselves.
pub async fn run(session: Arc<Session>, period: Duration) {
    let mut ticker = time::interval(period);
    // Skip the first tick (fires immediately).
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if session.is_lost() {
            continue;
        }
        tick(&session).await;
    }
}

/// One tick: apply a step under the report lock, then report iff the
/// step changed state.
pub async fn tick(session: &Session) {
    let changed = {
        let Some(mut guard) = session.store.lock().await else {
            tracing::warn!("report lock contended, skipping convergence tick");
            return;
        };
        step(&mut guard)
    };

    if changed {
        if let Err(e) = synchronizer::report_state(session).await {
            tracing::warn!(error = %e, "failed to report convergence step");
        }
    }
}

/// One actuator step. Returns whether `reported` changed.
///
/// Powered on: move one unit toward the target, symmetric, never
/// overshooting. Powered off: drift one unit up, capped at the ambient
/// ceiling.
pub fn step(pair: &mut ShadowPair) -> bool {
    if pair.reported.power_on {
        if pair.reported.temperature == pair.desired.temperature {
            return false;
        }
        if pair.reported.temperature > pair.desired.temperature {
            pair.reported.temperature -= 1;
        } else {
            pair.reported.temperature += 1;
        }
        tracing::debug!(
            temperature = pair.reported.temperature,
            target = pair.desired.temperature,
            "actuator step toward target"
        );
        true
    } else if pair.reported.temperature < AMBIENT_CEILING {
        pair.reported.temperature += 1;
        tracing::debug!(
            temperature = pair.reported.temperature,
            "ambient drift while powered off"
        );
        true
    } else {
        false
    }
}
