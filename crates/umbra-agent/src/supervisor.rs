//! Connection supervisor: the reconnect loop.
//!
//! Owns the transport session for its lifetime. One cycle: validate
//! identity, connect with a last-will message, register shadow
//! notifications, spawn the event pump and convergence driver, open the
//! ready latch, then idle until teardown. Setup steps are not retried
//! individually — a failure aborts the whole cycle and the outer loop
//! makes a fresh attempt.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use umbra_protocol::topics;
use umbra_transport::{ConnectOptions, SessionLink, TransportEvent, WillMessage};

use crate::convergence;
use crate::engine::Engine;
use crate::error::SetupError;
use crate::reconciler;
use crate::session::Session;
use crate::synchronizer;

/// Payload the broker publishes on our behalf if the session drops
/// without a clean disconnect.
const LAST_WILL_PAYLOAD: &[u8] = br#"{"message": "disconnected"}"#;

/// Run reconnect cycles until shutdown, a single cycle in one-shot mode,
/// or a fatal setup failure.
pub async fn run(engine: Arc<Engine>) -> Result<(), SetupError> {
    loop {
        match run_cycle(&engine).await {
            Ok(()) => {}
            Err(e @ SetupError::InvalidIdentity) => {
                tracing::error!(error = %e, "fatal session setup failure");
                return Err(e);
            }
            Err(e) => {
                tracing::error!(error = %e, "session setup failed, cycle aborted");
            }
        }

        if engine.shutdown_requested() {
            tracing::info!("shutdown requested, supervisor exiting");
            return Ok(());
        }
        if !engine.config.continuous {
            return Ok(());
        }
        // Immediate unconditional retry; no backoff.
    }
}

/// One connection attempt: setup, steady state, cleanup.
async fn run_cycle(engine: &Arc<Engine>) -> Result<(), SetupError> {
    if engine.identity.is_empty() {
        return Err(SetupError::InvalidIdentity);
    }
    let thing_name = engine.identity.hex().to_string();

    let opts = connect_options(engine);
    let SessionLink { connection, events } = engine
        .transport
        .connect(&opts)
        .await
        .map_err(SetupError::ConnectFailed)?;
    tracing::info!(client_id = %opts.client_id, device = %thing_name, "session connected");

    if engine.config.reconcile {
        let registered = {
            match connection.subscribe_delta(&thing_name).await {
                Ok(()) => connection.subscribe_updated(&thing_name).await,
                Err(e) => Err(e),
            }
        };
        if let Err(e) = registered {
            let _ = connection.disconnect().await;
            return Err(SetupError::CallbackRegistration(e));
        }

        if engine.config.clear_shadow_on_connect {
            match connection
                .delete_shadow(&thing_name, engine.operation_timeout())
                .await
            {
                Ok(()) => tracing::info!(device = %thing_name, "cleared shadow document"),
                Err(e) => tracing::warn!(error = %e, "failed to clear shadow document"),
            }
        }
    }

    // Fresh synchronization tokens for this cycle.
    let session = Arc::new(Session::new(
        engine.identity.clone(),
        connection.clone(),
        engine.lock_timeout(),
        engine.operation_timeout(),
    ));
    engine.set_connection(Some(connection.clone())).await;

    let pump = tokio::spawn(pump_events(session.clone(), events));
    let driver = engine.config.reconcile.then(|| {
        tokio::spawn(convergence::run(
            session.clone(),
            engine.convergence_period(),
        ))
    });

    engine.open_ready_latch();
    tracing::info!(device = %thing_name, "session ready");

    if engine.config.reconcile {
        if let Err(e) = synchronizer::report_state(&session).await {
            tracing::warn!(error = %e, "initial shadow report failed");
        }
    }

    // Idle until something ends the session.
    if !engine.shutdown_requested() {
        tokio::select! {
            () = session.torn_down() => {
                tracing::info!("session teardown requested");
            }
            () = engine.shutdown_signal() => {
                tracing::info!("engine shutdown requested");
            }
        }
    }

    // Cleanup: close the latch first so new callers block for the next
    // cycle, then retire the tasks and the connection.
    engine.close_ready_latch();
    engine.set_connection(None).await;
    pump.abort();
    if let Some(driver) = driver {
        driver.abort();
    }
    if let Err(e) = connection.disconnect().await {
        tracing::warn!(error = %e, "disconnect failed");
    }
    tracing::info!(device = %thing_name, "session cleaned up");
    Ok(())
}

/// Consume inbound transport events in arrival order.
async fn pump_events(session: Arc<Session>, mut events: mpsc::Receiver<TransportEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            TransportEvent::Delta(payload) => {
                reconciler::on_delta(&session, &payload).await;
            }
            TransportEvent::Updated(payload) => {
                reconciler::on_updated(&payload);
            }
            TransportEvent::ConnectionLost(reason) => {
                tracing::warn!(reason = %reason, "connection lost notification");
                session.mark_lost();
                return;
            }
        }
    }
    // Event channel closed without a loss notice: same outcome.
    session.mark_lost();
}

fn connect_options(engine: &Engine) -> ConnectOptions {
    let client_id = engine
        .config
        .mqtt
        .client_id
        .clone()
        .unwrap_or_else(|| engine.identity.client_id());

    ConnectOptions {
        client_id,
        keep_alive: Duration::from_secs(engine.config.mqtt.keepalive_secs.into()),
        clean_session: true,
        will: Some(WillMessage {
            topic: topics::last_will(engine.identity.hex()),
            payload: LAST_WILL_PAYLOAD.to_vec(),
        }),
    }
}
