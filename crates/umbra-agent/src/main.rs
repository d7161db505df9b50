//! Umbra agent binary — device-shadow synchronization for one device.
//!
//! Wires the MQTT transport and the shadow engine into a single process
//! that runs until a shutdown signal arrives.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use umbra_agent::config::AgentConfig;
use umbra_agent::engine::Engine;
use umbra_protocol::DeviceIdentity;
use umbra_transport::MqttTransport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "umbra-agent starting");

    // ── Load config ─────────────────────────────────────────────
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/etc/umbra/agent.toml".to_string());

    let config = AgentConfig::from_file(&config_path)?;
    let identity = DeviceIdentity::from_hex(&config.device_id)?;
    tracing::info!(
        device = %identity,
        broker = %config.mqtt.broker_host,
        reconcile = config.reconcile,
        "config loaded"
    );

    // ── Transport + engine ──────────────────────────────────────
    let transport = Arc::new(MqttTransport::new(config.mqtt.clone()));
    let mut handle = Engine::start(identity, config, transport);

    tracing::info!("umbra-agent ready");

    tokio::select! {
        // Supervisor exit: one-shot session finished or fatal setup failure.
        result = handle.join() => {
            result?;
            tracing::info!("umbra-agent stopped");
            return Ok(());
        }
        // Graceful shutdown on SIGINT/SIGTERM.
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    handle.request_shutdown();
    handle.join().await?;

    tracing::info!("umbra-agent stopped");
    Ok(())
}
