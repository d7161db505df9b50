//! Agent configuration, loadable from TOML.

use serde::Deserialize;

use umbra_transport::MqttConfig;

/// Top-level configuration for the shadow agent.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Device identity as lowercase hex (hardware-derived upstream).
    pub device_id: String,
    /// MQTT connection settings.
    pub mqtt: MqttConfig,
    /// Reconnect forever (true) or run a single session (false).
    #[serde(default = "default_true")]
    pub continuous: bool,
    /// Enable shadow reconciliation: delta handling, convergence, and
    /// state reports. When false, the session only serves event
    /// publishing.
    #[serde(default = "default_true")]
    pub reconcile: bool,
    /// Delete the cloud shadow document when a session starts.
    #[serde(default)]
    pub clear_shadow_on_connect: bool,
    /// Convergence tick period in seconds.
    #[serde(default = "default_convergence_interval")]
    pub convergence_interval_secs: u64,
    /// Bounded wait for the report lock, in seconds.
    #[serde(default = "default_timeout")]
    pub lock_timeout_secs: u64,
    /// Timeout for shadow update/delete operations, in seconds.
    #[serde(default = "default_timeout")]
    pub operation_timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_convergence_interval() -> u64 {
    10
}

fn default_timeout() -> u64 {
    5
}

impl AgentConfig {
    /// Load config from a TOML file path.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }
}
