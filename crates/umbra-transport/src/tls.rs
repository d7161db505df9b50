//! TLS configuration for mTLS connections to the shadow service.
//!
//! Loads X.509 device certificate, private key, and CA certificate
//! from PEM files and configures rumqttc's TLS transport.

use rumqttc::Transport;

use crate::config::MqttConfig;
use crate::error::{TransportError, TransportResult};

/// Build a TLS transport from certificate file paths in the config.
///
/// Uses `TlsConfiguration::Simple` which reads PEM-encoded files:
/// - CA certificate
/// - Device certificate (X.509)
/// - Device private key
pub fn load_tls_transport(config: &MqttConfig) -> TransportResult<Transport> {
    let ca = std::fs::read(&config.ca_cert_path).map_err(|e| {
        TransportError::Tls(format!(
            "failed to read CA cert '{}': {e}",
            config.ca_cert_path
        ))
    })?;

    let client_cert = std::fs::read(&config.client_cert_path).map_err(|e| {
        TransportError::Tls(format!(
            "failed to read client cert '{}': {e}",
            config.client_cert_path
        ))
    })?;

    let client_key = std::fs::read(&config.client_key_path).map_err(|e| {
        TransportError::Tls(format!(
            "failed to read client key '{}': {e}",
            config.client_key_path
        ))
    })?;

    Ok(Transport::tls_with_config(
        rumqttc::TlsConfiguration::Simple {
            ca,
            alpn: None,
            client_auth: Some((client_cert, client_key)),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_paths(ca: &str, cert: &str, key: &str) -> MqttConfig {
        MqttConfig {
            broker_host: "localhost".into(),
            broker_port: 8883,
            client_id: None,
            use_tls: true,
            client_cert_path: cert.into(),
            client_key_path: key.into(),
            ca_cert_path: ca.into(),
            keepalive_secs: 60,
            connect_timeout_secs: 5,
        }
    }

    #[test]
    fn missing_ca_cert_returns_error() {
        let config = config_with_paths(
            "/nonexistent/ca.pem",
            "/nonexistent/cert.pem",
            "/nonexistent/key.pem",
        );
        let err = load_tls_transport(&config).err().expect("should fail");
        let msg = err.to_string();
        assert!(
            msg.contains("CA cert"),
            "error should mention CA cert: {msg}"
        );
    }
}
