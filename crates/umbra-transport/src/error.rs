//! Transport error types.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect error: {0}")]
    Connect(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("publish error: {0}")]
    Publish(String),

    #[error("subscribe error: {0}")]
    Subscribe(String),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl TransportError {
    /// Whether this error is presumptive evidence the connection is dead.
    ///
    /// Timeouts and validation-class failures are not: the session may
    /// still be healthy.
    pub fn is_connection_level(&self) -> bool {
        matches!(self, Self::Connect(_) | Self::Connection(_))
    }
}

/// Convenience alias for transport results.
pub type TransportResult<T> = Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_level_classification() {
        assert!(TransportError::Connect("refused".into()).is_connection_level());
        assert!(TransportError::Connection("reset".into()).is_connection_level());
        assert!(!TransportError::Timeout(Duration::from_secs(5)).is_connection_level());
        assert!(!TransportError::Publish("queue full".into()).is_connection_level());
        assert!(!TransportError::Serialization("bad utf8".into()).is_connection_level());
    }
}
