//! Device identity derived from an opaque hardware byte sequence.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix for generated MQTT client identifiers.
const CLIENT_ID_PREFIX: &str = "umbra-";

/// The longest client identifier an MQTT 3.1.1 server must accept.
const CLIENT_ID_MAX_LENGTH: usize = 23;

/// Errors from constructing a [`DeviceIdentity`].
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity hex string has odd length: {0}")]
    OddLength(usize),

    #[error("identity hex string contains non-hex character '{0}'")]
    InvalidCharacter(char),
}

/// Opaque device identity plus its lowercase-hex rendering.
///
/// The byte sequence is hardware-derived (e.g. a burned-in MAC address)
/// and immutable after construction. The hex rendering is used as the
/// MQTT client-ID suffix, topic component, and shadow thing name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceIdentity {
    bytes: Vec<u8>,
    hex: String,
}

impl DeviceIdentity {
    /// Build an identity from raw bytes. The hex rendering is always
    /// exactly twice the byte length.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        let hex = bytes.iter().map(|b| format!("{b:02x}")).collect();
        Self { bytes, hex }
    }

    /// Build an identity from a hex string, normalizing to lowercase.
    pub fn from_hex(hex: &str) -> Result<Self, IdentityError> {
        if hex.len() % 2 != 0 {
            return Err(IdentityError::OddLength(hex.len()));
        }
        if let Some(bad) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(IdentityError::InvalidCharacter(bad));
        }
        let bytes = (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).unwrap_or_default())
            .collect();
        Ok(Self {
            bytes,
            hex: hex.to_ascii_lowercase(),
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Lowercase-hex rendering, used as the thing name and topic segment.
    pub fn hex(&self) -> &str {
        &self.hex
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Default MQTT client identifier for this device, truncated to the
    /// 23 characters an MQTT 3.1.1 server must accept.
    pub fn client_id(&self) -> String {
        let mut id = format!("{CLIENT_ID_PREFIX}{}", self.hex);
        id.truncate(CLIENT_ID_MAX_LENGTH);
        id
    }
}

impl std::fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hex)
    }
}
