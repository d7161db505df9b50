//! Shadow wire documents: outbound reports, inbound deltas and
//! update notifications, and fire-and-forget event payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::identity::DeviceIdentity;
use crate::state::ShadowState;

/// Errors from parsing inbound shadow documents.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no \"state\" object in document")]
    MissingState,

    #[error("no \"{0}\" section in updated document")]
    MissingSection(&'static str),
}

// ── Outbound report ───────────────────────────────────────────

/// A shadow state report, serialized to the fixed wire shape:
///
/// ```text
/// {"state":{"reported":{"powerOn":<0|1>,"temperature":<int>}},"clientToken":"<token>"}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDocument {
    pub state: ReportState,
    #[serde(rename = "clientToken")]
    pub client_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportState {
    pub reported: ReportedFields,
}

/// `powerOn` travels as 0/1, matching the shadow service's documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportedFields {
    #[serde(rename = "powerOn")]
    pub power_on: u8,
    pub temperature: i8,
}

impl ReportDocument {
    pub fn new(reported: ShadowState, client_token: String) -> Self {
        Self {
            state: ReportState {
                reported: ReportedFields {
                    power_on: u8::from(reported.power_on),
                    temperature: reported.temperature,
                },
            },
            client_token,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Generate a client token for a report.
///
/// Six-digit truncated epoch milliseconds: unique per call, safely
/// reusable across sessions. Used for correlation only, not dedup.
pub fn client_token() -> String {
    format!("{:06}", chrono::Utc::now().timestamp_millis() % 1_000_000)
}

// ── Inbound delta ─────────────────────────────────────────────

/// Fields extracted from a shadow delta document.
///
/// Only `powerOn` and `temperature` are inspected; a present-but-mistyped
/// field is treated as absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeltaFields {
    pub power_on: Option<bool>,
    pub temperature: Option<i8>,
}

impl DeltaFields {
    /// Parse a delta document, locating the `state` object at any
    /// nesting below the root (the transport may wrap it).
    pub fn parse(payload: &[u8]) -> Result<Self, DocumentError> {
        let doc: Value = serde_json::from_slice(payload)?;
        let state = find_value(&doc, "state").ok_or(DocumentError::MissingState)?;

        Ok(Self {
            power_on: find_value(state, "powerOn").and_then(as_power_flag),
            temperature: find_value(state, "temperature").and_then(as_temperature),
        })
    }
}

/// Accept both boolean and 0/1 numeric renderings of the power flag.
fn as_power_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|v| v != 0),
        _ => None,
    }
}

fn as_temperature(value: &Value) -> Option<i8> {
    value.as_i64().and_then(|v| i8::try_from(v).ok())
}

/// Depth-first search for `key` within nested JSON objects.
fn find_value<'a>(doc: &'a Value, key: &str) -> Option<&'a Value> {
    let obj = doc.as_object()?;
    if let Some(v) = obj.get(key) {
        return Some(v);
    }
    obj.values().find_map(|v| find_value(v, key))
}

// ── Inbound update notification ───────────────────────────────

/// The `previous.state`/`current.state` sections of a shadow updated
/// document, extracted for logging.
#[derive(Debug, Clone)]
pub struct UpdatedDocument {
    pub previous: Value,
    pub current: Value,
}

impl UpdatedDocument {
    pub fn parse(payload: &[u8]) -> Result<Self, DocumentError> {
        let doc: Value = serde_json::from_slice(payload)?;
        let section_state = |name: &'static str| {
            doc.get(name)
                .and_then(|s| find_value(s, "state"))
                .cloned()
                .ok_or(DocumentError::MissingSection(name))
        };
        Ok(Self {
            previous: section_state("previous")?,
            current: section_state("current")?,
        })
    }
}

// ── Outbound events ───────────────────────────────────────────

/// Kind of a fire-and-forget application event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Click,
    Hold,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Click => "SINGLE",
            Self::Hold => "HOLD",
        }
    }
}

/// Event payload: `{"serialNumber":"<hex>","clickType":"SINGLE"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDocument {
    #[serde(rename = "serialNumber")]
    pub serial_number: String,
    #[serde(rename = "clickType")]
    pub click_type: String,
}

impl EventDocument {
    pub fn new(identity: &DeviceIdentity, kind: EventKind) -> Self {
        Self {
            serial_number: identity.hex().to_string(),
            click_type: kind.as_str().to_string(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn report_document_wire_shape() {
        let doc = ReportDocument::new(
            ShadowState {
                power_on: true,
                temperature: 35,
            },
            "012345".into(),
        );
        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(
            json,
            r#"{"state":{"reported":{"powerOn":1,"temperature":35}},"clientToken":"012345"}"#
        );
    }

    #[test]
    fn report_power_off_serializes_as_zero() {
        let doc = ReportDocument::new(ShadowState::idle(), "000001".into());
        let value: Value = serde_json::from_slice(&doc.to_bytes().unwrap()).unwrap();
        assert_eq!(value["state"]["reported"]["powerOn"], 0);
        assert_eq!(value["state"]["reported"]["temperature"], 35);
    }

    #[test]
    fn client_token_is_six_digits() {
        let token = client_token();
        assert_eq!(token.len(), 6);
        assert!(token.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn delta_with_both_fields() {
        let payload = serde_json::to_vec(&json!({
            "state": {"powerOn": 1, "temperature": 20}
        }))
        .unwrap();
        let delta = DeltaFields::parse(&payload).unwrap();
        assert_eq!(delta.power_on, Some(true));
        assert_eq!(delta.temperature, Some(20));
    }

    #[test]
    fn delta_accepts_boolean_power() {
        let payload = serde_json::to_vec(&json!({"state": {"powerOn": false}})).unwrap();
        let delta = DeltaFields::parse(&payload).unwrap();
        assert_eq!(delta.power_on, Some(false));
        assert_eq!(delta.temperature, None);
    }

    #[test]
    fn delta_state_found_at_deeper_nesting() {
        let payload = serde_json::to_vec(&json!({
            "payload": {"state": {"temperature": 22}}
        }))
        .unwrap();
        let delta = DeltaFields::parse(&payload).unwrap();
        assert_eq!(delta.temperature, Some(22));
    }

    #[test]
    fn delta_missing_state_is_error() {
        let payload = serde_json::to_vec(&json!({"powerOn": 1})).unwrap();
        assert!(matches!(
            DeltaFields::parse(&payload),
            Err(DocumentError::MissingState)
        ));
    }

    #[test]
    fn delta_malformed_json_is_error() {
        assert!(matches!(
            DeltaFields::parse(b"not-json"),
            Err(DocumentError::Json(_))
        ));
    }

    #[test]
    fn delta_mistyped_fields_treated_as_absent() {
        let payload = serde_json::to_vec(&json!({
            "state": {"powerOn": "yes", "temperature": 1000}
        }))
        .unwrap();
        let delta = DeltaFields::parse(&payload).unwrap();
        assert_eq!(delta.power_on, None);
        assert_eq!(delta.temperature, None);
    }

    #[test]
    fn updated_document_extracts_sections() {
        let payload = serde_json::to_vec(&json!({
            "previous": {"state": {"reported": {"powerOn": 0}}},
            "current": {"state": {"reported": {"powerOn": 1}}},
        }))
        .unwrap();
        let updated = UpdatedDocument::parse(&payload).unwrap();
        assert_eq!(updated.previous["reported"]["powerOn"], 0);
        assert_eq!(updated.current["reported"]["powerOn"], 1);
    }

    #[test]
    fn updated_document_missing_section() {
        let payload = serde_json::to_vec(&json!({
            "current": {"state": {}}
        }))
        .unwrap();
        assert!(matches!(
            UpdatedDocument::parse(&payload),
            Err(DocumentError::MissingSection("previous"))
        ));
    }

    #[test]
    fn event_document_shape() {
        let identity = DeviceIdentity::from_bytes([0xa4, 0xcf, 0x12, 0x05, 0x7f, 0x30]);
        let doc = EventDocument::new(&identity, EventKind::Click);
        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(
            json,
            r#"{"serialNumber":"a4cf12057f30","clickType":"SINGLE"}"#
        );
    }

    #[test]
    fn event_hold_kind() {
        let identity = DeviceIdentity::from_bytes([0x01]);
        let doc = EventDocument::new(&identity, EventKind::Hold);
        assert_eq!(doc.click_type, "HOLD");
    }
}
