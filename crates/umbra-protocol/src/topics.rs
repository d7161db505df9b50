//! MQTT topic builders and parsers for the per-device topic hierarchy.
//!
//! Topic structure:
//! ```text
//! umbra/{device_id}/shadow/update
//! umbra/{device_id}/shadow/delta
//! umbra/{device_id}/shadow/documents
//! umbra/{device_id}/shadow/delete
//! umbra/{device_id}/events/notify
//! umbra/{device_id}/lwt
//! ```

const PREFIX: &str = "umbra";

// ─── Shadow topics ───

pub fn shadow_update(device_id: &str) -> String {
    format!("{PREFIX}/{device_id}/shadow/update")
}

pub fn shadow_delta(device_id: &str) -> String {
    format!("{PREFIX}/{device_id}/shadow/delta")
}

/// Full-document change notifications (previous/current sections).
pub fn shadow_documents(device_id: &str) -> String {
    format!("{PREFIX}/{device_id}/shadow/documents")
}

pub fn shadow_delete(device_id: &str) -> String {
    format!("{PREFIX}/{device_id}/shadow/delete")
}

// ─── Events & last will ───

pub fn event_notify(device_id: &str) -> String {
    format!("{PREFIX}/{device_id}/events/notify")
}

/// Topic the broker publishes to on behalf of a client that disconnects
/// without a clean shutdown.
pub fn last_will(device_id: &str) -> String {
    format!("{PREFIX}/{device_id}/lwt")
}

// ─── Subscription patterns (with MQTT wildcards) ───

/// Subscribe to all shadow traffic for a specific device.
pub fn device_shadow_all(device_id: &str) -> String {
    format!("{PREFIX}/{device_id}/shadow/#")
}

/// Subscribe to every device's last-will notices.
pub fn all_last_wills() -> String {
    format!("{PREFIX}/+/lwt")
}

// ─── Topic parsing ───

/// Parsed MQTT topic components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTopic {
    pub device_id: String,
    pub category: String,
    pub action: Option<String>,
}

/// Parse a topic string into its components.
/// Returns `None` if the topic doesn't match the expected format.
pub fn parse_topic(topic: &str) -> Option<ParsedTopic> {
    let parts: Vec<&str> = topic.split('/').collect();

    if parts.first() != Some(&PREFIX) || parts.len() < 3 {
        return None;
    }

    Some(ParsedTopic {
        device_id: parts[1].to_string(),
        category: parts[2].to_string(),
        action: parts.get(3).map(|s| s.to_string()),
    })
}
