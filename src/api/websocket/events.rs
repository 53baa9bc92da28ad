//! Wire messages pushed by the hub

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of the event produced by the test-notification endpoint
pub const WEBHOOK_NOTIFICATION: &str = "webhook.notification";

/// Channel every connection joins
pub const DEFAULT_CHANNEL: &str = "default";

/// Message pushed to a user's websocket connections
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PushMessage {
    /// Event kind, read by clients as the event type
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    pub data: Value,

    pub channel: String,

    /// Monotonically increasing sequence ID for gap detection
    pub sequence_id: u64,

    /// Unix timestamp when the message was created
    pub timestamp: i64,
}

/// Frame received from a client; echoed to the user's connections
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientFrame {
    #[serde(default, rename = "type", alias = "kind")]
    pub kind: Option<String>,

    #[serde(default)]
    pub data: Value,
}

impl PushMessage {
    /// Error notice sent to a connection that fell behind its channel
    pub fn lagged(missed: u64, sequence_id: u64) -> Self {
        Self {
            kind: Some("error".to_string()),
            data: serde_json::json!({
                "code": "lagged",
                "message": format!("Missed {} events, please refresh", missed),
            }),
            channel: DEFAULT_CHANNEL.to_string(),
            sequence_id,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}
