//! Event types for the live feed
//!
//! An [`Event`] is the locally built, typed form of one frame received over the
//! session connection. The wire shapes ([`InboundFrame`], [`OutboundFrame`]) are
//! the `{ type?, data }` objects exchanged with the notification hub.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Kind assigned to frames that carry no `type` field
pub const DEFAULT_EVENT_KIND: &str = "event";

/// Process-unique identifier assigned when a frame is received
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A decoded server-pushed event.
///
/// Fields are private: once built an event is never mutated, subscribers only
/// ever see it by reference and the history keeps its own clone. Events are
/// only built locally, so they serialize for display but never deserialize.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    id: EventId,
    kind: String,
    received_at: DateTime<Utc>,
    payload: Value,
}

impl Event {
    /// Build an event stamped with a new id and the current time
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            id: EventId::generate(),
            kind: kind.into(),
            received_at: Utc::now(),
            payload,
        }
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

/// Body of a frame pushed by the hub.
///
/// The hub names the kind field `type`; `kind` is accepted as well. Unknown
/// fields (`channel`, `sequence_id`, ...) are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundFrame {
    #[serde(default, rename = "type", alias = "kind")]
    pub kind: Option<String>,

    #[serde(default)]
    pub data: Value,
}

impl InboundFrame {
    /// Convert into an [`Event`], defaulting a missing or blank kind
    pub fn into_event(self) -> Event {
        let kind = self
            .kind
            .filter(|k| !k.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_EVENT_KIND.to_string());
        Event::new(kind, self.data)
    }
}

/// Frame sent from the client over the session connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundFrame {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    pub data: Value,
}

impl OutboundFrame {
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: Some(kind.into()),
            data,
        }
    }

    /// Frame without a kind; receivers will see it as [`DEFAULT_EVENT_KIND`]
    pub fn untyped(data: Value) -> Self {
        Self { kind: None, data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_serializes_with_generated_id() {
        let event = Event::new("todo.created", json!({"id": 7}));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["id"], json!(event.id().to_string()));
        assert_eq!(value["kind"], "todo.created");
        assert_eq!(value["payload"]["id"], 7);
        assert!(value["received_at"].is_string());
    }

    #[test]
    fn test_event_ids_are_unique() {
        let a = Event::new("todo.created", json!({}));
        let b = Event::new("todo.created", json!({}));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_inbound_frame_reads_type_field() {
        let frame: InboundFrame =
            serde_json::from_str(r#"{"type":"todo.updated","data":{"id":7},"channel":"default"}"#)
                .unwrap();
        let event = frame.into_event();
        assert_eq!(event.kind(), "todo.updated");
        assert_eq!(event.payload(), &json!({"id": 7}));
    }

    #[test]
    fn test_inbound_frame_accepts_kind_alias() {
        let frame: InboundFrame = serde_json::from_str(r#"{"kind":"ping","data":1}"#).unwrap();
        assert_eq!(frame.into_event().kind(), "ping");
    }

    #[test]
    fn test_missing_or_blank_kind_defaults() {
        let frame: InboundFrame = serde_json::from_str(r#"{"data":{"message":"hi"}}"#).unwrap();
        assert_eq!(frame.into_event().kind(), DEFAULT_EVENT_KIND);

        let frame: InboundFrame = serde_json::from_str(r#"{"type":"  ","data":null}"#).unwrap();
        assert_eq!(frame.into_event().kind(), DEFAULT_EVENT_KIND);
    }

    #[test]
    fn test_missing_data_is_null() {
        let frame: InboundFrame = serde_json::from_str(r#"{"type":"bare"}"#).unwrap();
        assert_eq!(frame.into_event().payload(), &Value::Null);
    }

    #[test]
    fn test_outbound_frame_serialization() {
        let json = serde_json::to_string(&OutboundFrame::new("chat", json!({"text": "hey"}))).unwrap();
        assert!(json.contains(r#""type":"chat""#));

        let json = serde_json::to_string(&OutboundFrame::untyped(json!(1))).unwrap();
        assert!(!json.contains("type"));
    }
}
