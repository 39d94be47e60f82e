//! WebSocket Message Types
//!
//! Inbound frames are `{"event": "<name>", "data": {...}, "id": <optional>}`.
//! Outbound frames are [`ServerEvent`](crate::domain::ServerEvent).

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use validator::Validate;

use crate::domain::{ChannelId, ParticipantId, RoomId};
use crate::shared::error::SignalError;
use crate::shared::validation::malformed_event;

pub const JOIN_ROOM: &str = "join_room";
pub const SEND_MESSAGE: &str = "send_message";
pub const TYPING: &str = "typing";
pub const JOIN_CALL: &str = "join_call";
pub const CALL_SIGNAL: &str = "call_signal";

/// Incoming frame envelope
#[derive(Debug, Deserialize)]
pub struct ClientFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
    /// Acknowledgment id, echoed back in the `ack` event
    #[serde(default)]
    pub id: Option<u64>,
}

/// `join_room`
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomPayload {
    #[serde(default, deserialize_with = "identifier")]
    #[validate(length(min = 1, message = "roomId is required"))]
    pub room_id: RoomId,
}

/// `send_message`: every field besides `roomId` is relayed untouched.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    #[serde(default, deserialize_with = "identifier")]
    #[validate(length(min = 1, message = "roomId is required"))]
    pub room_id: RoomId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// `typing`
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    #[serde(default, deserialize_with = "identifier")]
    #[validate(length(min = 1, message = "roomId is required"))]
    pub room_id: RoomId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// `join_call`
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JoinCallPayload {
    #[serde(default, deserialize_with = "identifier")]
    #[validate(length(min = 1, message = "channelId is required"))]
    pub channel_id: ChannelId,
    #[serde(default, deserialize_with = "identifier")]
    #[validate(length(min = 1, message = "userId is required"))]
    pub user_id: ParticipantId,
}

/// `call_signal`: `payload` is opaque.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CallSignalPayload {
    #[serde(default, deserialize_with = "identifier")]
    #[validate(length(min = 1, message = "channelId is required"))]
    pub channel_id: ChannelId,
    #[serde(default, deserialize_with = "identifier")]
    #[validate(length(min = 1, message = "targetId is required"))]
    pub target_id: ParticipantId,
    #[serde(rename = "type", default)]
    #[validate(length(min = 1, message = "type is required"))]
    pub signal_type: String,
    #[serde(default)]
    pub payload: Value,
}

/// A parsed and validated inbound event.
#[derive(Debug)]
pub enum ClientEvent {
    JoinRoom(JoinRoomPayload),
    SendMessage(SendMessagePayload),
    Typing(TypingPayload),
    JoinCall(JoinCallPayload),
    CallSignal(CallSignalPayload),
}

impl ClientEvent {
    pub fn parse(event: &str, data: Value) -> Result<Self, SignalError> {
        let data = match data {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };

        match event {
            JOIN_ROOM => payload(event, data).map(ClientEvent::JoinRoom),
            SEND_MESSAGE => payload(event, data).map(ClientEvent::SendMessage),
            TYPING => payload(event, data).map(ClientEvent::Typing),
            JOIN_CALL => payload(event, data).map(ClientEvent::JoinCall),
            CALL_SIGNAL => payload(event, data).map(ClientEvent::CallSignal),
            other => Err(SignalError::MalformedEvent(format!("Unknown event: {other}"))),
        }
    }
}

fn payload<T>(event: &str, data: Value) -> Result<T, SignalError>
where
    T: for<'de> Deserialize<'de> + Validate,
{
    let parsed: T = serde_json::from_value(data)
        .map_err(|e| SignalError::MalformedEvent(format!("Invalid {event} payload: {e}")))?;
    parsed.validate().map_err(malformed_event)?;
    Ok(parsed)
}

/// Room, channel and participant ids may arrive as strings or numbers.
fn identifier<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn test_frame_defaults() {
        let frame: ClientFrame = serde_json::from_str(r#"{"event":"typing"}"#).unwrap();
        assert_eq!(frame.event, "typing");
        assert_eq!(frame.data, Value::Null);
        assert_eq!(frame.id, None);
    }

    #[test]
    fn test_send_message_keeps_extra_fields() {
        let event = ClientEvent::parse(
            SEND_MESSAGE,
            json!({"roomId": "r1", "text": "hi", "attachments": [1, 2]}),
        )
        .unwrap();

        let ClientEvent::SendMessage(payload) = event else {
            panic!("expected send_message");
        };
        assert_eq!(payload.room_id, "r1");
        assert_eq!(payload.fields.get("text"), Some(&json!("hi")));
        assert_eq!(payload.fields.get("attachments"), Some(&json!([1, 2])));
        assert!(!payload.fields.contains_key("roomId"));
    }

    #[test]
    fn test_numeric_ids_are_accepted() {
        let event = ClientEvent::parse(JOIN_CALL, json!({"channelId": 7, "userId": 42})).unwrap();
        let ClientEvent::JoinCall(payload) = event else {
            panic!("expected join_call");
        };
        assert_eq!(payload.channel_id, "7");
        assert_eq!(payload.user_id, "42");
    }

    #[test]
    fn test_call_signal_payload_is_opaque() {
        let event = ClientEvent::parse(
            CALL_SIGNAL,
            json!({
                "channelId": "c1",
                "targetId": "u2",
                "type": "offer",
                "payload": {"sdp": "v=0", "nested": {"x": [true]}}
            }),
        )
        .unwrap();
        let ClientEvent::CallSignal(payload) = event else {
            panic!("expected call_signal");
        };
        assert_eq!(payload.signal_type, "offer");
        assert_eq!(payload.payload, json!({"sdp": "v=0", "nested": {"x": [true]}}));
    }

    #[test_case(JOIN_ROOM, json!({}), "roomId is required" ; "join_room without room")]
    #[test_case(JOIN_ROOM, Value::Null, "roomId is required" ; "join_room null data")]
    #[test_case(SEND_MESSAGE, json!({"text": "hi"}), "roomId is required" ; "send_message without room")]
    #[test_case(TYPING, json!({"roomId": ""}), "roomId is required" ; "typing empty room")]
    #[test_case(JOIN_CALL, json!({"channelId": "c1"}), "userId is required" ; "join_call without user")]
    #[test_case(CALL_SIGNAL, json!({"channelId": "c1", "type": "offer"}), "targetId is required" ; "call_signal without target")]
    fn test_missing_fields_are_malformed(event: &str, data: Value, expected: &str) {
        let err = ClientEvent::parse(event, data).unwrap_err();
        assert_eq!(err, SignalError::MalformedEvent(expected.into()));
    }

    #[test_case(JOIN_ROOM, json!("r1") ; "string data")]
    #[test_case(JOIN_ROOM, json!({"roomId": {"nested": true}}) ; "object id")]
    #[test_case(CALL_SIGNAL, json!([1, 2]) ; "array data")]
    fn test_wrong_shapes_are_malformed(event: &str, data: Value) {
        assert!(matches!(
            ClientEvent::parse(event, data),
            Err(SignalError::MalformedEvent(_))
        ));
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        assert_eq!(
            ClientEvent::parse("leave_everything", json!({})).unwrap_err(),
            SignalError::MalformedEvent("Unknown event: leave_everything".into())
        );
    }
}
