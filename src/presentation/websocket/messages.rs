//! Realtime Wire Messages
//!
//! JSON envelope exchanged over room sockets. Inbound frames carry only
//! the message body; outbound frames are tagged with a `type` field the
//! client switches on.

use serde::{Deserialize, Serialize};

use crate::domain::Message;

/// Inbound frame from a client: the message body to post to the room.
#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    pub content: String,
}

/// Outbound frame to clients in a room.
///
/// Serializes as `{"type": "chat", ...message fields}` for chat messages
/// and `{"type": "onlineUser", "count": n}` for presence updates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum WireMessage {
    /// A persisted chat message with its store-assigned id and timestamps
    #[serde(rename = "chat")]
    Chat(Message),

    /// Presence update: distinct users currently connected to the room
    #[serde(rename = "onlineUser")]
    OnlineUser { count: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_chat_frame_shape() {
        let message = Message {
            id: 42,
            room_name: "general".into(),
            user_id: 7,
            username: "alice".into(),
            content: "hi".into(),
            file: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let value = serde_json::to_value(WireMessage::Chat(message)).unwrap();

        assert_eq!(value["type"], "chat");
        assert_eq!(value["id"], 42);
        assert_eq!(value["userId"], 7);
        assert_eq!(value["username"], "alice");
        assert_eq!(value["roomName"], "general");
        assert_eq!(value["content"], "hi");
        // Absent attachments are omitted entirely, not sent as null.
        assert!(value.get("file").is_none());
        assert!(value.get("created_at").is_some());
        assert!(value.get("updated_at").is_some());
    }

    #[test]
    fn test_presence_frame_shape() {
        let value = serde_json::to_value(WireMessage::OnlineUser { count: 3 }).unwrap();
        assert_eq!(value, serde_json::json!({"type": "onlineUser", "count": 3}));
    }

    #[test]
    fn test_inbound_frame_ignores_extra_fields() {
        let inbound: InboundMessage =
            serde_json::from_str(r#"{"content": "hi", "type": "chat"}"#).unwrap();
        assert_eq!(inbound.content, "hi");
    }
}
