//! Broadcaster
//!
//! Fan-out delivery of one wire frame to the connections of a room. The
//! frame is serialized once; the room's connection set is snapshotted
//! under the registry lock and written to outside of it, through each
//! connection's outbound channel, so a slow peer never stalls a publisher.
//!
//! A failed write is logged and skipped, never aborting the rest of the
//! fan-out, and the dead connection's owning read loop is signalled to
//! close so both removal paths converge on the loop's own Leave.

use std::sync::Arc;

use axum::extract::ws::Message as WsMessage;

use super::messages::WireMessage;
use super::registry::{ConnectionId, ConnectionRegistry};
use crate::infrastructure::metrics;

/// Delivers wire frames to the live connections of a room.
pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Deliver a frame to every connection in `room` except `exclude`.
    /// Pass `None` to include all connections (server-originated events
    /// such as presence updates or file-upload notifications).
    ///
    /// Delivery across concurrent publishers is unordered; frames
    /// published sequentially by one task arrive in publish order.
    pub fn publish(&self, room: &str, exclude: Option<ConnectionId>, frame: &WireMessage) {
        let text = match serde_json::to_string(frame) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(room = %room, error = %e, "Failed to serialize frame");
                return;
            }
        };

        for connection in self.registry.snapshot(room) {
            if exclude == Some(connection.id()) {
                continue;
            }

            if connection.send(WsMessage::Text(text.clone().into())).is_err() {
                tracing::warn!(
                    room = %room,
                    username = %connection.username(),
                    "Failed to queue frame, closing connection"
                );
                metrics::BROADCAST_FAILURES_TOTAL.inc();
                // Removal stays with the owning read loop; we only wake it.
                connection.close();
            } else {
                metrics::BROADCAST_DELIVERIES_TOTAL.inc();
            }
        }
    }

    /// Broadcast the room's current presence count to everyone in it.
    pub fn announce_presence(&self, room: &str) {
        let count = self.registry.presence_count(room);
        self.publish(room, None, &WireMessage::OnlineUser { count });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Message;
    use crate::presentation::websocket::registry::ConnectionHandle;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn chat(content: &str) -> WireMessage {
        WireMessage::Chat(Message {
            id: 1,
            room_name: "general".into(),
            user_id: 7,
            username: "alice".into(),
            content: content.into(),
            file: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    }

    fn recv_text(receiver: &mut UnboundedReceiver<WsMessage>) -> Option<String> {
        match receiver.try_recv() {
            Ok(WsMessage::Text(text)) => Some(text.to_string()),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_publish_excludes_sender() {
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster = Broadcaster::new(registry.clone());

        let (alice, mut alice_rx) = ConnectionHandle::new("alice");
        let (bob, mut bob_rx) = ConnectionHandle::new("bob");
        registry.join("general", alice.clone());
        registry.join("general", bob.clone());

        broadcaster.publish("general", Some(alice.id()), &chat("hi"));

        // Bob receives the chat frame; Alice receives nothing.
        let frame = recv_text(&mut bob_rx).expect("bob should receive the frame");
        assert!(frame.contains("\"type\":\"chat\""));
        assert!(frame.contains("\"content\":\"hi\""));
        assert!(recv_text(&mut alice_rx).is_none());
    }

    #[tokio::test]
    async fn test_publish_without_exclusion_reaches_everyone() {
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster = Broadcaster::new(registry.clone());

        let (alice, mut alice_rx) = ConnectionHandle::new("alice");
        let (bob, mut bob_rx) = ConnectionHandle::new("bob");
        registry.join("general", alice);
        registry.join("general", bob);

        broadcaster.announce_presence("general");

        for rx in [&mut alice_rx, &mut bob_rx] {
            let frame = recv_text(rx).expect("presence frame");
            assert!(frame.contains("\"type\":\"onlineUser\""));
            assert!(frame.contains("\"count\":2"));
        }
    }

    #[tokio::test]
    async fn test_dead_connection_does_not_abort_broadcast() {
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster = Broadcaster::new(registry.clone());

        let (dead, dead_rx) = ConnectionHandle::new("alice");
        let (live, mut live_rx) = ConnectionHandle::new("bob");
        registry.join("general", dead.clone());
        registry.join("general", live);
        drop(dead_rx); // writer task gone, socket dead

        broadcaster.publish("general", None, &chat("still here"));

        // The live peer still gets the frame.
        assert!(recv_text(&mut live_rx).is_some());
        // The dead connection's owning loop has been signalled to close.
        dead.closed().await;
        // It stays registered until its own loop removes it.
        assert_eq!(registry.connection_count("general"), 2);
    }

    #[tokio::test]
    async fn test_presence_announcements_track_leave() {
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster = Broadcaster::new(registry.clone());

        let (alice, _alice_rx) = ConnectionHandle::new("alice");
        let (bob, mut bob_rx) = ConnectionHandle::new("bob");
        registry.join("general", alice.clone());
        registry.join("general", bob);

        registry.leave("general", alice.id(), "alice");
        broadcaster.announce_presence("general");

        let frame = recv_text(&mut bob_rx).expect("presence frame");
        assert!(frame.contains("\"count\":1"));
    }

    #[tokio::test]
    async fn test_publish_to_empty_room_is_noop() {
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster = Broadcaster::new(registry);
        broadcaster.publish("empty", None, &chat("anyone?"));
    }
}
