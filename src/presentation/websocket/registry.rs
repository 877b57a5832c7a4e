//! Connection Registry
//!
//! In-memory mapping from room name to the live connections and distinct
//! present users of that room. Constructed once at startup and shared by
//! reference; never module-global state.
//!
//! All mutations run under a single mutex covering every room. Room
//! entries are created lazily on first join and left in place when they
//! empty out; they only hold two small maps.
//!
//! Presence is tracked as a per-username count of open connections, so a
//! user with several tabs counts once and stays present until the last
//! tab closes.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::Message as WsMessage;
use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};
use uuid::Uuid;

/// Identifies one live socket within the registry.
pub type ConnectionId = Uuid;

/// Shared handle to one live connection.
///
/// The socket itself is owned by the connection's read loop; the registry
/// and broadcaster hold handles that can queue outbound frames and signal
/// the owning loop to close, nothing more.
#[derive(Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    username: String,
    sender: mpsc::UnboundedSender<WsMessage>,
    shutdown: Arc<Notify>,
}

impl ConnectionHandle {
    /// Create a handle and the receiving end its writer task drains.
    pub fn new(username: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<WsMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = Self {
            id: Uuid::new_v4(),
            username: username.into(),
            sender,
            shutdown: Arc::new(Notify::new()),
        };
        (handle, receiver)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Queue a frame for the connection's writer task. Fails when the
    /// writer task has exited, i.e. the socket is already dead.
    pub fn send(&self, frame: WsMessage) -> Result<(), ()> {
        self.sender.send(frame).map_err(|_| ())
    }

    /// Signal the owning read loop to close. The permit is stored, so the
    /// signal is not lost if the loop is not currently waiting.
    pub fn close(&self) {
        self.shutdown.notify_one();
    }

    /// Resolves once [`close`](Self::close) has been called.
    pub async fn closed(&self) {
        self.shutdown.notified().await;
    }
}

/// Live state of one room.
#[derive(Default)]
struct RoomState {
    /// Every open connection in the room
    connections: HashMap<ConnectionId, ConnectionHandle>,
    /// username -> number of open connections held by that user
    presence: HashMap<String, usize>,
}

/// Registry of live connections across all rooms.
#[derive(Default)]
pub struct ConnectionRegistry {
    rooms: Mutex<HashMap<String, RoomState>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection in a room. Presence is idempotent per
    /// username: additional tabs raise the counter but not the count of
    /// distinct users.
    pub fn join(&self, room: &str, connection: ConnectionHandle) {
        let mut rooms = self.rooms.lock();
        let state = rooms.entry(room.to_string()).or_default();

        *state
            .presence
            .entry(connection.username.clone())
            .or_insert(0) += 1;
        state.connections.insert(connection.id, connection);
    }

    /// Remove a connection from a room. The username leaves the presence
    /// set only when none of its connections remain.
    pub fn leave(&self, room: &str, connection_id: ConnectionId, username: &str) {
        let mut rooms = self.rooms.lock();
        let Some(state) = rooms.get_mut(room) else {
            return;
        };

        state.connections.remove(&connection_id);

        if let Some(count) = state.presence.get_mut(username) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                state.presence.remove(username);
            }
        }
    }

    /// Number of distinct users with at least one open connection.
    pub fn presence_count(&self, room: &str) -> usize {
        self.rooms
            .lock()
            .get(room)
            .map(|state| state.presence.len())
            .unwrap_or(0)
    }

    /// Number of open connections in a room.
    pub fn connection_count(&self, room: &str) -> usize {
        self.rooms
            .lock()
            .get(room)
            .map(|state| state.connections.len())
            .unwrap_or(0)
    }

    /// Total open connections across all rooms.
    pub fn total_connections(&self) -> usize {
        self.rooms
            .lock()
            .values()
            .map(|state| state.connections.len())
            .sum()
    }

    /// Snapshot of a room's connections, for iteration outside the lock.
    pub fn snapshot(&self, room: &str) -> Vec<ConnectionHandle> {
        self.rooms
            .lock()
            .get(room)
            .map(|state| state.connections.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Signal every registered connection to close (process shutdown).
    pub fn close_all(&self) {
        let rooms = self.rooms.lock();
        for state in rooms.values() {
            for connection in state.connections.values() {
                connection.close();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn handle(username: &str) -> ConnectionHandle {
        ConnectionHandle::new(username).0
    }

    #[test]
    fn test_presence_counts_distinct_usernames() {
        let registry = ConnectionRegistry::new();

        registry.join("general", handle("alice"));
        assert_eq!(registry.presence_count("general"), 1);

        registry.join("general", handle("bob"));
        assert_eq!(registry.presence_count("general"), 2);
        assert_eq!(registry.connection_count("general"), 2);
    }

    #[test]
    fn test_same_user_multiple_tabs_counts_once() {
        let registry = ConnectionRegistry::new();

        let tab1 = handle("alice");
        let tab2 = handle("alice");
        registry.join("general", tab1.clone());
        registry.join("general", tab2.clone());

        assert_eq!(registry.presence_count("general"), 1);
        assert_eq!(registry.connection_count("general"), 2);

        // Closing one tab keeps the user present.
        registry.leave("general", tab1.id(), "alice");
        assert_eq!(registry.presence_count("general"), 1);

        // Closing the last tab removes them.
        registry.leave("general", tab2.id(), "alice");
        assert_eq!(registry.presence_count("general"), 0);
        assert_eq!(registry.connection_count("general"), 0);
    }

    #[test]
    fn test_leave_unknown_room_is_noop() {
        let registry = ConnectionRegistry::new();
        registry.leave("nowhere", Uuid::new_v4(), "alice");
        assert_eq!(registry.presence_count("nowhere"), 0);
    }

    #[test]
    fn test_rooms_are_isolated() {
        let registry = ConnectionRegistry::new();

        registry.join("general", handle("alice"));
        registry.join("random", handle("alice"));

        assert_eq!(registry.presence_count("general"), 1);
        assert_eq!(registry.presence_count("random"), 1);
        assert_eq!(registry.total_connections(), 2);
    }

    #[test]
    fn test_snapshot_reflects_current_membership() {
        let registry = ConnectionRegistry::new();
        let alice = handle("alice");
        let bob = handle("bob");

        registry.join("general", alice.clone());
        registry.join("general", bob.clone());
        assert_eq!(registry.snapshot("general").len(), 2);

        registry.leave("general", alice.id(), "alice");
        let snapshot = registry.snapshot("general");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].username(), "bob");
    }

    #[tokio::test]
    async fn test_close_all_signals_every_connection() {
        let registry = ConnectionRegistry::new();
        let alice = handle("alice");
        let bob = handle("bob");
        registry.join("general", alice.clone());
        registry.join("random", bob.clone());

        registry.close_all();

        // The permits are stored, so both waiters resolve immediately.
        alice.closed().await;
        bob.closed().await;
    }

    #[tokio::test]
    async fn test_send_fails_after_receiver_dropped() {
        let (handle, receiver) = ConnectionHandle::new("alice");
        drop(receiver);

        assert!(handle
            .send(WsMessage::Text("hello".to_string().into()))
            .is_err());
    }
}
