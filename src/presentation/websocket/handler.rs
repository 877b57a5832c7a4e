//! Realtime Connection Handler
//!
//! One socket per (room, connection). Identity is resolved by the auth
//! middleware before the upgrade; membership is checked against the store
//! before the connection is registered. The read loop owns the connection:
//! it is the only place a connection is removed from the registry, whether
//! the trigger was its own read error, an idle timeout, or a close signal
//! from a failed broadcast write or process shutdown.
//!
//! Lifecycle: Connecting -> membership check -> Joined -> Active ->
//! Closing -> Left.

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Extension, Path, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::time::timeout;

use super::messages::{InboundMessage, WireMessage};
use super::registry::ConnectionHandle;
use crate::application::services::{ChatService, Identity};
use crate::infrastructure::metrics;
use crate::startup::AppState;

/// WebSocket upgrade handler for `/chat/{room_name}`.
pub async fn live_chat(
    ws: WebSocketUpgrade,
    Path(room_name): Path<String>,
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, identity, room_name))
}

/// Drive one connection from upgrade to disconnect.
async fn handle_socket(mut socket: WebSocket, state: AppState, identity: Identity, room_name: String) {
    let chat_service = state.chat_service();

    // Membership gates registration: a non-member gets one error frame and
    // never enters the registry or the presence set.
    match chat_service.is_member(identity.user_id, &room_name).await {
        Ok(true) => {}
        Ok(false) => {
            let _ = socket
                .send(Message::Text(
                    "Error: You are not a member of this room.".into(),
                ))
                .await;
            return;
        }
        Err(e) => {
            tracing::error!(room = %room_name, error = %e, "Membership check failed");
            let _ = socket
                .send(Message::Text("Error: something went wrong.".into()))
                .await;
            return;
        }
    }

    // Split the socket; a dedicated writer task drains the connection's
    // outbound channel so broadcasts never block on this peer.
    let (mut sink, mut stream) = socket.split();
    let (connection, mut outbound) = ConnectionHandle::new(&identity.username);

    let writer_task = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if sink.send(frame).await.is_err() {
                break;
            }
        }
    });

    state.registry.join(&room_name, connection.clone());
    metrics::WEBSOCKET_CONNECTIONS_ACTIVE.inc();
    state.broadcaster.announce_presence(&room_name);

    tracing::info!(
        user_id = identity.user_id,
        username = %identity.username,
        room = %room_name,
        "Connection joined room"
    );

    let read_deadline = Duration::from_secs(state.settings.websocket.read_timeout_secs);

    loop {
        tokio::select! {
            // Blocking read of one frame, bounded by the idle deadline.
            next = timeout(read_deadline, stream.next()) => {
                match next {
                    Err(_) => {
                        tracing::info!(room = %room_name, "Idle read deadline reached, closing");
                        break;
                    }
                    Ok(None) | Ok(Some(Ok(Message::Close(_)))) => {
                        tracing::debug!(room = %room_name, "Connection closed by peer");
                        break;
                    }
                    Ok(Some(Ok(Message::Text(text)))) => {
                        let inbound: InboundMessage = match serde_json::from_str(&text) {
                            Ok(inbound) => inbound,
                            Err(e) => {
                                tracing::debug!(room = %room_name, error = %e, "Malformed frame");
                                continue;
                            }
                        };

                        metrics::MESSAGES_RECEIVED_TOTAL.inc();

                        // Persist first: the broadcast carries the stored
                        // message with its assigned id and timestamps.
                        match chat_service
                            .create_message(&identity, &room_name, &inbound.content)
                            .await
                        {
                            Ok(message) => {
                                state.broadcaster.publish(
                                    &room_name,
                                    Some(connection.id()),
                                    &WireMessage::Chat(message),
                                );
                            }
                            Err(e) => {
                                tracing::error!(room = %room_name, error = %e, "Failed to persist message");
                                continue;
                            }
                        }
                    }
                    Ok(Some(Ok(_))) => {
                        // Binary and ping/pong frames carry no chat payload.
                    }
                    Ok(Some(Err(e))) => {
                        tracing::debug!(room = %room_name, error = %e, "Read failed");
                        break;
                    }
                }
            }

            // Close signal from a failed broadcast write or shutdown.
            _ = connection.closed() => {
                tracing::debug!(room = %room_name, "Close signalled");
                break;
            }
        }
    }

    // Closing -> Left: deregister, then announce the new presence count.
    state
        .registry
        .leave(&room_name, connection.id(), &identity.username);
    metrics::WEBSOCKET_CONNECTIONS_ACTIVE.dec();
    state.broadcaster.announce_presence(&room_name);
    writer_task.abort();

    tracing::info!(
        user_id = identity.user_id,
        username = %identity.username,
        room = %room_name,
        "Connection left room"
    );
}
