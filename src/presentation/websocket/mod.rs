//! Realtime Layer
//!
//! Connection registry, broadcast engine, and the per-room socket
//! endpoint.

pub mod broadcaster;
pub mod handler;
pub mod messages;
pub mod registry;

pub use broadcaster::Broadcaster;
pub use handler::live_chat;
pub use messages::{InboundMessage, WireMessage};
pub use registry::{ConnectionHandle, ConnectionId, ConnectionRegistry};
