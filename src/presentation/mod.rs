//! Presentation Layer
//!
//! HTTP routes, middleware, and the realtime WebSocket layer.

pub mod http;
pub mod middleware;
pub mod websocket;
