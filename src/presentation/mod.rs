//! Presentation Layer
//!
//! HTTP routes and the WebSocket signaling gateway.

pub mod http;
pub mod middleware;
pub mod websocket;
