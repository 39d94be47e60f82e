//! Application Layer
//!
//! Connection bookkeeping, room and channel relay, and the hub task that
//! serializes all room and channel state. Sits between the WebSocket
//! presentation layer and the domain types.

pub mod services;
