//! HTTP Surface
//!
//! Health, metrics and the WebSocket upgrade route.

pub mod handlers;
pub mod routes;
