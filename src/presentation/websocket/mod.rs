//! WebSocket Gateway
//!
//! Real-time rooms and call signaling over WebSocket connections.

pub mod gateway;
pub mod handler;
pub mod messages;
pub mod session;

pub use gateway::SignalingGateway;
pub use handler::ws_handler;
pub use messages::{ClientEvent, ClientFrame};
pub use session::{ConnectionPhase, SessionState};
