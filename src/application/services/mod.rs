//! Application Services
//!
//! The realtime core, one service per concern.
//!
//! ## Available Services
//!
//! - **ConnectionRegistry**: Live authenticated connections and their outbound queues
//! - **RoomBroadcaster**: Chat-room membership and one-to-many relay
//! - **ChannelCoordinator**: Call-channel participants and point-to-point signaling
//! - **SignalingHub**: Single task owning rooms and channels

pub mod channel_coordinator;
pub mod connection_registry;
pub mod room_broadcaster;
pub mod signaling_hub;

pub use channel_coordinator::ChannelCoordinator;
pub use connection_registry::{ConnectionEntry, ConnectionRegistry, DeliveryError};
pub use room_broadcaster::{RelayReceipt, RoomBroadcaster};
pub use signaling_hub::{DisconnectSummary, HubCommand, HubStats, SignalingHub};
