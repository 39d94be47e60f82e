//! Domain Entities
//!
//! Connection identity, chat messages and the collaborator ports the core
//! consumes (credential verification, message persistence).

pub mod connection;
pub mod message;

pub use connection::{
    ChannelId, ConnectionId, CredentialVerifier, Identity, ParticipantId, RoomId, VerifyError,
};
pub use message::{ChatMessage, MessageSink};

#[cfg(test)]
pub use connection::MockCredentialVerifier;
#[cfg(test)]
pub use message::MockMessageSink;
