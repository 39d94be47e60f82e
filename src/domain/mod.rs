//! # Domain Layer
//!
//! Core types of the signaling server, independent of the transport and of
//! the collaborators it talks to.
//!
//! ## Structure
//!
//! - **entities**: connection identity, chat messages, collaborator ports
//! - **events**: the outbound event vocabulary
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure or presentation layers
//! - Collaborator traits define the contracts infrastructure implements

pub mod entities;
pub mod events;

// Re-export commonly used types
pub use entities::*;
pub use events::ServerEvent;
