//! # Signal Server Library
//!
//! Realtime session and signaling core:
//! - Authenticated WebSocket connections
//! - Chat rooms with one-to-many message and typing relay
//! - Call channels with point-to-point signaling relay (offer/answer/candidate)
//! - Optional PostgreSQL persistence of relayed chat messages
//!
//! ## Architecture
//!
//! - **Domain Layer**: Connection identity, outbound events, collaborator ports
//! - **Application Layer**: Connection registry, room broadcaster, channel
//!   coordinator and the signaling hub task that owns rooms and channels
//! - **Infrastructure Layer**: JWT verification, PostgreSQL sink, metrics
//! - **Presentation Layer**: WebSocket gateway and HTTP routes
//!
//! ## Module Structure
//!
//! ```text
//! signal_server/
//! +-- config/         Configuration management
//! +-- domain/         Entities, events and ports
//! +-- application/    Registry, rooms, channels, hub
//! +-- infrastructure/ JWT, database, metrics
//! +-- presentation/   HTTP routes and WebSocket gateway
//! +-- shared/         Errors and validation helpers
//! ```

// Configuration module
pub mod config;

// Domain layer
pub mod domain;

// Application layer - Realtime core
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
