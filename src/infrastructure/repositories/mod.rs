//! Repository Implementations
//!
//! Concrete implementations of the persistence ports defined in the domain layer.

pub mod message_repository;

pub use message_repository::{LoggingMessageSink, PgMessageSink};
