//! Infrastructure Layer
//!
//! Contains implementations for external collaborators including:
//! - Credential verification (JWT)
//! - Message persistence (PostgreSQL)
//! - Prometheus metrics

pub mod auth;
pub mod database;
pub mod metrics;
pub mod repositories;
