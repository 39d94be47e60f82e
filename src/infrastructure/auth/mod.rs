//! Credential verification backed by signed tokens.

pub mod jwt_verifier;

pub use jwt_verifier::{Claims, JwtCredentialVerifier};
