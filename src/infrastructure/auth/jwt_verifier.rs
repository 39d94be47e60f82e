//! JWT Credential Verifier
//!
//! Verifies HS256 tokens issued by the account service. Tokens carry the user
//! id in `id` (older tokens use `sub`), plus `email` and `role` which the
//! signaling core ignores.

use async_trait::async_trait;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::JwtSettings;
use crate::domain::{CredentialVerifier, Identity, VerifyError};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User ID
    #[serde(alias = "sub")]
    pub id: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

/// Verifies bearer tokens against the shared secret.
pub struct JwtCredentialVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtCredentialVerifier {
    pub fn new(settings: &JwtSettings) -> Self {
        Self {
            key: DecodingKey::from_secret(settings.secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

#[async_trait]
impl CredentialVerifier for JwtCredentialVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, VerifyError> {
        let token_data =
            decode::<Claims>(token, &self.key, &self.validation).map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => VerifyError::Expired,
                _ => VerifyError::Invalid,
            })?;

        if token_data.claims.id.is_empty() {
            return Err(VerifyError::Invalid);
        }

        Ok(Identity::new(token_data.claims.id))
    }
}
