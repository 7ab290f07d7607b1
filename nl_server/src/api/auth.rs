//! Bearer token verification.
//!
//! Tokens are HS256 JWTs carrying `{sub, role, exp, iat}`. Identity is
//! issued elsewhere; this server only verifies and turns the claims into a
//! [`Principal`].

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use neon_ledger::Principal;
use neon_ledger::auth::AccessTokenClaims;

use super::error::ApiError;

/// Signing and verification keys derived from the shared secret
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Verify a token and return the caller it names
    ///
    /// # Errors
    ///
    /// * `ApiError::Unauthorized` - Bad signature, malformed or expired token
    pub fn verify(&self, token: &str) -> Result<Principal, ApiError> {
        decode::<AccessTokenClaims>(token, &self.decoding, &self.validation)
            .map(|data| Principal::from(data.claims))
            .map_err(|_| ApiError::Unauthorized("Invalid or expired token"))
    }

    /// Sign a token for a principal, valid for `ttl`
    ///
    /// Used by operators and tests to mint tokens against a known secret.
    pub fn issue(&self, principal: &Principal, ttl: Duration) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = AccessTokenClaims {
            sub: principal.user_id.clone(),
            role: principal.role,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::BadRequest(format!("cannot sign token: {e}")))
    }
}
