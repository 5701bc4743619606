//! JWT token signing.

use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};

use feedwire_core::config::AuthConfig;
use feedwire_core::error::AppError;

use super::claims::Claims;

/// Creates signed bearer tokens.
///
/// Token issuance belongs to the account layer; the server uses this for
/// operator tooling and the test suites.
#[derive(Clone)]
pub struct JwtEncoder {
    /// HMAC secret key for signing.
    encoding_key: EncodingKey,
}

impl std::fmt::Debug for JwtEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtEncoder").finish_non_exhaustive()
    }
}

impl JwtEncoder {
    /// Creates a new encoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        }
    }

    /// Signs a token for `login` valid for `ttl` from now.
    pub fn issue(&self, login: &str, ttl: Duration) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: login.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            nbf: Some(now.timestamp()),
        };
        self.sign(&claims)
    }

    /// Signs arbitrary claims.
    pub fn sign(&self, claims: &Claims) -> Result<String, AppError> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to sign token: {e}")))
    }
}
