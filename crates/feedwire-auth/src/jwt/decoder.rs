//! JWT token validation and revocation checking.

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use tracing::warn;

use feedwire_core::config::AuthConfig;
use feedwire_core::error::AppError;

use crate::revocation::TokenStore;

use super::claims::Claims;

/// Validates bearer tokens and checks revocation status.
#[derive(Clone)]
pub struct JwtDecoder {
    /// HMAC secret key for verification.
    decoding_key: DecodingKey,
    /// Validation configuration.
    validation: Validation,
    /// Revoked token lookups.
    store: Arc<dyn TokenStore>,
}

impl std::fmt::Debug for JwtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtDecoder")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtDecoder {
    /// Creates a new decoder from auth configuration.
    pub fn new(config: &AuthConfig, store: Arc<dyn TokenStore>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = config.leeway_seconds;

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            store,
        }
    }

    /// Decodes and validates a bearer token.
    ///
    /// Checks the signature, the `exp`/`nbf` claims, and that the token
    /// has not been revoked.
    pub async fn decode(&self, token: &str) -> Result<Claims, AppError> {
        let claims = self.decode_token(token)?;

        if self.store.is_revoked(token).await? {
            return Err(AppError::unauthorized("Token has been revoked"));
        }

        Ok(claims)
    }

    /// Re-checks a previously accepted token.
    ///
    /// A revoked token is invalid. Otherwise the token is valid while its
    /// standard claims are. A store failure counts as invalid.
    pub async fn revalidate(&self, token: &str, claims: &Claims) -> bool {
        match self.store.is_revoked(token).await {
            Ok(true) => false,
            Ok(false) => claims.is_valid_at(Utc::now(), self.leeway()),
            Err(e) => {
                warn!(login = %claims.login(), error = %e, "Revocation lookup failed");
                false
            }
        }
    }

    /// Revokes a token.
    pub async fn revoke(&self, token: &str) -> Result<(), AppError> {
        self.store.revoke(token).await
    }

    fn leeway(&self) -> i64 {
        i64::try_from(self.validation.leeway).unwrap_or(i64::MAX)
    }

    fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        AppError::unauthorized("Token has expired")
                    }
                    jsonwebtoken::errors::ErrorKind::ImmatureSignature => {
                        AppError::unauthorized("Token is not valid yet")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidToken => {
                        AppError::unauthorized("Invalid token format")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        AppError::unauthorized("Invalid token signature")
                    }
                    _ => AppError::unauthorized(format!("Token validation failed: {e}")),
                }
            })?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use feedwire_core::error::ErrorKind;

    use super::*;
    use crate::jwt::JwtEncoder;
    use crate::revocation::MemoryTokenStore;

    fn setup() -> (JwtEncoder, JwtDecoder) {
        let config = AuthConfig {
            jwt_secret: "test-secret".into(),
            leeway_seconds: 0,
            ..AuthConfig::default()
        };
        let store = Arc::new(MemoryTokenStore::new(&config));
        (JwtEncoder::new(&config), JwtDecoder::new(&config, store))
    }

    #[tokio::test]
    async fn test_decode_valid_token() {
        let (encoder, decoder) = setup();
        let token = encoder.issue("alice", Duration::minutes(5)).unwrap();
        let claims = decoder.decode(&token).await.unwrap();
        assert_eq!(claims.login(), "alice");
        assert!(decoder.revalidate(&token, &claims).await);
    }

    #[tokio::test]
    async fn test_revoked_token_is_rejected() {
        let (encoder, decoder) = setup();
        let token = encoder.issue("alice", Duration::minutes(5)).unwrap();
        let claims = decoder.decode(&token).await.unwrap();

        decoder.revoke(&token).await.unwrap();
        assert!(!decoder.revalidate(&token, &claims).await);
        let err = decoder.decode(&token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let (encoder, decoder) = setup();
        let now = Utc::now();
        let claims = Claims {
            sub: "alice".into(),
            iat: (now - Duration::hours(2)).timestamp(),
            exp: (now - Duration::hours(1)).timestamp(),
            nbf: None,
        };
        let token = encoder.sign(&claims).unwrap();
        assert!(decoder.decode(&token).await.is_err());
        assert!(!decoder.revalidate(&token, &claims).await);
    }

    #[tokio::test]
    async fn test_foreign_signature_is_rejected() {
        let (_, decoder) = setup();
        let other = JwtEncoder::new(&AuthConfig {
            jwt_secret: "other".into(),
            ..AuthConfig::default()
        });
        let token = other.issue("mallory", Duration::minutes(5)).unwrap();
        assert!(decoder.decode(&token).await.is_err());
    }
}
