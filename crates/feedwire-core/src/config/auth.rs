//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// Bearer token validation configuration.
///
/// Token issuance lives elsewhere; this section only covers what is
/// needed to verify and revalidate presented tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for JWT verification (HMAC-SHA256).
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Clock skew tolerance in seconds.
    #[serde(default = "default_leeway")]
    pub leeway_seconds: u64,
    /// How long a revoked token is remembered, in seconds.
    #[serde(default = "default_revocation_ttl")]
    pub revocation_ttl_seconds: u64,
    /// Maximum number of remembered revoked tokens.
    #[serde(default = "default_revocation_capacity")]
    pub revocation_capacity: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            leeway_seconds: default_leeway(),
            revocation_ttl_seconds: default_revocation_ttl(),
            revocation_capacity: default_revocation_capacity(),
        }
    }
}

fn default_jwt_secret() -> String {
    "CHANGE_ME_IN_PRODUCTION".to_string()
}

fn default_leeway() -> u64 {
    5
}

fn default_revocation_ttl() -> u64 {
    7 * 24 * 60 * 60
}

fn default_revocation_capacity() -> u64 {
    100_000
}
