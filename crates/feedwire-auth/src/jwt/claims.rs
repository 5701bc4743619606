//! JWT claims carried by bearer tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// JWT claims payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user login.
    pub sub: String,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
    /// Not-before timestamp (seconds since epoch).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
}

impl Claims {
    /// Returns the user login from the subject claim.
    pub fn login(&self) -> &str {
        &self.sub
    }

    /// Whether the token has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>, leeway_seconds: i64) -> bool {
        now.timestamp() > self.exp + leeway_seconds
    }

    /// Whether the token is not yet usable at `now`.
    pub fn is_premature_at(&self, now: DateTime<Utc>, leeway_seconds: i64) -> bool {
        self.nbf
            .is_some_and(|nbf| now.timestamp() + leeway_seconds < nbf)
    }

    /// Standard claim validity (expiry and not-before) at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>, leeway_seconds: i64) -> bool {
        !self.is_expired_at(now, leeway_seconds) && !self.is_premature_at(now, leeway_seconds)
    }
}
