//! In-memory revocation store using the moka crate.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::debug;

use feedwire_core::config::AuthConfig;
use feedwire_core::result::AppResult;

use super::TokenStore;

/// Revoked tokens kept in a bounded, expiring moka cache.
///
/// Entries outlive the longest token lifetime configured through
/// `revocation_ttl_seconds`; after that the token has expired anyway.
#[derive(Debug, Clone)]
pub struct MemoryTokenStore {
    revoked: Cache<String, ()>,
}

impl MemoryTokenStore {
    /// Create a store from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let revoked = Cache::builder()
            .max_capacity(config.revocation_capacity)
            .time_to_live(Duration::from_secs(config.revocation_ttl_seconds))
            .build();
        Self { revoked }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn is_revoked(&self, token: &str) -> AppResult<bool> {
        Ok(self.revoked.contains_key(token))
    }

    async fn revoke(&self, token: &str) -> AppResult<()> {
        self.revoked.insert(token.to_string(), ()).await;
        debug!("Bearer token revoked");
        Ok(())
    }
}
