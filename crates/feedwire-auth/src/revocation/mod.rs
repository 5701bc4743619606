//! Revoked bearer token tracking.

pub mod memory;

use async_trait::async_trait;

use feedwire_core::result::AppResult;

pub use memory::MemoryTokenStore;

/// Store of explicitly revoked bearer tokens.
#[async_trait]
pub trait TokenStore: Send + Sync + 'static {
    /// Whether `token` has been revoked.
    async fn is_revoked(&self, token: &str) -> AppResult<bool>;

    /// Revoke `token`.
    async fn revoke(&self, token: &str) -> AppResult<()>;
}
