//! Per-stream authorization revalidation.

use std::sync::Arc;

use async_trait::async_trait;

/// Re-checks a stream's authorization before each delivery.
#[async_trait]
pub trait ConnectionValidator: Send + Sync {
    /// Whether the stream may still receive events.
    async fn is_valid(&self) -> bool;
}

/// Validator backed by a plain closure.
struct FnValidator<F>(F);

#[async_trait]
impl<F> ConnectionValidator for FnValidator<F>
where
    F: Fn() -> bool + Send + Sync,
{
    async fn is_valid(&self) -> bool {
        (self.0)()
    }
}

/// Wrap a synchronous check as a validator.
pub fn validator_fn<F>(check: F) -> Arc<dyn ConnectionValidator>
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    Arc::new(FnValidator(check))
}
