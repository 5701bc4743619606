//! Application state shared across all handlers.

use std::sync::Arc;

use feedwire_auth::JwtDecoder;
use feedwire_core::config::AppConfig;
use feedwire_database::{FeedRepository, SubscriptionRepository};
use feedwire_entity::FeedMonitors;
use feedwire_hubbub::Hubbub;
use feedwire_realtime::EventHub;

/// Shared dependencies, passed to every handler via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Bearer token validation.
    pub jwt_decoder: Arc<JwtDecoder>,
    /// Feed persistence.
    pub feeds: Arc<dyn FeedRepository>,
    /// Hub subscription persistence.
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    /// Stream registry.
    pub events: EventHub,
    /// Subscription manager; `None` when no callback URL is configured.
    pub hubbub: Option<Hubbub>,
    /// Everything that wants feed change notifications.
    pub monitors: FeedMonitors,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("events", &self.events)
            .field("hubbub", &self.hubbub)
            .field("monitors", &self.monitors)
            .finish_non_exhaustive()
    }
}
