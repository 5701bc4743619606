//! Feed change notification contract.
//!
//! The feed poller is the only caller. It holds a [`FeedMonitors`] list and
//! invokes it whenever a feed's content changes or a feed is deleted; each
//! registered monitor decides what that means for its own state.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use feedwire_core::result::AppResult;

use crate::article::Article;

use super::model::Feed;

/// Receives feed change notifications.
#[async_trait]
pub trait FeedMonitor: Send + Sync {
    /// Called after `feed` was refreshed; `articles` are the newly seen entries.
    async fn feed_updated(&self, feed: &Feed, articles: &[Article]) -> AppResult<()>;

    /// Called after `feed` was removed.
    async fn feed_deleted(&self, feed: &Feed) -> AppResult<()>;
}

/// Ordered list of monitors notified polymorphically.
///
/// A failing monitor is logged and does not prevent the remaining ones
/// from being notified.
#[derive(Clone, Default)]
pub struct FeedMonitors {
    monitors: Vec<Arc<dyn FeedMonitor>>,
}

impl std::fmt::Debug for FeedMonitors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedMonitors")
            .field("len", &self.monitors.len())
            .finish()
    }
}

impl FeedMonitors {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a monitor.
    pub fn add(&mut self, monitor: Arc<dyn FeedMonitor>) {
        self.monitors.push(monitor);
    }

    /// Returns the number of registered monitors.
    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    /// Returns `true` when no monitor is registered.
    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    /// Notifies every monitor that `feed` was updated.
    pub async fn feed_updated(&self, feed: &Feed, articles: &[Article]) {
        for monitor in &self.monitors {
            if let Err(e) = monitor.feed_updated(feed, articles).await {
                warn!(feed_id = %feed.id, error = %e, "Feed monitor failed on update");
            }
        }
    }

    /// Notifies every monitor that `feed` was deleted.
    pub async fn feed_deleted(&self, feed: &Feed) {
        for monitor in &self.monitors {
            if let Err(e) = monitor.feed_deleted(feed).await {
                warn!(feed_id = %feed.id, error = %e, "Feed monitor failed on delete");
            }
        }
    }
}
