//! Feed change notifications for the broadcast hub.

use async_trait::async_trait;
use tracing::debug;

use feedwire_core::result::AppResult;
use feedwire_entity::{Article, Feed, FeedMonitor};

use crate::hub::EventHub;

#[async_trait]
impl FeedMonitor for EventHub {
    async fn feed_updated(&self, feed: &Feed, articles: &[Article]) -> AppResult<()> {
        self.notify_feed_updated(feed, articles)
    }

    /// Streams get no event for deleted feeds.
    async fn feed_deleted(&self, feed: &Feed) -> AppResult<()> {
        debug!(feed_id = %feed.id, "Feed deleted, no stream notification");
        Ok(())
    }
}
