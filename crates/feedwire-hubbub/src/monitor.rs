//! Feed change notifications for the subscription manager.

use async_trait::async_trait;
use tracing::debug;

use feedwire_core::error::AppError;
use feedwire_core::result::AppResult;
use feedwire_entity::{Article, Feed, FeedMonitor};

use crate::error::HubbubError;
use crate::manager::Hubbub;

#[async_trait]
impl FeedMonitor for Hubbub {
    /// Subscribes feeds that advertise a hub. Feeds already subscribed, or
    /// without a usable hub link, are left alone.
    async fn feed_updated(&self, feed: &Feed, _articles: &[Article]) -> AppResult<()> {
        if feed.hub_link.is_none() {
            return Ok(());
        }
        swallow_precondition(feed, self.subscribe(feed).await)
    }

    /// Unsubscribes a removed feed from its hub.
    async fn feed_deleted(&self, feed: &Feed) -> AppResult<()> {
        swallow_precondition(feed, self.unsubscribe(feed).await)
    }
}

fn swallow_precondition(feed: &Feed, result: Result<(), HubbubError>) -> AppResult<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.is_precondition() => {
            debug!(feed_id = %feed.id, reason = %e, "Hub subscription skipped");
            Ok(())
        }
        Err(e) => Err(AppError::from(e)),
    }
}
