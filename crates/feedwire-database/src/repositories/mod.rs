//! Repository traits for feeds and hub subscriptions.

use async_trait::async_trait;

use feedwire_core::result::AppResult;
use feedwire_core::types::FeedId;
use feedwire_entity::{Feed, Subscription};

/// Feed persistence.
#[async_trait]
pub trait FeedRepository: Send + Sync + 'static {
    /// Find a feed by its identifier.
    async fn find_by_id(&self, id: FeedId) -> AppResult<Option<Feed>>;

    /// List the feeds a user is subscribed to.
    async fn for_user(&self, login: &str) -> AppResult<Vec<Feed>>;

    /// Set or clear the subscribe error of an existing feed, leaving its
    /// other attributes as currently stored.
    async fn set_subscribe_error(&self, id: FeedId, error: Option<String>) -> AppResult<()>;
}

/// Hub subscription persistence. Records are keyed by feed.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync + 'static {
    /// Find the subscription record of a feed.
    async fn find_by_feed(&self, feed_id: FeedId) -> AppResult<Option<Subscription>>;

    /// List every subscription record.
    async fn all(&self) -> AppResult<Vec<Subscription>>;

    /// Insert or replace the record for `subscription.feed_id`.
    async fn update(&self, subscription: &Subscription) -> AppResult<()>;

    /// Remove the record of a feed. Returns `true` if one existed.
    async fn delete(&self, feed_id: FeedId) -> AppResult<bool>;

    /// Mark every record as failed. Returns the number of records touched.
    async fn fail_all(&self) -> AppResult<u64>;
}
