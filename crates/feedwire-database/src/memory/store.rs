//! In-memory repository implementation using dashmap.

use std::collections::BTreeSet;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use feedwire_core::error::AppError;
use feedwire_core::result::AppResult;
use feedwire_core::types::FeedId;
use feedwire_entity::{Feed, Subscription};

use crate::repositories::{FeedRepository, SubscriptionRepository};

/// Thread-safe in-memory store for feeds, user feed lists, and subscriptions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Feed ID → feed.
    feeds: DashMap<FeedId, Feed>,
    /// Login → feeds the user follows.
    user_feeds: DashMap<String, BTreeSet<FeedId>>,
    /// Feed ID → hub subscription.
    subscriptions: DashMap<FeedId, Subscription>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a feed.
    pub fn insert_feed(&self, feed: Feed) {
        self.feeds.insert(feed.id, feed);
    }

    /// Add a feed to a user's list.
    pub fn attach_feed(&self, login: &str, feed_id: FeedId) {
        self.user_feeds
            .entry(login.to_string())
            .or_default()
            .insert(feed_id);
    }

    /// Remove a feed along with its subscription and user links.
    pub fn remove_feed(&self, feed_id: FeedId) -> Option<Feed> {
        self.subscriptions.remove(&feed_id);
        for mut entry in self.user_feeds.iter_mut() {
            entry.value_mut().remove(&feed_id);
        }
        self.feeds.remove(&feed_id).map(|(_, feed)| feed)
    }
}

#[async_trait]
impl FeedRepository for MemoryStore {
    async fn find_by_id(&self, id: FeedId) -> AppResult<Option<Feed>> {
        Ok(self.feeds.get(&id).map(|entry| entry.value().clone()))
    }

    async fn for_user(&self, login: &str) -> AppResult<Vec<Feed>> {
        let ids: Vec<FeedId> = self
            .user_feeds
            .get(login)
            .map(|entry| entry.value().iter().copied().collect())
            .unwrap_or_default();

        Ok(ids
            .into_iter()
            .filter_map(|id| self.feeds.get(&id).map(|entry| entry.value().clone()))
            .collect())
    }

    async fn set_subscribe_error(&self, id: FeedId, error: Option<String>) -> AppResult<()> {
        match self.feeds.get_mut(&id) {
            Some(mut entry) => {
                entry.value_mut().subscribe_error = error;
                Ok(())
            }
            None => Err(AppError::not_found(format!("Feed {id} not found"))),
        }
    }
}

#[async_trait]
impl SubscriptionRepository for MemoryStore {
    async fn find_by_feed(&self, feed_id: FeedId) -> AppResult<Option<Subscription>> {
        Ok(self
            .subscriptions
            .get(&feed_id)
            .map(|entry| entry.value().clone()))
    }

    async fn all(&self) -> AppResult<Vec<Subscription>> {
        let mut all: Vec<Subscription> = self
            .subscriptions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        all.sort_by_key(|s| s.feed_id);
        Ok(all)
    }

    async fn update(&self, subscription: &Subscription) -> AppResult<()> {
        self.subscriptions
            .insert(subscription.feed_id, subscription.clone());
        Ok(())
    }

    async fn delete(&self, feed_id: FeedId) -> AppResult<bool> {
        Ok(self.subscriptions.remove(&feed_id).is_some())
    }

    async fn fail_all(&self) -> AppResult<u64> {
        let mut count = 0u64;
        for mut entry in self.subscriptions.iter_mut() {
            entry.value_mut().subscription_failure = true;
            count += 1;
        }
        debug!(count, "Marked all subscriptions as failed");
        Ok(count)
    }
}
