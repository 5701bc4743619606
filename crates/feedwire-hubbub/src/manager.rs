//! Subscription lifecycle manager.
//!
//! [`Hubbub`] validates requests synchronously, persists the pessimistic
//! subscription record, and hands the hub round trip to a spawned task.
//! Handshake outcomes travel back over channels to a single owner task
//! that holds the active subscription set and renews expiring leases.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashSet;
use reqwest::Url;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use feedwire_core::config::{AppConfig, HubbubConfig};
use feedwire_core::types::FeedId;
use feedwire_database::{FeedRepository, SubscriptionRepository};
use feedwire_entity::{Feed, Subscription, bounded_lease};

use crate::error::{HubbubError, HubbubResult};
use crate::handshake::{HubClient, HubMode};
use crate::renewal::needs_renewal;

/// Handle to the subscription lifecycle manager. Cheap to clone.
#[derive(Clone)]
pub struct Hubbub {
    inner: Arc<Inner>,
}

struct Inner {
    /// Absolute callback base, `None` when push is not configured.
    callback_base: Option<String>,
    endpoint: String,
    default_lease_seconds: i64,
    client: HubClient,
    feeds: Arc<dyn FeedRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    resume_polling: mpsc::Sender<Feed>,
    /// Feeds whose unsubscribe handshake has not completed yet.
    unsubscribing: DashSet<FeedId>,
    activate: mpsc::UnboundedSender<Subscription>,
    deactivate: mpsc::UnboundedSender<FeedId>,
    query: mpsc::UnboundedSender<oneshot::Sender<Vec<Subscription>>>,
}

/// Receiving ends consumed by the owner task.
struct OwnerChannels {
    activate: mpsc::UnboundedReceiver<Subscription>,
    deactivate: mpsc::UnboundedReceiver<FeedId>,
    query: mpsc::UnboundedReceiver<oneshot::Sender<Vec<Subscription>>>,
}

impl std::fmt::Debug for Hubbub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hubbub")
            .field("callback_base", &self.inner.callback_base)
            .field("endpoint", &self.inner.endpoint)
            .finish()
    }
}

impl Hubbub {
    /// Build the manager and spawn its owner task.
    ///
    /// Failed feeds are handed back on `resume_polling`. The owner task
    /// renews leases every `feed_manager.update_interval` and exits when
    /// `shutdown` is cancelled.
    pub fn start(
        config: &AppConfig,
        feeds: Arc<dyn FeedRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        resume_polling: mpsc::Sender<Feed>,
        shutdown: CancellationToken,
    ) -> HubbubResult<Self> {
        let client = HubClient::new(&config.timeout, config.hubbub.from.clone())?;
        let (activate_tx, activate_rx) = mpsc::unbounded_channel();
        let (deactivate_tx, deactivate_rx) = mpsc::unbounded_channel();
        let (query_tx, query_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(Inner {
            callback_base: callback_base(&config.hubbub),
            endpoint: config.hubbub.endpoint.clone(),
            default_lease_seconds: bounded_lease(config.hubbub.default_lease_seconds),
            client,
            feeds,
            subscriptions,
            resume_polling,
            unsubscribing: DashSet::new(),
            activate: activate_tx,
            deactivate: deactivate_tx,
            query: query_tx,
        });

        if inner.callback_base.is_none() {
            info!("Hubbub callback URL not configured, push subscriptions disabled");
        }

        let channels = OwnerChannels {
            activate: activate_rx,
            deactivate: deactivate_rx,
            query: query_rx,
        };
        tokio::spawn(run_owner(
            Arc::clone(&inner),
            channels,
            config.feed_manager.update_interval(),
            shutdown,
        ));

        Ok(Self { inner })
    }

    /// Subscribe to the hub of `feed`.
    ///
    /// Returns once the pessimistic record is persisted; the handshake
    /// runs in the background.
    pub async fn subscribe(&self, feed: &Feed) -> HubbubResult<()> {
        self.inner.callback_base()?;
        let hub = hub_link(feed)?;

        let existing = self
            .inner
            .subscriptions
            .find_by_feed(feed.id)
            .await
            .map_err(|e| HubbubError::repository("loading subscription", e))?;
        if existing.is_some_and(|s| s.feed_id == feed.id) {
            info!(feed_id = %feed.id, hub = %hub, "Already subscribed");
            return Err(HubbubError::AlreadySubscribed);
        }

        let subscription = Subscription::new(hub, feed.id);
        self.inner
            .subscriptions
            .update(&subscription)
            .await
            .map_err(|e| HubbubError::repository("saving subscription", e))?;

        tokio::spawn(Arc::clone(&self.inner).handshake(
            subscription,
            feed.clone(),
            HubMode::Subscribe,
        ));
        Ok(())
    }

    /// Unsubscribe from the hub of `feed`. The handshake runs in the
    /// background.
    pub async fn unsubscribe(&self, feed: &Feed) -> HubbubResult<()> {
        self.inner.callback_base()?;
        let hub = hub_link(feed)?;

        let existing = self
            .inner
            .subscriptions
            .find_by_feed(feed.id)
            .await
            .map_err(|e| HubbubError::repository("loading subscription", e))?;
        let Some(subscription) = existing.filter(|s| s.feed_id == feed.id) else {
            info!(feed_id = %feed.id, hub = %hub, "Not subscribed");
            return Err(HubbubError::NotSubscribed);
        };

        self.inner.unsubscribing.insert(feed.id);
        let inner = Arc::clone(&self.inner);
        let feed = feed.clone();
        tokio::spawn(async move {
            let feed_id = feed.id;
            Arc::clone(&inner)
                .handshake(subscription, feed, HubMode::Unsubscribe)
                .await;
            inner.unsubscribing.remove(&feed_id);
        });
        Ok(())
    }

    /// Startup sweep: mark every persisted subscription failed, then
    /// re-subscribe each one whose feed still exists.
    ///
    /// Only the initial repository calls can fail; handshake outcomes are
    /// reported the usual way.
    pub async fn init_subscriptions(&self) -> HubbubResult<()> {
        let context = "initializing subscriptions";
        self.inner
            .subscriptions
            .fail_all()
            .await
            .map_err(|e| HubbubError::repository(context, e))?;
        let all = self
            .inner
            .subscriptions
            .all()
            .await
            .map_err(|e| HubbubError::repository(context, e))?;

        info!(count = all.len(), "Initializing hubbub subscriptions");

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            for subscription in all {
                let Some(feed) = inner.resolve_feed(subscription.feed_id).await else {
                    continue;
                };
                Arc::clone(&inner)
                    .handshake(subscription, feed, HubMode::Subscribe)
                    .await;
            }
        });

        Ok(())
    }

    /// Add a hub-confirmed subscription to the active set.
    pub fn confirm(&self, subscription: Subscription) {
        if self.inner.activate.send(subscription).is_err() {
            debug!("Hubbub owner task stopped, confirmation dropped");
        }
    }

    /// Remove a feed's subscription from the active set.
    pub fn reject(&self, feed_id: FeedId) {
        if self.inner.deactivate.send(feed_id).is_err() {
            debug!(feed_id = %feed_id, "Hubbub owner task stopped, rejection dropped");
        }
    }

    /// Whether an unsubscribe handshake for `feed_id` is in flight.
    pub fn is_unsubscribe_pending(&self, feed_id: FeedId) -> bool {
        self.inner.unsubscribing.contains(&feed_id)
    }

    /// Snapshot of the active subscription set, ordered by feed.
    pub async fn active_subscriptions(&self) -> Vec<Subscription> {
        let (tx, rx) = oneshot::channel();
        if self.inner.query.send(tx).is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    /// Callback URL the hub is asked to call for `feed_id`.
    pub fn callback_url(&self, feed_id: FeedId) -> Option<String> {
        self.inner.callback_url(feed_id)
    }
}

impl Inner {
    fn callback_base(&self) -> HubbubResult<&str> {
        self.callback_base
            .as_deref()
            .ok_or(HubbubError::NotConfigured)
    }

    fn callback_url(&self, feed_id: FeedId) -> Option<String> {
        self.callback_base
            .as_ref()
            .map(|base| format!("{base}{}/{feed_id}", self.endpoint))
    }

    async fn resolve_feed(&self, feed_id: FeedId) -> Option<Feed> {
        match self.feeds.find_by_id(feed_id).await {
            Ok(Some(feed)) => Some(feed),
            Ok(None) => {
                debug!(feed_id = %feed_id, "Subscribed feed no longer exists");
                None
            }
            Err(e) => {
                warn!(feed_id = %feed_id, error = %e, "Failed to load subscribed feed");
                None
            }
        }
    }

    /// One handshake attempt. Never retried on failure.
    async fn handshake(self: Arc<Self>, mut subscription: Subscription, feed: Feed, mode: HubMode) {
        let Some(callback) = self.callback_url(feed.id) else {
            return;
        };

        let started = Utc::now();
        let result = self
            .client
            .send(&subscription.link, mode, &callback, &feed.link, feed.id)
            .await;

        match (result, mode) {
            (Ok(()), HubMode::Subscribe) => {
                match self.verified_since(feed.id, started).await {
                    Some(verified) => subscription = verified,
                    None => {
                        let lease = if subscription.lease_seconds > 0 {
                            subscription.lease_seconds
                        } else {
                            self.default_lease_seconds
                        };
                        subscription.confirm(Utc::now(), lease);
                        if let Err(e) = self.subscriptions.update(&subscription).await {
                            error!(feed_id = %feed.id, error = %e, "Failed to persist subscription");
                        }
                    }
                }
                if feed.subscribe_error.is_some() {
                    if let Err(e) = self.feeds.set_subscribe_error(feed.id, None).await {
                        error!(feed_id = %feed.id, error = %e, "Failed to clear feed subscribe error");
                    }
                }
                info!(feed_id = %feed.id, hub = %subscription.link, "Subscribed to hub");
                let _ = self.activate.send(subscription);
            }
            (Ok(()), HubMode::Unsubscribe) => {
                if let Err(e) = self.subscriptions.delete(feed.id).await {
                    error!(feed_id = %feed.id, error = %e, "Failed to delete subscription");
                }
                info!(feed_id = %feed.id, hub = %subscription.link, "Unsubscribed from hub");
                let _ = self.deactivate.send(feed.id);
            }
            (Err(e), _) => self.handshake_failed(subscription, feed, e).await,
        }
    }

    /// The stored record if the hub verified it after `since`. Such a
    /// record already carries the hub-granted lease.
    async fn verified_since(
        &self,
        feed_id: FeedId,
        since: DateTime<Utc>,
    ) -> Option<Subscription> {
        match self.subscriptions.find_by_feed(feed_id).await {
            Ok(current) => current
                .filter(|s| !s.subscription_failure && s.verification_time >= since),
            Err(e) => {
                warn!(feed_id = %feed_id, error = %e, "Failed to reload subscription");
                None
            }
        }
    }

    async fn handshake_failed(&self, mut subscription: Subscription, mut feed: Feed, err: HubbubError) {
        warn!(feed = %feed, hub = %subscription.link, error = %err, "Error subscribing to hub feed");

        feed.subscribe_error = Some(err.to_string());
        if let Err(e) = self
            .feeds
            .set_subscribe_error(feed.id, feed.subscribe_error.clone())
            .await
        {
            error!(feed_id = %feed.id, error = %e, "Error updating feed record");
        }

        subscription.subscription_failure = true;
        if let Err(e) = self.subscriptions.update(&subscription).await {
            error!(feed_id = %feed.id, error = %e, "Error updating subscription record");
        }

        let _ = self.deactivate.send(feed.id);

        let feed_id = feed.id;
        if self.resume_polling.send(feed).await.is_err() {
            debug!(feed_id = %feed_id, "Resume-polling receiver closed");
        }
    }
}

/// Owner task: the only place the active set is read or written.
async fn run_owner(
    inner: Arc<Inner>,
    mut channels: OwnerChannels,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut active: BTreeMap<FeedId, Subscription> = BTreeMap::new();
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(interval_secs = interval.as_secs(), "Hubbub owner task started");

    loop {
        // Outcomes are applied before queries so a snapshot reflects every
        // confirmation sent ahead of it.
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            Some(subscription) = channels.activate.recv() => {
                debug!(feed_id = %subscription.feed_id, "Subscription activated");
                active.insert(subscription.feed_id, subscription);
            }
            Some(feed_id) = channels.deactivate.recv() => {
                if active.remove(&feed_id).is_some() {
                    debug!(feed_id = %feed_id, "Subscription deactivated");
                }
            }
            Some(reply) = channels.query.recv() => {
                let _ = reply.send(active.values().cloned().collect());
            }
            _ = ticker.tick() => {
                let now = Utc::now();
                for subscription in active.values().filter(|s| needs_renewal(s, now)) {
                    let inner = Arc::clone(&inner);
                    let subscription = subscription.clone();
                    tokio::spawn(async move {
                        let Some(feed) = inner.resolve_feed(subscription.feed_id).await else {
                            return;
                        };
                        info!(feed_id = %feed.id, hub = %subscription.link, "Renewing subscription");
                        inner.handshake(subscription, feed, HubMode::Subscribe).await;
                    });
                }
            }
        }
    }

    info!(active = active.len(), "Hubbub owner task stopped");
}

fn callback_base(config: &HubbubConfig) -> Option<String> {
    let raw = config.callback_url.trim();
    Url::parse(raw)
        .ok()
        .map(|_| raw.trim_end_matches('/').to_string())
}

fn hub_link(feed: &Feed) -> HubbubResult<&str> {
    feed.hub_link
        .as_deref()
        .filter(|link| Url::parse(link).is_ok())
        .ok_or(HubbubError::NoFeedHubLink)
}
