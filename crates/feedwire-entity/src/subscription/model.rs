//! Push hub subscription entity model.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use feedwire_core::types::FeedId;

/// Longest lease accepted from a hub, in seconds (one year).
pub const MAX_LEASE_SECONDS: i64 = 365 * 24 * 60 * 60;

/// Clamp a configured lease into `1..=MAX_LEASE_SECONDS`.
pub fn bounded_lease(seconds: u64) -> i64 {
    i64::try_from(seconds)
        .unwrap_or(MAX_LEASE_SECONDS)
        .clamp(1, MAX_LEASE_SECONDS)
}

/// The relationship between one feed and its push hub.
///
/// At most one subscription exists per feed. The failure flag is set
/// pessimistically when the record is created and cleared once a
/// subscribe round-trip succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// Hub endpoint handshakes are posted to.
    pub link: String,
    /// The subscribed feed.
    pub feed_id: FeedId,
    /// Lease granted by the hub, in seconds.
    pub lease_seconds: i64,
    /// Time of the last successful (re)confirmation.
    pub verification_time: DateTime<Utc>,
    /// Whether the last subscription attempt failed.
    pub subscription_failure: bool,
}

impl Subscription {
    /// Create a fresh, not-yet-confirmed subscription record.
    pub fn new(link: impl Into<String>, feed_id: FeedId) -> Self {
        Self {
            link: link.into(),
            feed_id,
            lease_seconds: 0,
            verification_time: DateTime::<Utc>::UNIX_EPOCH,
            subscription_failure: true,
        }
    }

    /// Returns the lease as a duration, saturating at the representable
    /// range.
    pub fn lease_duration(&self) -> TimeDelta {
        TimeDelta::try_seconds(self.lease_seconds).unwrap_or(if self.lease_seconds < 0 {
            TimeDelta::MIN
        } else {
            TimeDelta::MAX
        })
    }

    /// When the current lease runs out. Saturates instead of overflowing.
    pub fn expires_at(&self) -> DateTime<Utc> {
        let lease = self.lease_duration();
        self.verification_time
            .checked_add_signed(lease)
            .unwrap_or(if lease < TimeDelta::zero() {
                DateTime::<Utc>::MIN_UTC
            } else {
                DateTime::<Utc>::MAX_UTC
            })
    }

    /// Record a successful confirmation at `now`.
    pub fn confirm(&mut self, now: DateTime<Utc>, lease_seconds: i64) {
        self.verification_time = now;
        self.lease_seconds = lease_seconds;
        self.subscription_failure = false;
    }
}
