//! Lease renewal policy.

use chrono::{DateTime, Duration, Utc};

use feedwire_entity::Subscription;

/// Leases expiring within this many seconds are renewed.
pub const RENEWAL_WINDOW_SECONDS: i64 = 30 * 60;

/// Whether `subscription` must be renewed on a tick at `now`.
pub fn needs_renewal(subscription: &Subscription, now: DateTime<Utc>) -> bool {
    let horizon = now
        .checked_add_signed(Duration::seconds(RENEWAL_WINDOW_SECONDS))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    subscription.expires_at() < horizon
}
