//! Push hub subscription entities.

pub mod model;

pub use model::{MAX_LEASE_SECONDS, Subscription, bounded_lease};
