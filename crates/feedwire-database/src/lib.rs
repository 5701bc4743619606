//! # feedwire-database
//!
//! Repository interfaces consumed by the push subsystem, plus a
//! thread-safe in-memory implementation used by the server binary and
//! the test suites.

pub mod memory;
pub mod repositories;

pub use memory::MemoryStore;
pub use repositories::{FeedRepository, SubscriptionRepository};
