//! # feedwire-entity
//!
//! Domain entity models for Feedwire. Every struct in this crate represents
//! a persisted record or a domain value object. All entities derive `Debug`,
//! `Clone`, `Serialize`, and `Deserialize`.
//!
//! The [`feed::FeedMonitor`] trait is the notification contract that the
//! feed poller drives and the push subsystems implement.

pub mod article;
pub mod feed;
pub mod subscription;

pub use article::Article;
pub use feed::{Feed, FeedMonitor, FeedMonitors};
pub use subscription::{MAX_LEASE_SECONDS, Subscription, bounded_lease};
