//! Feed entities and the feed change notification contract.

pub mod model;
pub mod monitor;

pub use model::Feed;
pub use monitor::{FeedMonitor, FeedMonitors};
